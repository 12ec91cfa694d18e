//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (fixed proxy port)
//!     → server.rs (Axum setup, one task per connection)
//!     → routing layer resolves the Host to an upstream
//!     → request.rs (rewrite URI, keep Host, strip hop-by-hop headers)
//!     → fresh upstream connection, never reused
//!     → response.rs (strip hop-by-hop headers, stream body back)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use server::ProxyServer;
