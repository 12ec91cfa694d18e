//! Service-discovery directory subsystem.
//!
//! # Data Flow
//! ```text
//! routing (per request):
//!     select_one_healthy(service) → Instance | NotFound
//!
//! lifecycle (on health transitions):
//!     register(instance{enabled}) → ok | error (retried by caller)
//!     deregister(instance)        → ok | error (logged by caller)
//! ```
//!
//! # Design Decisions
//! - The sidecar core depends only on the `DirectoryClient` trait
//! - Backends are swappable behind `Arc<dyn DirectoryClient>`
//! - Registration must be idempotent so callers can retry blindly

pub mod memory;
pub mod nacos;
pub mod types;

use async_trait::async_trait;

pub use memory::{DirectoryCall, MemoryDirectory};
pub use nacos::NacosDirectory;
pub use types::{DirectoryError, DirectoryResult, Instance};

/// The narrow capability the sidecar consumes from a discovery system.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Pick one healthy, enabled instance of `service`.
    async fn select_one_healthy(&self, service: &str) -> DirectoryResult<Instance>;

    /// Create or update the record for `instance`. Safe to repeat.
    async fn register(&self, instance: &Instance) -> DirectoryResult<()>;

    /// Remove the record identified by `instance`.
    async fn deregister(&self, instance: &Instance) -> DirectoryResult<()>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;
}
