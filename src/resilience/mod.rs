//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle transition (register / enable / disable):
//!     → retries.rs (call directory; on failure sleep one interval and repeat)
//!     → success, or shutdown interrupts the wait
//! ```
//!
//! # Design Decisions
//! - Directory updates are retried forever; giving up would leave the
//!   directory permanently out of step with the application
//! - Fixed interval, no jitter: one sidecar per instance, no herd to spread
//! - Proxied requests are never retried

pub mod retries;

pub use retries::retry_until_success;
