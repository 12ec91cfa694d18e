//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Bind proxy → Build directory → Start lifecycle
//!
//! Registration (registration.rs):
//!     Wait for app → Register enabled → Tick: probe → flip enabled flag
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop ticking → Deregister once → Exit
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM/SIGQUIT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - The proxy listens before the application is ready
//! - The application is never registered before its first successful probe
//! - Shutdown interrupts pending sleeps and retries

pub mod registration;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use registration::SidecarLifecycle;
pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{Sidecar, StartupError};
pub use state::SidecarState;
