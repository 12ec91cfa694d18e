//! Liveness probing subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle tick
//!     → probe.rs (TCP connect to 127.0.0.1:<app port>, bounded timeout)
//!     → alive: bool
//!     → lifecycle state machine decides whether the directory needs updating
//! ```
//!
//! # Design Decisions
//! - Plain TCP connect; no application-level health endpoint
//! - One attempt per call; cadence and retries belong to the caller
//! - Probe is a trait so the lifecycle can be driven by scripted samples

pub mod probe;

pub use probe::{LivenessProbe, TcpProbe};
