//! Registration state machine for the local instance.
//!
//! # States
//! - Unregistered: nothing in the directory yet
//! - RegisteredHealthy: record present with enabled=true
//! - RegisteredUnhealthy: record present with enabled=false
//! - ShuttingDown: terminal; record deregistered
//!
//! # State Transitions
//! ```text
//! Unregistered        → RegisteredHealthy:   first alive sample
//! RegisteredHealthy   → RegisteredUnhealthy: dead sample
//! RegisteredUnhealthy → RegisteredHealthy:   alive sample
//! any                 → ShuttingDown:        termination signal
//! ```
//!
//! Only the sample taken at the tick matters; flapping between ticks is
//! invisible to the machine.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidecarState {
    Unregistered,
    RegisteredHealthy,
    RegisteredUnhealthy,
    ShuttingDown,
}

impl SidecarState {
    /// The state a liveness sample leads to, or `None` when nothing changes.
    pub fn on_sample(self, alive: bool) -> Option<SidecarState> {
        match (self, alive) {
            (SidecarState::Unregistered, true) => Some(SidecarState::RegisteredHealthy),
            (SidecarState::RegisteredHealthy, false) => Some(SidecarState::RegisteredUnhealthy),
            (SidecarState::RegisteredUnhealthy, true) => Some(SidecarState::RegisteredHealthy),
            _ => None,
        }
    }

    /// The directory `enabled` flag a registered state stands for.
    pub fn enabled(self) -> Option<bool> {
        match self {
            SidecarState::RegisteredHealthy => Some(true),
            SidecarState::RegisteredUnhealthy => Some(false),
            SidecarState::Unregistered | SidecarState::ShuttingDown => None,
        }
    }

    pub fn is_registered(self) -> bool {
        self.enabled().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SidecarState::Unregistered => "unregistered",
            SidecarState::RegisteredHealthy => "registered_healthy",
            SidecarState::RegisteredUnhealthy => "registered_unhealthy",
            SidecarState::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for SidecarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
