pub mod state;

pub use state::{AlertEvent, AlertPhase, AlertSession, ClearReason};

use std::time::Duration;

/// Timing windows for the alert logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertConfig {
    /// Continuous time fallen before the alarm turns on.
    pub fall_confirm: Duration,
    /// Continuous time not fallen before the alarm turns off.
    pub recover_confirm: Duration,
    /// Same-posture time after which standing/sitting counts as sustained.
    pub sustained_warning: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            fall_confirm: Duration::from_millis(500),
            recover_confirm: Duration::from_millis(500),
            sustained_warning: Duration::from_secs(10),
        }
    }
}
