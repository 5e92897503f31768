mod controller;
mod loop_worker;

pub use controller::MonitorController;
pub use loop_worker::{monitor_loop, LoopSummary, MonitorContext};

use std::time::Duration;

use anyhow::Result;

use crate::{alert::AlertConfig, settings::MonitorSettings};

/// How the loop paces and bounds frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorOptions {
    pub alert: AlertConfig,
    pub min_confidence: f32,
    pub frame_interval: Option<Duration>,
    pub frame_timeout: Duration,
    /// Sleep until each recorded frame's offset before processing it.
    pub pace_by_timestamps: bool,
}

impl MonitorOptions {
    pub fn from_settings(settings: &MonitorSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            alert: settings.alert_config()?,
            min_confidence: settings.furniture_min_confidence,
            frame_interval: settings.frame_interval(),
            frame_timeout: settings.frame_timeout(),
            pace_by_timestamps: false,
        })
    }
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            alert: AlertConfig::default(),
            min_confidence: crate::posture::DEFAULT_MIN_CONFIDENCE,
            frame_interval: None,
            frame_timeout: Duration::from_secs(5),
            pace_by_timestamps: false,
        }
    }
}
