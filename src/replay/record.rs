use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    posture::{Keypoint, KeypointSet, RawDetection},
    providers::PoseDetection,
};

/// One line of a recorded detection file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRecord {
    /// Seconds since the start of the recording.
    pub t: f64,
    pub frame_height: f32,
    /// `None` when nobody was detected in the frame.
    #[serde(default)]
    pub keypoints: Option<Vec<[f32; 2]>>,
    /// `None` when the furniture model produced nothing for the frame at all.
    #[serde(default)]
    pub furniture: Option<Vec<RawDetection>>,
}

impl ReplayRecord {
    pub fn offset(&self) -> Result<Duration> {
        if !self.t.is_finite() || self.t < 0.0 {
            bail!("timestamp must be a non-negative number of seconds, got {}", self.t);
        }
        Ok(Duration::from_secs_f64(self.t))
    }

    pub fn pose(&self) -> Option<PoseDetection> {
        self.keypoints.as_ref().map(|points| PoseDetection {
            keypoints: points.iter().copied().map(Keypoint::from).collect::<KeypointSet>(),
            frame_height: self.frame_height,
        })
    }
}
