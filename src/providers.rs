//! Seams to the external collaborators: whatever captures frames and runs the
//! pose and segmentation models implements these.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::posture::{KeypointSet, RawDetection};

/// One person found by the pose model, with the height of the frame it was
/// found in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoseDetection {
    pub keypoints: KeypointSet,
    pub frame_height: f32,
}

pub trait FrameSource: Send {
    type Frame: Send + Sync + 'static;

    /// `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>>;

    /// Capture time relative to the start of the stream, for recorded sources.
    /// Live sources return `None` and the wall clock is used instead.
    fn frame_offset(&self, _frame: &Self::Frame) -> Option<Duration> {
        None
    }
}

pub trait PoseProvider<F>: Send + Sync {
    /// Zero or one person; multi-person scenes keep only the first.
    fn detect_pose(&self, frame: &F) -> Result<Option<PoseDetection>>;
}

pub trait FurnitureProvider<F>: Send + Sync {
    fn detect_furniture(&self, frame: &F) -> Result<Vec<RawDetection>>;
}
