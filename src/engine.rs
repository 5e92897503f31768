use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    alert::{AlertConfig, AlertEvent, AlertPhase, AlertSession},
    posture::{self, furniture, BodyPosition, CompositePosture, FurnitureBox, PostureError},
    providers::PoseDetection,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Read-only view of the monitor after a frame, for overlays and status
/// reporting. Consumers may see it up to one frame late.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub frame_index: u64,
    pub person_detected: bool,
    pub composite_posture: Option<CompositePosture>,
    pub body_position: Option<BodyPosition>,
    /// Furniture label, or empty when not on furniture.
    pub furniture: String,
    pub alarm_active: bool,
    pub fall_detected: bool,
    pub sleep_detected: bool,
    pub phase: AlertPhase,
    pub sustained_duration_secs: u64,
    pub sustained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Assessed(CompositePosture),
    NoPerson,
    Invalid(PostureError),
}

#[derive(Debug, Clone)]
pub struct FrameOutcome {
    pub observation: Observation,
    pub events: Vec<AlertEvent>,
    pub snapshot: StatusSnapshot,
}

/// Single entry point that turns one frame's detections into a status update.
/// Every delivery mode (live loop, replay harness) drives the same engine.
#[derive(Debug, Clone)]
pub struct PostureEngine {
    session: AlertSession,
    min_confidence: f32,
    frames: u64,
}

impl PostureEngine {
    pub fn new(config: AlertConfig, min_confidence: f32) -> Self {
        Self {
            session: AlertSession::new(config),
            min_confidence,
            frames: 0,
        }
    }

    pub fn session(&self) -> &AlertSession {
        &self.session
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// `furniture: None` means the furniture provider was unavailable for this
    /// frame, which is handled exactly like a frame with no furniture.
    pub fn process(
        &mut self,
        pose: Option<&PoseDetection>,
        furniture: Option<&[FurnitureBox]>,
        now: Instant,
    ) -> FrameOutcome {
        self.frames += 1;

        let observation = match pose {
            None => Observation::NoPerson,
            Some(detection) => match posture::assess(
                &detection.keypoints,
                detection.frame_height,
                furniture.unwrap_or_default(),
                self.min_confidence,
            ) {
                Ok(composite) => Observation::Assessed(composite),
                Err(err) => {
                    log_warn!("frame {} skipped: {err}", self.frames);
                    Observation::Invalid(err)
                }
            },
        };

        let events = match &observation {
            Observation::Assessed(composite) => {
                log_debug!("frame {}: {composite}", self.frames);
                self.session.observe(*composite, now)
            }
            Observation::NoPerson | Observation::Invalid(_) => {
                self.session.observe_absent();
                Vec::new()
            }
        };

        let snapshot = self.snapshot(pose.is_some());

        FrameOutcome {
            observation,
            events,
            snapshot,
        }
    }

    /// A frame whose detections never arrived. Nothing is learned from it, so
    /// the alert timers freeze exactly as for a frame without a person.
    pub fn skip_frame(&mut self) {
        self.session.observe_absent();
    }

    /// Convenience for callers holding raw detector output.
    pub fn process_raw(
        &mut self,
        pose: Option<&PoseDetection>,
        detections: Option<&[posture::RawDetection]>,
        now: Instant,
    ) -> FrameOutcome {
        let boxes = detections.map(furniture::furniture_boxes);
        self.process(pose, boxes.as_deref(), now)
    }

    pub fn snapshot(&self, person_detected: bool) -> StatusSnapshot {
        let posture = self.session.last_posture();
        StatusSnapshot {
            frame_index: self.frames,
            person_detected,
            composite_posture: posture,
            body_position: posture.map(|p| p.body_position()),
            furniture: posture
                .and_then(|p| p.furniture())
                .map(|label| label.to_string())
                .unwrap_or_default(),
            alarm_active: self.session.alarm_active(),
            fall_detected: self.session.alarm_active(),
            sleep_detected: posture.is_some_and(|p| p.is_sleeping()),
            phase: self.session.phase(),
            sustained_duration_secs: self.session.sustained_duration_secs(),
            sustained: self.session.sustained(),
            updated_at: None,
        }
    }
}
