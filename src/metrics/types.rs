use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetrics {
    pub timestamp: DateTime<Utc>,
    pub frame_index: u64,
    pub pose_ms: u64,
    pub furniture_ms: u64,
    pub total_ms: u64,
    pub person_detected: bool,
    pub invalid_geometry: bool,
    pub furniture_unavailable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_frames: Vec<FrameMetrics>,
    pub frame_count: u64,
    pub person_frames: u64,
    pub invalid_frames: u64,
    pub furniture_failures: u64,
    pub timeouts: u64,
}
