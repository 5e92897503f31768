use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::ClearReason;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Interrupted => "Interrupted",
        }
    }
}

/// One start-to-stop stretch of the monitor loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRun {
    pub id: String,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub frames_processed: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum IncidentResolution {
    Recovered,
    Sleeping,
    /// The run ended (or crashed) while the alarm was still on.
    Interrupted,
}

impl IncidentResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentResolution::Recovered => "Recovered",
            IncidentResolution::Sleeping => "Sleeping",
            IncidentResolution::Interrupted => "Interrupted",
        }
    }
}

impl From<ClearReason> for IncidentResolution {
    fn from(reason: ClearReason) -> Self {
        match reason {
            ClearReason::Recovered => IncidentResolution::Recovered,
            ClearReason::Sleeping => IncidentResolution::Sleeping,
        }
    }
}

/// A confirmed fall: from alarm on to alarm off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub run_id: String,
    pub raised_at: DateTime<Utc>,
    pub cleared_at: Option<DateTime<Utc>>,
    pub resolution: Option<IncidentResolution>,
}

impl Incident {
    pub fn duration_ms(&self) -> Option<i64> {
        self.cleared_at
            .map(|cleared| (cleared - self.raised_at).num_milliseconds().max(0))
    }
}
