use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use super::models::{IncidentResolution, RunStatus};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_run_status(value: &str) -> Result<RunStatus> {
    match value {
        "Running" => Ok(RunStatus::Running),
        "Completed" => Ok(RunStatus::Completed),
        "Interrupted" => Ok(RunStatus::Interrupted),
        other => Err(anyhow!("unknown run status {other}")),
    }
}

pub fn parse_resolution(value: Option<String>) -> Result<Option<IncidentResolution>> {
    match value.as_deref() {
        None => Ok(None),
        Some("Recovered") => Ok(Some(IncidentResolution::Recovered)),
        Some("Sleeping") => Ok(Some(IncidentResolution::Sleeping)),
        Some("Interrupted") => Ok(Some(IncidentResolution::Interrupted)),
        Some(other) => Err(anyhow!("unknown incident resolution {other}")),
    }
}
