use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use uuid::Uuid;

use super::{
    helpers::{parse_datetime, parse_optional_datetime, parse_resolution},
    models::{Incident, IncidentResolution},
    Journal,
};

fn row_to_incident(row: &Row) -> Result<Incident> {
    let raised_at: String = row.get("raised_at")?;
    let cleared_at: Option<String> = row.get("cleared_at")?;
    let resolution: Option<String> = row.get("resolution")?;

    Ok(Incident {
        id: row.get("id")?,
        run_id: row.get("run_id")?,
        raised_at: parse_datetime(&raised_at, "raised_at")?,
        cleared_at: parse_optional_datetime(cleared_at, "cleared_at")?,
        resolution: parse_resolution(resolution)?,
    })
}

impl Journal {
    pub async fn open_incident(&self, run_id: &str, raised_at: DateTime<Utc>) -> Result<Incident> {
        let incident = Incident {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            raised_at,
            cleared_at: None,
            resolution: None,
        };
        let record = incident.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO incidents (id, run_id, raised_at, cleared_at, resolution)
                 VALUES (?1, ?2, ?3, NULL, NULL)",
                params![record.id, record.run_id, record.raised_at.to_rfc3339()],
            )?;
            Ok(())
        })
        .await?;
        Ok(incident)
    }

    /// Closes the open incident of a run, if any. Returns whether one was closed.
    pub async fn resolve_open_incident(
        &self,
        run_id: &str,
        cleared_at: DateTime<Utc>,
        resolution: IncidentResolution,
    ) -> Result<bool> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let updated = conn.execute(
                "UPDATE incidents
                 SET cleared_at = ?1, resolution = ?2
                 WHERE run_id = ?3 AND cleared_at IS NULL",
                params![cleared_at.to_rfc3339(), resolution.as_str(), run_id],
            )?;
            Ok(updated > 0)
        })
        .await
    }

    pub async fn list_incidents(&self, run_id: &str) -> Result<Vec<Incident>> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, run_id, raised_at, cleared_at, resolution
                 FROM incidents
                 WHERE run_id = ?1
                 ORDER BY raised_at ASC",
            )?;
            let mut rows = stmt.query(params![run_id])?;
            let mut incidents = Vec::new();
            while let Some(row) = rows.next()? {
                incidents.push(row_to_incident(row)?);
            }
            Ok(incidents)
        })
        .await
    }
}
