use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    helpers::{parse_datetime, parse_optional_datetime, parse_run_status, to_i64, to_u64},
    models::{IncidentResolution, MonitorRun, RunStatus},
    Journal,
};

fn row_to_run(row: &Row) -> Result<MonitorRun> {
    let started_at: String = row.get("started_at")?;
    let stopped_at: Option<String> = row.get("stopped_at")?;
    let status: String = row.get("status")?;
    let frames: i64 = row.get("frames_processed")?;

    Ok(MonitorRun {
        id: row.get("id")?,
        source: row.get("source")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        stopped_at: parse_optional_datetime(stopped_at, "stopped_at")?,
        status: parse_run_status(&status)?,
        frames_processed: to_u64(frames, "frames_processed")?,
    })
}

impl Journal {
    pub async fn insert_run(&self, run: &MonitorRun) -> Result<()> {
        let record = run.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO runs (id, source, started_at, stopped_at, status, frames_processed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.id,
                    record.source,
                    record.started_at.to_rfc3339(),
                    record.stopped_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.status.as_str(),
                    to_i64(record.frames_processed)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Ends a run and closes any incident still open in it.
    pub async fn finish_run(
        &self,
        run_id: &str,
        status: RunStatus,
        frames_processed: u64,
        stopped_at: DateTime<Utc>,
    ) -> Result<()> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE incidents
                 SET cleared_at = ?1, resolution = ?2
                 WHERE run_id = ?3 AND cleared_at IS NULL",
                params![
                    stopped_at.to_rfc3339(),
                    IncidentResolution::Interrupted.as_str(),
                    run_id,
                ],
            )?;
            tx.execute(
                "UPDATE runs
                 SET status = ?1, frames_processed = ?2, stopped_at = ?3
                 WHERE id = ?4",
                params![
                    status.as_str(),
                    to_i64(frames_processed)?,
                    stopped_at.to_rfc3339(),
                    run_id,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_run(&self, run_id: &str) -> Result<Option<MonitorRun>> {
        let run_id = run_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source, started_at, stopped_at, status, frames_processed
                 FROM runs
                 WHERE id = ?1",
            )?;
            let row = stmt
                .query_row(params![run_id], |row| Ok(row_to_run(row)))
                .optional()?;
            row.transpose()
        })
        .await
    }

    /// Runs still marked `Running` were cut off by a crash; mark them (and
    /// their open incidents) interrupted. Returns the affected run ids.
    pub async fn recover_interrupted_runs(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let ids = {
                let mut stmt = conn.prepare("SELECT id FROM runs WHERE status = ?1")?;
                let rows = stmt.query_map(params![RunStatus::Running.as_str()], |row| {
                    row.get::<_, String>(0)
                })?;
                let ids: Vec<String> = rows.collect::<rusqlite::Result<_>>()?;
                ids
            };

            let tx = conn.transaction()?;
            for id in &ids {
                tx.execute(
                    "UPDATE incidents
                     SET cleared_at = ?1, resolution = ?2
                     WHERE run_id = ?3 AND cleared_at IS NULL",
                    params![
                        now.to_rfc3339(),
                        IncidentResolution::Interrupted.as_str(),
                        id
                    ],
                )?;
                tx.execute(
                    "UPDATE runs SET status = ?1, stopped_at = ?2 WHERE id = ?3",
                    params![RunStatus::Interrupted.as_str(), now.to_rfc3339(), id],
                )?;
            }
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
