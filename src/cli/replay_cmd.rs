use anyhow::Result;
use chrono::Utc;
use clap::Args;
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::{
    alarm::AlarmHandle,
    journal::Journal,
    metrics::MetricsSnapshot,
    monitor::MonitorOptions,
    replay::{replay_file, ReplayOptions},
    settings::SettingsStore,
};

use super::MonitorOverrides;

#[derive(Args)]
pub struct ReplayCommand {
    /// Recorded detections, one JSON object per line
    input: PathBuf,

    /// Wait out the recorded gaps between frames
    #[arg(long)]
    realtime: bool,

    /// Keep the alarm silent
    #[arg(long)]
    no_alarm: bool,

    /// Record runs and incidents in this SQLite file
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Print the run's frame metrics as JSON to stderr when done
    #[arg(long)]
    metrics: bool,

    #[command(flatten)]
    overrides: MonitorOverrides,
}

impl ReplayCommand {
    pub fn overrides(&self) -> &MonitorOverrides {
        &self.overrides
    }

    pub async fn execute(self, settings_path: &Path) -> Result<()> {
        let store = SettingsStore::new(settings_path.to_path_buf())?;
        let mut monitor = store.monitor();
        self.overrides.apply(&mut monitor);
        let options = MonitorOptions::from_settings(&monitor)?;

        let journal = match &self.journal {
            Some(path) => {
                let journal = Journal::new(path.clone())?;
                for run_id in journal.recover_interrupted_runs(Utc::now()).await? {
                    warn!("Recovered unfinished run {run_id}; marked as Interrupted");
                }
                Some(journal)
            }
            None => None,
        };

        let alarm_settings = store.alarm();
        let alarm = (!self.no_alarm && alarm_settings.enabled)
            .then(|| AlarmHandle::new(alarm_settings));

        let replay_options = ReplayOptions {
            realtime: self.realtime,
            alarm: alarm.clone(),
            journal,
        };

        let mut out = std::io::stdout();
        let result = replay_file(&self.input, options, replay_options, &mut out).await;

        if let Some(alarm) = alarm {
            alarm.shutdown();
        }

        let summary = result?;
        info!(
            "Replay finished: {} frames, {} alarm(s), run {}",
            summary.frames_processed, summary.alarms_raised, summary.run_id
        );
        info!("Frame metrics: {}", describe_metrics(&summary.metrics));

        if self.metrics {
            eprintln!("{}", serde_json::to_string_pretty(&summary.metrics)?);
        }
        Ok(())
    }
}

fn describe_metrics(metrics: &MetricsSnapshot) -> String {
    let mean_ms = if metrics.recent_frames.is_empty() {
        0.0
    } else {
        metrics.recent_frames.iter().map(|f| f.total_ms).sum::<u64>() as f64
            / metrics.recent_frames.len() as f64
    };
    format!(
        "{} frames ({} with a person, {} invalid), {} furniture failure(s), {} timeout(s), \
         {mean_ms:.1}ms/frame recent, cpu {:.1}%, mem {:.1}MB",
        metrics.frame_count,
        metrics.person_frames,
        metrics.invalid_frames,
        metrics.furniture_failures,
        metrics.timeouts,
        metrics.system.cpu_percent,
        metrics.system.memory_mb,
    )
}
