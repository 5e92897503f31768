//! Debug harness: drives the monitor loop from a recorded detection file.
//! Timestamps in the file drive the engine clock, so a replay gives the same
//! alarm timeline no matter how fast it runs.

mod record;
mod source;

pub use record::ReplayRecord;
pub use source::{RecordedFurniture, RecordedPose, ReplaySource};

use anyhow::{Context, Result};
use std::{
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};
use tokio::sync::mpsc;

use crate::{
    alarm::AlarmHandle,
    engine::StatusSnapshot,
    journal::Journal,
    monitor::{LoopSummary, MonitorController, MonitorOptions},
};

#[derive(Clone, Default)]
pub struct ReplayOptions {
    /// Wait out the recorded gaps between frames instead of running flat out.
    pub realtime: bool,
    pub alarm: Option<AlarmHandle>,
    pub journal: Option<Journal>,
}

/// Replays `path` and writes one status JSON line per frame to `out`.
pub async fn replay_file<W: Write>(
    path: &Path,
    monitor: MonitorOptions,
    options: ReplayOptions,
    out: &mut W,
) -> Result<LoopSummary> {
    let source = ReplaySource::open(path)?;
    replay_source(source, &path.display().to_string(), monitor, options, out).await
}

pub async fn replay_source<W: Write>(
    source: ReplaySource,
    name: &str,
    monitor: MonitorOptions,
    options: ReplayOptions,
    out: &mut W,
) -> Result<LoopSummary> {
    let mut controller = MonitorController::new();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();

    let mut ctx = controller.context();
    ctx.alarm = options.alarm;
    ctx.journal = options.journal;
    ctx.frame_log = Some(frame_tx);
    ctx.source_name = format!("replay:{name}");

    let monitor = MonitorOptions {
        // recorded timestamps already space the frames
        frame_interval: None,
        pace_by_timestamps: options.realtime,
        ..monitor
    };

    controller.start(
        source,
        Arc::new(RecordedPose),
        Arc::new(RecordedFurniture),
        monitor,
        ctx,
    )?;

    let mut out = BufWriter::new(out);
    while let Some(snapshot) = frame_rx.recv().await {
        write_status(&mut out, &snapshot)?;
        // drain whatever is already queued, then flush once
        while let Ok(snapshot) = frame_rx.try_recv() {
            write_status(&mut out, &snapshot)?;
        }
        out.flush().context("failed to write status")?;
    }

    controller.wait().await
}

fn write_status<W: Write>(out: &mut W, snapshot: &StatusSnapshot) -> Result<()> {
    serde_json::to_writer(&mut *out, snapshot).context("failed to encode status")?;
    writeln!(out).context("failed to write status")
}
