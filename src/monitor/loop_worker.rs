use anyhow::{Context, Result};
use chrono::Utc;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::{mpsc, watch},
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    alarm::AlarmHandle,
    alert::AlertEvent,
    engine::{Observation, PostureEngine, StatusSnapshot},
    journal::{IncidentResolution, Journal, MonitorRun, RunStatus},
    metrics::{FrameMetrics, MetricsCollector, MetricsSnapshot},
    posture::RawDetection,
    providers::{FrameSource, FurnitureProvider, PoseDetection, PoseProvider},
};

use super::MonitorOptions;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Everything the loop reports to besides its own engine.
#[derive(Clone)]
pub struct MonitorContext {
    pub status_tx: watch::Sender<StatusSnapshot>,
    pub metrics: MetricsCollector,
    pub alarm: Option<AlarmHandle>,
    pub journal: Option<Journal>,
    /// Receives every snapshot in order; the watch channel only keeps the latest.
    pub frame_log: Option<mpsc::UnboundedSender<StatusSnapshot>>,
    /// Recorded in the journal to tell runs apart.
    pub source_name: String,
}

impl MonitorContext {
    pub fn new(status_tx: watch::Sender<StatusSnapshot>) -> Self {
        Self {
            status_tx,
            metrics: MetricsCollector::new(),
            alarm: None,
            journal: None,
            frame_log: None,
            source_name: "live".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub run_id: String,
    pub frames_processed: u64,
    pub alarms_raised: u32,
    pub last_snapshot: StatusSnapshot,
    pub metrics: MetricsSnapshot,
}

struct Detections {
    pose: Result<Option<PoseDetection>>,
    furniture: Result<Vec<RawDetection>>,
    pose_elapsed: Duration,
    furniture_elapsed: Duration,
}

struct FrameWorker {
    engine: PostureEngine,
    ctx: MonitorContext,
    run_id: String,
    alarms_raised: u32,
    last_snapshot: StatusSnapshot,
}

/// Pulls frames until the source ends or `cancel_token` fires. Provider
/// failures and slow frames are logged and skipped; only a failing frame source
/// ends the loop with an error.
pub async fn monitor_loop<S, P, F>(
    source: S,
    pose: Arc<P>,
    furniture: Arc<F>,
    options: MonitorOptions,
    ctx: MonitorContext,
    cancel_token: CancellationToken,
) -> Result<LoopSummary>
where
    S: FrameSource + 'static,
    P: PoseProvider<S::Frame> + 'static,
    F: FurnitureProvider<S::Frame> + 'static,
{
    let run_id = Uuid::new_v4().to_string();

    if let Some(journal) = &ctx.journal {
        let run = MonitorRun {
            id: run_id.clone(),
            source: ctx.source_name.clone(),
            started_at: Utc::now(),
            stopped_at: None,
            status: RunStatus::Running,
            frames_processed: 0,
        };
        journal
            .insert_run(&run)
            .await
            .context("failed to record monitor run")?;
    }

    log_info!("monitor loop started (run {run_id})");

    let mut worker = FrameWorker {
        engine: PostureEngine::new(options.alert, options.min_confidence),
        ctx,
        run_id,
        alarms_raised: 0,
        last_snapshot: StatusSnapshot::default(),
    };

    let result = worker
        .drive(source, pose, furniture, &options, &cancel_token)
        .await;
    worker.finish(result.is_ok()).await;
    result?;

    let metrics = worker.ctx.metrics.get_snapshot().await;
    Ok(LoopSummary {
        run_id: worker.run_id,
        frames_processed: worker.engine.frames_processed(),
        alarms_raised: worker.alarms_raised,
        last_snapshot: worker.last_snapshot,
        metrics,
    })
}

impl FrameWorker {
    async fn drive<S, P, F>(
        &mut self,
        mut source: S,
        pose: Arc<P>,
        furniture: Arc<F>,
        options: &MonitorOptions,
        cancel_token: &CancellationToken,
    ) -> Result<()>
    where
        S: FrameSource + 'static,
        P: PoseProvider<S::Frame> + 'static,
        F: FurnitureProvider<S::Frame> + 'static,
    {
        let mut ticker = options.frame_interval.map(|period| {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let clock_base = Instant::now();
        let pace_base = time::Instant::now();

        loop {
            if let Some(ticker) = ticker.as_mut() {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => {
                        log_info!("monitor loop shutting down");
                        return Ok(());
                    }
                    _ = ticker.tick() => {}
                }
            }

            let read = tokio::task::spawn_blocking(move || {
                let next = source.next_frame();
                (source, next)
            });
            let next = tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    log_info!("monitor loop shutting down");
                    return Ok(());
                }
                joined = read => {
                    let (returned, next) = joined.context("frame source worker join failed")?;
                    source = returned;
                    next.context("frame source failed")?
                }
            };

            let Some(frame) = next else {
                log_info!(
                    "frame source exhausted after {} frames",
                    self.engine.frames_processed()
                );
                return Ok(());
            };

            let now = match source.frame_offset(&frame) {
                Some(offset) => {
                    if options.pace_by_timestamps {
                        tokio::select! {
                            biased;
                            _ = cancel_token.cancelled() => return Ok(()),
                            _ = time::sleep_until(pace_base + offset) => {}
                        }
                    }
                    clock_base + offset
                }
                None => Instant::now(),
            };

            let started = Instant::now();
            let frame = Arc::new(frame);
            let detect = detect(frame, Arc::clone(&pose), Arc::clone(&furniture));

            match time::timeout(options.frame_timeout, detect).await {
                Ok(detections) => self.handle_frame(detections?, now, started).await,
                Err(_) => {
                    log_warn!(
                        "frame timed out (> {}ms), skipping",
                        options.frame_timeout.as_millis()
                    );
                    self.engine.skip_frame();
                    self.ctx.metrics.record_timeout().await;
                }
            }
        }
    }

    async fn handle_frame(&mut self, detections: Detections, now: Instant, started: Instant) {
        let pose = match detections.pose {
            Ok(pose) => pose,
            Err(err) => {
                log_warn!("pose provider failed: {err:#}");
                None
            }
        };
        let furniture = match detections.furniture {
            Ok(boxes) => Some(boxes),
            Err(err) => {
                log_warn!("furniture provider unavailable: {err:#}");
                None
            }
        };

        let outcome = self
            .engine
            .process_raw(pose.as_ref(), furniture.as_deref(), now);

        for event in &outcome.events {
            self.dispatch(event).await;
        }

        let mut snapshot = outcome.snapshot;
        snapshot.updated_at = Some(Utc::now());

        log_debug!(
            "frame {}: phase={:?} alarm={} sustained={}s",
            snapshot.frame_index,
            snapshot.phase,
            snapshot.alarm_active,
            snapshot.sustained_duration_secs
        );

        self.ctx
            .metrics
            .record_frame(FrameMetrics {
                timestamp: Utc::now(),
                frame_index: snapshot.frame_index,
                pose_ms: detections.pose_elapsed.as_millis() as u64,
                furniture_ms: detections.furniture_elapsed.as_millis() as u64,
                total_ms: started.elapsed().as_millis() as u64,
                person_detected: snapshot.person_detected,
                invalid_geometry: matches!(outcome.observation, Observation::Invalid(_)),
                furniture_unavailable: furniture.is_none(),
            })
            .await;

        if let Some(frame_log) = &self.ctx.frame_log {
            if frame_log.send(snapshot.clone()).is_err() {
                log_debug!("frame log receiver dropped");
            }
        }
        self.ctx.status_tx.send_replace(snapshot.clone());
        self.last_snapshot = snapshot;
    }

    async fn dispatch(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::AlarmRaised => {
                self.alarms_raised += 1;
                log_warn!(
                    "fall confirmed at frame {}, alarm on",
                    self.engine.frames_processed()
                );
                if let Some(alarm) = &self.ctx.alarm {
                    if let Err(err) = alarm.raise() {
                        log_error!("failed to sound alarm: {err}");
                    }
                }
                if let Some(journal) = &self.ctx.journal {
                    if let Err(err) = journal.open_incident(&self.run_id, Utc::now()).await {
                        log_error!("failed to record incident: {err:#}");
                    }
                }
            }
            AlertEvent::AlarmCleared { reason } => {
                log_warn!("alarm cleared ({reason:?})");
                if let Some(alarm) = &self.ctx.alarm {
                    if let Err(err) = alarm.silence() {
                        log_error!("failed to silence alarm: {err}");
                    }
                }
                if let Some(journal) = &self.ctx.journal {
                    let resolution = IncidentResolution::from(*reason);
                    if let Err(err) = journal
                        .resolve_open_incident(&self.run_id, Utc::now(), resolution)
                        .await
                    {
                        log_error!("failed to close incident: {err:#}");
                    }
                }
            }
            AlertEvent::SustainedActivity {
                posture,
                duration_secs,
            } => {
                log_info!("{posture} for {duration_secs}s, time to change position");
            }
        }
    }

    async fn finish(&mut self, completed: bool) {
        if let Some(alarm) = &self.ctx.alarm {
            if alarm.is_sounding() {
                if let Err(err) = alarm.silence() {
                    log_error!("failed to silence alarm on shutdown: {err}");
                }
            }
        }

        if let Some(journal) = &self.ctx.journal {
            let status = if completed {
                RunStatus::Completed
            } else {
                RunStatus::Interrupted
            };
            if let Err(err) = journal
                .finish_run(
                    &self.run_id,
                    status,
                    self.engine.frames_processed(),
                    Utc::now(),
                )
                .await
            {
                log_error!("failed to close monitor run {}: {err:#}", self.run_id);
            }
        }

        log_info!(
            "monitor loop finished after {} frames, {} alarm(s)",
            self.engine.frames_processed(),
            self.alarms_raised
        );
    }
}

async fn detect<Fr, P, F>(frame: Arc<Fr>, pose: Arc<P>, furniture: Arc<F>) -> Result<Detections>
where
    Fr: Send + Sync + 'static,
    P: PoseProvider<Fr> + 'static,
    F: FurnitureProvider<Fr> + 'static,
{
    let pose_task = tokio::task::spawn_blocking({
        let frame = Arc::clone(&frame);
        move || {
            let started = Instant::now();
            let result = pose.detect_pose(&frame);
            (result, started.elapsed())
        }
    });
    let furniture_task = tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let result = furniture.detect_furniture(&frame);
        (result, started.elapsed())
    });

    let (pose_joined, furniture_joined) = tokio::join!(pose_task, furniture_task);
    let (pose, pose_elapsed) = pose_joined.context("pose worker join failed")?;
    let (furniture, furniture_elapsed) =
        furniture_joined.context("furniture worker join failed")?;

    Ok(Detections {
        pose,
        furniture,
        pose_elapsed,
        furniture_elapsed,
    })
}
