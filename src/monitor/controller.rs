use anyhow::{anyhow, bail, Context, Result};
use log::info;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    engine::StatusSnapshot,
    providers::{FrameSource, FurnitureProvider, PoseProvider},
};

use super::loop_worker::{monitor_loop, LoopSummary, MonitorContext};
use super::MonitorOptions;

/// Owns the status channel and at most one running monitor loop.
pub struct MonitorController {
    handle: Option<JoinHandle<Result<LoopSummary>>>,
    cancel_token: Option<CancellationToken>,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl MonitorController {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(StatusSnapshot::default());
        Self {
            handle: None,
            cancel_token: None,
            status_tx,
        }
    }

    /// Readers see the latest snapshot; intermediate frames may be skipped.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_tx.subscribe()
    }

    /// Context wired to this controller's status channel.
    pub fn context(&self) -> MonitorContext {
        MonitorContext::new(self.status_tx.clone())
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start<S, P, F>(
        &mut self,
        source: S,
        pose: Arc<P>,
        furniture: Arc<F>,
        options: MonitorOptions,
        ctx: MonitorContext,
    ) -> Result<()>
    where
        S: FrameSource + 'static,
        P: PoseProvider<S::Frame> + 'static,
        F: FurnitureProvider<S::Frame> + 'static,
    {
        if self.is_running() {
            bail!("monitor already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(monitor_loop(
            source,
            pose,
            furniture,
            options,
            ctx,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("Monitor started");
        Ok(())
    }

    /// Waits for the loop to run out of frames on its own.
    pub async fn wait(&mut self) -> Result<LoopSummary> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("monitor not started"))?;
        self.cancel_token = None;
        handle.await.context("monitor loop task failed to join")?
    }

    /// Cancels the loop and waits for it to wind down. Returns `None` if no loop
    /// was started.
    pub async fn stop(&mut self) -> Result<Option<LoopSummary>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                let summary = handle.await.context("monitor loop task failed to join")??;
                info!("Monitor stopped");
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}
