//! SQLite record of monitoring runs and the fall incidents raised during them.
//! One thread owns the connection; callers hand it closures and await the reply.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use rusqlite::Connection;
use tokio::sync::oneshot;

mod helpers;
mod incidents;
mod migrations;
pub mod models;
mod runs;

pub use models::{Incident, IncidentResolution, MonitorRun, RunStatus};

use migrations::run_migrations;

/// A replay and a live monitor may write to the same file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Dropping the last `Journal` clone closes the queue; the thread drains what
/// is left and is joined here.
struct Worker {
    jobs: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(thread) = self.thread.take() {
            if let Err(err) = thread.join() {
                error!("Journal thread panicked: {err:?}");
            }
        }
    }
}

#[derive(Clone)]
pub struct Journal {
    worker: Arc<Worker>,
}

fn open_connection(path: &Path) -> Result<Connection> {
    let mut conn = Connection::open(path)
        .with_context(|| format!("failed to open journal {}", path.display()))?;

    conn.busy_timeout(BUSY_TIMEOUT)
        .context("failed to set journal busy timeout")?;
    if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
        warn!("Journal stays in rollback mode: {err}");
    }
    // incidents reference their run
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign keys")?;

    run_migrations(&mut conn).context("failed to run journal migrations")?;
    Ok(conn)
}

impl Journal {
    /// Opens (or creates) the journal and brings its schema up to date before
    /// returning, so a bad file fails here rather than on the first write.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create journal directory {}", parent.display())
            })?;
        }

        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path = db_path.clone();

        let thread = thread::Builder::new()
            .name("fallwatch-journal".into())
            .spawn(move || {
                let mut conn = match open_connection(&path) {
                    Ok(conn) => {
                        if ready_tx.send(Ok(())).is_err() {
                            return;
                        }
                        conn
                    }
                    Err(err) => {
                        if ready_tx.send(Err(err)).is_err() {
                            error!("Journal opener went away before the failure was reported");
                        }
                        return;
                    }
                };

                for job in jobs_rx {
                    job(&mut conn);
                }
                info!("Journal closed");
            })
            .context("failed to spawn journal worker thread")?;

        let worker = Worker {
            jobs: Some(jobs_tx),
            thread: Some(thread),
        };
        ready_rx
            .recv()
            .context("journal worker exited before signaling readiness")??;

        info!("Journal opened at {}", db_path.display());
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let jobs = self
            .worker
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("journal is closed"))?;
        let (reply_tx, reply_rx) = oneshot::channel();

        jobs.send(Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                error!("Journal caller dropped before receiving result");
            }
        }))
        .map_err(|_| anyhow!("journal thread is gone"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("journal thread terminated unexpectedly"))?
    }
}
