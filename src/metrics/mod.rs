mod types;

pub use types::{FrameMetrics, MetricsSnapshot, SystemMetrics};

use std::collections::VecDeque;
use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_FRAMES: usize = 50;

#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_frames: VecDeque<FrameMetrics>,
    frame_count: u64,
    person_frames: u64,
    invalid_frames: u64,
    furniture_failures: u64,
    timeouts: u64,
    system: System,
    pid: Pid,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // CPU usage is a delta between refreshes; take the baseline now.
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_frames: VecDeque::with_capacity(MAX_RECENT_FRAMES),
                frame_count: 0,
                person_frames: 0,
                invalid_frames: 0,
                furniture_failures: 0,
                timeouts: 0,
                system,
                pid,
            })),
        }
    }

    pub async fn record_frame(&self, metrics: FrameMetrics) {
        let mut state = self.inner.lock().await;

        state.frame_count += 1;
        if metrics.person_detected {
            state.person_frames += 1;
        }
        if metrics.invalid_geometry {
            state.invalid_frames += 1;
        }
        if metrics.furniture_unavailable {
            state.furniture_failures += 1;
        }

        state.recent_frames.push_back(metrics);
        if state.recent_frames.len() > MAX_RECENT_FRAMES {
            state.recent_frames.pop_front();
        }
    }

    pub async fn record_timeout(&self) {
        self.inner.lock().await.timeouts += 1;
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let pid = state.pid;
        state.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        let system = state
            .system
            .process(pid)
            .map(|process| SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            })
            .unwrap_or_default();

        MetricsSnapshot {
            system,
            recent_frames: state.recent_frames.iter().cloned().collect(),
            frame_count: state.frame_count,
            person_frames: state.person_frames,
            invalid_frames: state.invalid_frames,
            furniture_failures: state.furniture_failures,
            timeouts: state.timeouts,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
