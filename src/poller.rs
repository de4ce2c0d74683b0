//! Background ICMP sampler, one per monitored host.
//!
//! The sampling task owns its buffer writes; readers only ever see
//! cloned snapshots. Cancellation is cooperative: the interval wait is
//! sliced so a stop request is observed within about a second.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::probe::{self, PingOutcome};
use crate::sample::{Sample, SampleBuffer};

/// Longest uninterrupted wait between stop-flag checks.
const SLEEP_SLICE: Duration = Duration::from_secs(1);

pub struct IcmpPoller {
    host: String,
    sample_count: u32,
    interval: Duration,
    buffer: Arc<RwLock<SampleBuffer>>,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl IcmpPoller {
    pub fn new(host: &str, sample_count: u32, interval_secs: u64, rotate_hours: u64) -> Self {
        Self {
            host: host.to_string(),
            sample_count,
            interval: Duration::from_secs(interval_secs),
            buffer: Arc::new(RwLock::new(SampleBuffer::new(rotate_hours, interval_secs))),
            stop_tx: None,
            handle: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Spawn the sampling task. A second start while running is a no-op.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            tracing::warn!("poller for '{}' is already running", self.host);
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.handle = Some(tokio::spawn(run_sample_loop(
            self.host.clone(),
            self.sample_count,
            self.interval,
            self.buffer.clone(),
            stop_rx,
        )));
        self.stop_tx = Some(stop_tx);
        tracing::info!("started icmp poller for '{}'", self.host);
    }

    /// Signal the sampling task and wait for it to exit. Idempotent:
    /// finishing a stopped or never-started poller does nothing.
    pub async fn finish(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("icmp poller for '{}' panicked: {}", self.host, e);
            }
            tracing::info!("finished icmp poller for '{}'", self.host);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub async fn snapshot(&self) -> Vec<Sample> {
        self.buffer.read().await.snapshot()
    }
}

async fn run_sample_loop(
    host: String,
    sample_count: u32,
    interval: Duration,
    buffer: Arc<RwLock<SampleBuffer>>,
    mut stop_rx: watch::Receiver<bool>,
) {
    // Log rate limiting only; not alert state
    let mut failure_streak: u32 = 0;

    while !*stop_rx.borrow() {
        let sample = match probe::sample(&host, sample_count).await {
            PingOutcome::Stats(stats) => {
                failure_streak = 0;
                Sample::stats(Utc::now(), stats.min_ms, stats.avg_ms, stats.max_ms)
            }
            PingOutcome::Loss => Sample::lost(Utc::now()),
            PingOutcome::Failed(detail) => {
                if failure_streak == 0 {
                    tracing::warn!("cannot ping to host '{}': {}", host, detail);
                } else if failure_streak % 10 == 0 {
                    tracing::warn!(
                        "cannot ping to host '{}' ({} consecutive failures): {}",
                        host,
                        failure_streak,
                        detail
                    );
                }
                failure_streak += 1;
                Sample::lost(Utc::now())
            }
        };
        buffer.write().await.push(sample);

        // Wait out the interval in short slices so finish() stays responsive
        let deadline = tokio::time::Instant::now() + interval;
        loop {
            if *stop_rx.borrow() {
                return;
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            let slice = std::cmp::min(deadline - now, SLEEP_SLICE);
            tokio::select! {
                _ = tokio::time::sleep(slice) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        return;
                    }
                }
            }
        }
    }
}
