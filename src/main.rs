//! anyping - debounced liveness monitor.
//!
//! Watches DNS, HTTP, and ICMP targets, tracks ICMP latency over time,
//! and emits debounced up/down notifications through the configured
//! sink.

mod alert;
mod config;
mod notify;
mod poller;
mod probe;
mod registry;
mod render;
mod sample;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use config::MonitorConfig;
use notify::{LogNotifier, Notifier};
use registry::{render_icmp_report, Servers};
use render::{NullRenderer, SeriesRenderer};
use worker::{TaskSlot, WorkerMessage, WorkerQueue};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Worker mailbox capacity; overflow is dropped, not queued.
const QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("anyping=info".parse()?),
        )
        .init();

    let cfg = MonitorConfig::load()?;
    tracing::info!("ping interval: {} sec", cfg.ping_interval);
    tracing::info!("alert delay: {} ticks", cfg.alert_delay);

    let mut servers = Servers::new(&cfg).await;
    servers.start();

    let notifier = LogNotifier;
    let renderer: Arc<dyn SeriesRenderer> = Arc::new(NullRenderer);
    let mut queue = WorkerQueue::new(QUEUE_CAPACITY);
    let report_slot = TaskSlot::new();

    // Initial point-in-time status, before any debounced round
    let status = servers.get_status_of_servers().await;
    notifier.notify(None, &status, &[]);

    let mut interval = tokio::time::interval(Duration::from_secs(cfg.ping_interval));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    // Graph report roughly once an hour
    let report_every = (3600 / cfg.ping_interval.max(1)).max(1);
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                for message in queue.drain() {
                    notifier.notify(
                        message.channel.as_deref(),
                        &message.body,
                        &message.attachments,
                    );
                }

                let transitions = servers.ping().await;
                if !transitions.is_empty() {
                    notifier.notify(None, &transitions, &[]);
                }

                ticks += 1;
                if ticks % report_every == 0 {
                    spawn_graph_report(&servers, &cfg, &renderer, &report_slot, &queue).await;
                }
            }
        }
    }

    tracing::info!("shutting down");
    servers.finish().await;
    Ok(())
}

/// Render the latency graphs off the main loop; the finished report
/// comes back through the worker queue. Skipped if the previous report
/// is still rendering.
async fn spawn_graph_report(
    servers: &Servers,
    cfg: &MonitorConfig,
    renderer: &Arc<dyn SeriesRenderer>,
    slot: &TaskSlot,
    queue: &WorkerQueue,
) {
    let Some(prefix) = cfg.icmp_file_prefix.clone() else {
        tracing::warn!("no icmp_file_prefix");
        return;
    };

    let snapshots = servers.icmp_snapshots().await;
    let renderer = renderer.clone();
    let sender = queue.sender();
    let accepted = slot.try_spawn(async move {
        let outfiles = render_icmp_report(&snapshots, &prefix, renderer.as_ref());
        if !outfiles.is_empty() {
            let mut message = WorkerMessage::text("ping statistics");
            message.attachments = outfiles;
            sender.push(message);
        }
    });
    if !accepted {
        tracing::warn!("graph report already in progress");
    }
}
