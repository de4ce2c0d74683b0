//! Target registry and status aggregation.
//!
//! Owns every configured checker, its debouncer, and the background
//! ICMP pollers. The debounced `ping` round reports transitions only;
//! `get_status_of_servers` bypasses debouncing and reports current
//! truth.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::alert::{AlertDebouncer, AlertEvent};
use crate::config::{MonitorConfig, ServerKind, ServerSpec};
use crate::poller::IcmpPoller;
use crate::probe::{self, Checker, DnsChecker, WebChecker};
use crate::render::{Series, SeriesRenderer};
use crate::sample::{valid_points, Sample};

/// Pings per on-demand ICMP check and per construction probe.
const CHECK_PING_COUNT: u32 = 3;

struct ServerEntry {
    checker: Checker,
    debouncer: AlertDebouncer,
    last_message: String,
}

pub struct Servers {
    servers: BTreeMap<String, ServerEntry>,
    icmp_pollers: Vec<IcmpPoller>,
    icmp_file_prefix: Option<String>,
}

impl Servers {
    /// Build the registry, probing each target once to seed its
    /// debouncer. An ICMP host whose construction probe cannot run is
    /// skipped; the rest of the registry still comes up.
    pub async fn new(config: &MonitorConfig) -> Self {
        let mut servers = BTreeMap::new();
        for (name, spec) in &config.ping_servers {
            let checker = build_checker(name, spec);
            let result = checker.check().await;
            tracing::debug!(
                "initial probe of '{}' ({}): alive={} ({})",
                name,
                checker.kind(),
                result.alive,
                result.diagnostic
            );
            servers.insert(
                name.clone(),
                ServerEntry {
                    checker,
                    debouncer: AlertDebouncer::new(config.alert_delay, result.alive),
                    last_message: result.diagnostic,
                },
            );
        }

        let mut icmp_pollers = Vec::new();
        for host in &config.icmp_hosts {
            match probe::ping_once(host).await {
                Ok(()) => icmp_pollers.push(IcmpPoller::new(
                    host,
                    config.icmp_sample_size,
                    config.icmp_interval,
                    config.icmp_rotate,
                )),
                Err(e) => tracing::error!("skipping icmp host '{}': {}", host, e),
            }
        }

        Self {
            servers,
            icmp_pollers,
            icmp_file_prefix: config.icmp_file_prefix.clone(),
        }
    }

    pub fn start(&mut self) {
        for poller in &mut self.icmp_pollers {
            poller.start();
        }
    }

    pub async fn finish(&mut self) {
        for poller in &mut self.icmp_pollers {
            poller.finish().await;
        }
    }

    /// One debounced round over all targets. Returns the accumulated
    /// transition lines; empty when nothing changed state.
    pub async fn ping(&mut self) -> String {
        let mut messages = String::new();
        for (name, entry) in &mut self.servers {
            let result = entry.checker.check().await;
            tracing::debug!(
                "'{}': alive={} ({}; was: {})",
                name,
                result.alive,
                result.diagnostic,
                entry.last_message
            );
            match entry.debouncer.tick(result.alive, &result.diagnostic) {
                Some(AlertEvent::Up) => {
                    messages.push_str(&format!("{} is up\n", name));
                }
                Some(AlertEvent::Down(diagnostic)) => {
                    messages.push_str(&format!(
                        "{} ({}) is down: {}\n",
                        name,
                        entry.checker.kind(),
                        diagnostic
                    ));
                }
                None => {}
            }
            entry.last_message = result.diagnostic;
        }
        messages
    }

    /// Fresh probes of every target, reported unconditionally.
    pub async fn get_status_of_servers(&mut self) -> String {
        let mut messages = String::new();
        for (name, entry) in &mut self.servers {
            let result = entry.checker.check().await;
            if result.alive {
                messages.push_str(&format!("{} ({}) is up\n", name, entry.checker.kind()));
            } else {
                messages.push_str(&format!(
                    "{} ({}) is down: {}\n",
                    name,
                    entry.checker.kind(),
                    result.diagnostic
                ));
            }
            entry.last_message = result.diagnostic;
        }
        messages
    }

    /// Current buffer contents per ICMP host, in configuration order.
    pub async fn icmp_snapshots(&self) -> Vec<(String, Vec<Sample>)> {
        let mut snapshots = Vec::with_capacity(self.icmp_pollers.len());
        for poller in &self.icmp_pollers {
            snapshots.push((poller.host().to_string(), poller.snapshot().await));
        }
        snapshots
    }

    /// Render one graph per host plus a combined one; returns the
    /// `(path, title)` pairs actually produced.
    pub async fn save_icmp_results(
        &self,
        renderer: &dyn SeriesRenderer,
    ) -> Vec<(PathBuf, String)> {
        if self.icmp_pollers.is_empty() {
            tracing::warn!("no icmp hosts");
            return Vec::new();
        }
        let Some(prefix) = self.icmp_file_prefix.clone() else {
            tracing::warn!("no icmp_file_prefix");
            return Vec::new();
        };
        let snapshots = self.icmp_snapshots().await;
        render_icmp_report(&snapshots, &prefix, renderer)
    }
}

fn build_checker(name: &str, spec: &ServerSpec) -> Checker {
    match spec.kind {
        ServerKind::Dns => Checker::Dns(DnsChecker::new(
            name,
            spec.hostname.as_deref().unwrap_or("www.google.com"),
        )),
        ServerKind::Web => Checker::Web(WebChecker::new(name)),
        ServerKind::Icmp => Checker::Icmp {
            host: name.to_string(),
            count: CHECK_PING_COUNT,
        },
    }
}

/// Draw the combined graph and the per-host graphs, skipping any series
/// with fewer than 2 valid samples.
pub fn render_icmp_report(
    snapshots: &[(String, Vec<Sample>)],
    prefix: &str,
    renderer: &dyn SeriesRenderer,
) -> Vec<(PathBuf, String)> {
    let mut outfiles = Vec::new();

    let mut combined: Vec<Series> = Vec::new();
    for (host, samples) in snapshots {
        let points = valid_points(samples);
        if points.len() < 2 {
            tracing::info!(
                "skip traffic plot because {} has too few data ({})",
                host,
                points.len()
            );
            continue;
        }
        combined.push((host.clone(), points));
    }
    if !combined.is_empty() {
        let path = PathBuf::from(format!("{}_all.png", prefix));
        if renderer.render(&combined, &path) {
            outfiles.push((path, "all".to_string()));
        }
    }

    for (n, (host, samples)) in snapshots.iter().enumerate() {
        let points = valid_points(samples);
        if points.len() < 2 {
            continue;
        }
        let path = PathBuf::from(format!("{}_{}.png", prefix, n));
        if renderer.render(&[(host.clone(), points)], &path) {
            outfiles.push((path, host.clone()));
        }
    }

    outfiles
}
