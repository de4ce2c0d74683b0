//! Probe module for liveness checks.
//!
//! Supports DNS, HTTP (Web), and ICMP probes.

mod dns;
mod http;
mod ping;

pub use dns::*;
pub use http::*;
pub use ping::*;

use thiserror::Error;

/// Probe error types. Expected network failures never surface here;
/// they fold into a dead [`CheckResult`] instead.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("cannot ping to host '{0}'")]
    Unreachable(String),
    #[error("command failed: {0}")]
    Command(String),
}

/// Outcome of a single liveness probe.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub alive: bool,
    pub diagnostic: String,
}

impl CheckResult {
    pub fn up(diagnostic: impl Into<String>) -> Self {
        Self {
            alive: true,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn down(diagnostic: impl Into<String>) -> Self {
        Self {
            alive: false,
            diagnostic: diagnostic.into(),
        }
    }
}

/// A point-in-time liveness checker for one target.
#[derive(Debug, Clone)]
pub enum Checker {
    Dns(DnsChecker),
    Web(WebChecker),
    Icmp { host: String, count: u32 },
}

impl Checker {
    /// Run one probe. Timeouts and refusals map to a dead result,
    /// never an error.
    pub async fn check(&self) -> CheckResult {
        match self {
            Checker::Dns(c) => c.check().await,
            Checker::Web(c) => c.check().await,
            Checker::Icmp { host, count } => ping_check(host, *count).await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Checker::Dns(_) => "DNS",
            Checker::Web(_) => "Web",
            Checker::Icmp { .. } => "ICMP",
        }
    }
}
