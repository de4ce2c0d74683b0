//! ICMP probe via the system ping binary.
//!
//! A batched round parses the min/avg/max summary line; packet loss and
//! execution failure degrade into null samples rather than errors.

use std::process::Stdio;
use std::sync::OnceLock;

use regex::Regex;
use tokio::process::Command;

use super::{CheckResult, ProbeError};

/// One round of batched ping statistics, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingStats {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

/// Outcome of one batched round.
#[derive(Debug, Clone, PartialEq)]
pub enum PingOutcome {
    /// Probe ran and all replies arrived.
    Stats(PingStats),
    /// Probe ran but some packets were lost (exit status 1).
    Loss,
    /// Probe could not reach the host at all (exit status >= 2).
    Failed(String),
}

/// Construction-time reachability probe (3 pings). An exit status of 2
/// or more means the host cannot be probed at all.
pub async fn ping_once(host: &str) -> Result<(), ProbeError> {
    let output = run_ping(host, 3).await?;
    match output.status.code() {
        Some(code) if code >= 2 => Err(ProbeError::Unreachable(host.to_string())),
        None => Err(ProbeError::Unreachable(host.to_string())),
        _ => Ok(()),
    }
}

/// Run one batched round of `count` pings.
pub async fn sample(host: &str, count: u32) -> PingOutcome {
    let output = match run_ping(host, count).await {
        Ok(o) => o,
        Err(e) => return PingOutcome::Failed(e.to_string()),
    };
    classify_output(
        output.status.code(),
        &String::from_utf8_lossy(&output.stdout),
        &String::from_utf8_lossy(&output.stderr),
    )
}

/// On-demand status probe; the diagnostic is a latency report.
pub async fn ping_check(host: &str, count: u32) -> CheckResult {
    match sample(host, count).await {
        PingOutcome::Stats(stats) => CheckResult::up(format!(
            "min/avg/max = {:.3}/{:.3}/{:.3} ms",
            stats.min_ms, stats.avg_ms, stats.max_ms
        )),
        PingOutcome::Loss => CheckResult::down("packet loss"),
        PingOutcome::Failed(detail) => {
            CheckResult::down(format!("cannot ping to host '{}': {}", host, detail))
        }
    }
}

async fn run_ping(host: &str, count: u32) -> Result<std::process::Output, ProbeError> {
    Command::new("ping")
        .args(["-c", &count.to_string(), host])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))
}

fn classify_output(code: Option<i32>, stdout: &str, stderr: &str) -> PingOutcome {
    match code {
        Some(0) => match parse_ping_summary(stdout) {
            Some(stats) => PingOutcome::Stats(stats),
            None => PingOutcome::Failed(format!("failed to parse ping output: {}", stdout)),
        },
        Some(1) => PingOutcome::Loss,
        Some(_) => PingOutcome::Failed(stderr.trim().to_string()),
        None => PingOutcome::Failed("ping terminated by signal".to_string()),
    }
}

/// Parse the summary line for min/avg/max.
///
/// Matches both "rtt min/avg/max/mdev = ..." (Linux) and
/// "round-trip min/avg/max/stddev = ..." (macOS).
fn parse_ping_summary(output: &str) -> Option<PingStats> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?:rtt|round-trip)\s+min/avg/max[^=]*=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)")
            .unwrap()
    });

    let caps = re.captures(output)?;
    Some(PingStats {
        min_ms: caps.get(1)?.as_str().parse().ok()?,
        avg_ms: caps.get(2)?.as_str().parse().ok()?,
        max_ms: caps.get(3)?.as_str().parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX_OUTPUT: &str = r#"PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.3 ms

--- 8.8.8.8 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 11.906/12.300/12.700/0.300 ms"#;

    const MACOS_OUTPUT: &str = r#"PING google.com (142.250.69.174): 56 data bytes

--- google.com ping statistics ---
3 packets transmitted, 3 packets received, 0.0% packet loss
round-trip min/avg/max/stddev = 17.906/18.101/18.400/0.200 ms"#;

    #[test]
    fn test_parse_summary_linux() {
        let stats = parse_ping_summary(LINUX_OUTPUT).unwrap();
        assert!((stats.min_ms - 11.906).abs() < 1e-9);
        assert!((stats.avg_ms - 12.3).abs() < 1e-9);
        assert!((stats.max_ms - 12.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_summary_macos() {
        let stats = parse_ping_summary(MACOS_OUTPUT).unwrap();
        assert!((stats.avg_ms - 18.101).abs() < 1e-9);
    }

    #[test]
    fn test_parse_summary_missing() {
        assert_eq!(parse_ping_summary("garbage"), None);
    }

    #[test]
    fn test_classify_success() {
        assert!(matches!(
            classify_output(Some(0), LINUX_OUTPUT, ""),
            PingOutcome::Stats(_)
        ));
    }

    #[test]
    fn test_classify_loss() {
        assert_eq!(classify_output(Some(1), "", ""), PingOutcome::Loss);
    }

    #[test]
    fn test_classify_hard_failure() {
        assert_eq!(
            classify_output(Some(2), "", "ping: unknown host\n"),
            PingOutcome::Failed("ping: unknown host".to_string())
        );
    }

    #[test]
    fn test_classify_unparsable() {
        assert!(matches!(
            classify_output(Some(0), "garbage", ""),
            PingOutcome::Failed(_)
        ));
    }
}
