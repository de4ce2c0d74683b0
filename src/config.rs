//! Configuration module for anyping.
//!
//! Loads the monitor configuration from a JSON file whose path is taken
//! from the `ANYPING_CONFIG` environment variable. All configuration
//! errors are fatal at load time and never retried.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no 'ANYPING_CONFIG' in environment variables")]
    MissingEnv,
    #[error("cannot open configuration file '{0}': {1}")]
    Unreadable(String, std::io::Error),
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("'anyping' key not found in '{0}'")]
    MissingSection(String),
    #[error("no 'ping_servers' in configuration file")]
    NoServers,
    #[error("'{0}' must be a positive integer")]
    NotPositive(&'static str),
}

/// Kind of liveness check for one named target.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub enum ServerKind {
    #[serde(rename = "DNS")]
    Dns,
    #[serde(rename = "Web")]
    Web,
    #[serde(rename = "ICMP")]
    Icmp,
}

/// Kind-specific parameters for one entry of `ping_servers`. The map
/// key doubles as the target address (nameserver, URL, or host).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSpec {
    #[serde(rename = "type")]
    pub kind: ServerKind,
    /// Hostname resolved through a DNS target.
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub ping_servers: BTreeMap<String, ServerSpec>,
    /// Seconds between debounced check rounds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Consecutive failed rounds before a down alert.
    #[serde(default = "default_alert_delay")]
    pub alert_delay: u32,
    #[serde(default)]
    pub icmp_hosts: Vec<String>,
    /// Pings per ICMP round.
    #[serde(default = "default_icmp_sample_size")]
    pub icmp_sample_size: u32,
    /// Seconds between ICMP rounds.
    #[serde(default = "default_icmp_interval")]
    pub icmp_interval: u64,
    /// Rotation window for ICMP samples, in hours.
    #[serde(default = "default_icmp_rotate")]
    pub icmp_rotate: u64,
    /// Graph files are written as `<prefix>_<n>.png`.
    #[serde(default)]
    pub icmp_file_prefix: Option<String>,
}

fn default_ping_interval() -> u64 {
    60
}

fn default_alert_delay() -> u32 {
    1
}

fn default_icmp_sample_size() -> u32 {
    20
}

fn default_icmp_interval() -> u64 {
    120
}

fn default_icmp_rotate() -> u64 {
    48
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    anyping: Option<MonitorConfig>,
}

impl MonitorConfig {
    /// Load from the file named by `ANYPING_CONFIG`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("ANYPING_CONFIG").map_err(|_| ConfigError::MissingEnv)?;
        if path.is_empty() {
            return Err(ConfigError::MissingEnv);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let text =
            fs::read_to_string(path).map_err(|e| ConfigError::Unreadable(path.to_string(), e))?;
        let file: ConfigFile = serde_json::from_str(&text)?;
        let config = file
            .anyping
            .ok_or_else(|| ConfigError::MissingSection(path.to_string()))?;
        if config.ping_servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        // A zero interval cannot tick and a zero delay breaks the
        // debounce invariant; both are fatal, like the original's
        // falsy-key checks.
        if config.ping_interval == 0 {
            return Err(ConfigError::NotPositive("ping_interval"));
        }
        if config.alert_delay == 0 {
            return Err(ConfigError::NotPositive("alert_delay"));
        }
        if config.icmp_interval == 0 {
            return Err(ConfigError::NotPositive("icmp_interval"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"{
        "anyping": {
            "ping_servers": {
                "8.8.8.8": {"type": "DNS", "hostname": "www.google.com"},
                "https://example.com/": {"type": "Web"},
                "192.0.2.1": {"type": "ICMP"}
            },
            "ping_interval": 30,
            "alert_delay": 3,
            "icmp_hosts": ["www.example.com"],
            "icmp_sample_size": 10,
            "icmp_interval": 60,
            "icmp_rotate": 24,
            "icmp_file_prefix": "/tmp/icmp"
        }
    }"#;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(FULL);
        let config = MonitorConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.ping_servers.len(), 3);
        assert_eq!(config.ping_servers["8.8.8.8"].kind, ServerKind::Dns);
        assert_eq!(
            config.ping_servers["8.8.8.8"].hostname.as_deref(),
            Some("www.google.com")
        );
        assert_eq!(config.ping_interval, 30);
        assert_eq!(config.alert_delay, 3);
        assert_eq!(config.icmp_hosts, vec!["www.example.com"]);
        assert_eq!(config.icmp_file_prefix.as_deref(), Some("/tmp/icmp"));
    }

    #[test]
    fn test_defaults_for_optional_keys() {
        let file = write_config(
            r#"{"anyping": {"ping_servers": {"https://example.com/": {"type": "Web"}}}}"#,
        );
        let config = MonitorConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.ping_interval, 60);
        assert_eq!(config.alert_delay, 1);
        assert_eq!(config.icmp_sample_size, 20);
        assert_eq!(config.icmp_interval, 120);
        assert_eq!(config.icmp_rotate, 48);
        assert!(config.icmp_hosts.is_empty());
        assert!(config.icmp_file_prefix.is_none());
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let file = write_config("{ not json");
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_section() {
        let file = write_config(r#"{"other": {}}"#);
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::MissingSection(_))
        ));
    }

    #[test]
    fn test_empty_ping_servers() {
        let file = write_config(r#"{"anyping": {"ping_servers": {}}}"#);
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::NoServers)
        ));
    }

    #[test]
    fn test_unknown_server_type() {
        let file = write_config(
            r#"{"anyping": {"ping_servers": {"x": {"type": "Carrier-Pigeon"}}}}"#,
        );
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_alert_delay_is_fatal() {
        // A zero delay would fire an Up on every alive round
        let file = write_config(
            r#"{"anyping": {"ping_servers": {"https://example.com/": {"type": "Web"}}, "alert_delay": 0}}"#,
        );
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::NotPositive("alert_delay"))
        ));
    }

    #[test]
    fn test_zero_ping_interval_is_fatal() {
        let file = write_config(
            r#"{"anyping": {"ping_servers": {"https://example.com/": {"type": "Web"}}, "ping_interval": 0}}"#,
        );
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::NotPositive("ping_interval"))
        ));
    }

    #[test]
    fn test_zero_icmp_interval_is_fatal() {
        let file = write_config(
            r#"{"anyping": {"ping_servers": {"https://example.com/": {"type": "Web"}}, "icmp_interval": 0}}"#,
        );
        assert!(matches!(
            MonitorConfig::load_from(file.path().to_str().unwrap()),
            Err(ConfigError::NotPositive("icmp_interval"))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            MonitorConfig::load_from("/nonexistent/anyping.conf"),
            Err(ConfigError::Unreadable(_, _))
        ));
    }
}
