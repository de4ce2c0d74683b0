//! HTTP probe implementation.
//!
//! Alive iff the endpoint answers 200; every transport failure is
//! normalized to a 500 diagnostic.

use std::time::Duration;

use super::CheckResult;

const HTTP_TIMEOUT: Duration = Duration::from_secs(3);

/// Checker that issues a GET against one URL.
#[derive(Debug, Clone)]
pub struct WebChecker {
    url: String,
}

impl WebChecker {
    pub fn new(url: &str) -> Self {
        let url = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        Self { url }
    }

    /// The diagnostic is the numeric status code as text.
    pub async fn check(&self) -> CheckResult {
        let status = self.get_status().await;
        if status == 200 {
            CheckResult::up(status.to_string())
        } else {
            CheckResult::down(status.to_string())
        }
    }

    async fn get_status(&self) -> u16 {
        let client = match reqwest::Client::builder().timeout(HTTP_TIMEOUT).build() {
            Ok(c) => c,
            Err(_) => return 500,
        };

        match client.get(&self.url).send().await {
            Ok(response) => response.status().as_u16(),
            // Connection errors and timeouts collapse to a server error
            Err(_) => 500,
        }
    }
}
