//! Report webhook (fire-and-forget).

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default request timeout for report delivery.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts report payloads as JSON to a fixed URL.
///
/// Delivery runs on a detached task; only the outcome is logged and nothing
/// is retried.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    url: String,
    headers: HashMap<String, String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: DEFAULT_WEBHOOK_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `payload` and wait for the status code.
    pub async fn deliver(&self, payload: &Value) -> Result<reqwest::StatusCode, reqwest::Error> {
        let mut request = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .header("Content-Type", "application/json");

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request.json(payload).send().await?;
        Ok(response.status())
    }

    /// Deliver on a detached task. The handle is only useful to wait for the
    /// attempt in tests; dropping it does not cancel delivery.
    pub fn spawn_delivery(&self, payload: Value, report_type: String) -> JoinHandle<()> {
        let client = self.clone();
        debug!(url = %self.url, report_type = %report_type, "Webhook send");

        tokio::spawn(async move {
            match client.deliver(&payload).await {
                Ok(status) if status.is_success() => {
                    info!(report_type = %report_type, status = %status, "Report delivered");
                }
                Ok(status) => {
                    warn!(
                        url = %client.url,
                        report_type = %report_type,
                        status = %status,
                        "Webhook returned non-success status"
                    );
                }
                Err(e) => {
                    warn!(
                        url = %client.url,
                        report_type = %report_type,
                        error = %e,
                        "Webhook request failed"
                    );
                }
            }
        })
    }
}
