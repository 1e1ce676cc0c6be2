use reqwest::{StatusCode, Url};
use serde_json::json;
use tracing::{info, warn};

use super::AlertError;
use crate::analysis::TrafficSpike;
use crate::config::AlertingConfig;

/// Posts `{"text": ...}` messages to an incoming webhook (Slack-compatible).
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: Url,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, AlertError> {
        let invalid = |reason: String| AlertError::InvalidUrl {
            url: url.to_string(),
            reason,
        };
        let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        Ok(Self {
            url: parsed,
            client: reqwest::Client::new(),
        })
    }

    pub fn from_config(config: &AlertingConfig) -> Result<Self, AlertError> {
        match config.webhook_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Self::new(url),
            _ => Err(AlertError::NotConfigured),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Deliver one message. Only HTTP 200 counts as delivered.
    pub async fn notify(&self, text: &str) -> Result<(), AlertError> {
        let payload = json!({ "text": text });
        let response = self.client.post(self.url.clone()).json(&payload).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "webhook rejected alert");
            return Err(AlertError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!(host = self.url.host_str().unwrap_or_default(), "alert delivered");
        Ok(())
    }

    pub async fn notify_spike(&self, spike: &TrafficSpike) -> Result<(), AlertError> {
        self.notify(&spike.message()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_url() {
        assert!(matches!(
            WebhookNotifier::new("not a url"),
            Err(AlertError::InvalidUrl { .. })
        ));
        assert!(matches!(
            WebhookNotifier::new("ftp://example.com/hook"),
            Err(AlertError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_unset_url_is_not_configured() {
        let cfg = AlertingConfig { webhook_url: None };
        assert!(matches!(WebhookNotifier::from_config(&cfg), Err(AlertError::NotConfigured)));

        let blank = AlertingConfig { webhook_url: Some("  ".to_string()) };
        assert!(matches!(WebhookNotifier::from_config(&blank), Err(AlertError::NotConfigured)));
    }

    #[test]
    fn test_unreachable_host_is_network_error() {
        // Nothing listens on the local discard port.
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook").unwrap();
        let result = tokio_test::block_on(notifier.notify("hello"));
        assert!(matches!(result, Err(AlertError::Network(_))));
    }
}
