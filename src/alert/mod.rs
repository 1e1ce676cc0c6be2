//! Spike alert delivery.

pub mod webhook;

use thiserror::Error;

pub use webhook::WebhookNotifier;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("no webhook URL configured (set alerting.webhook_url or METRICS_WEBHOOK_URL)")]
    NotConfigured,

    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("webhook request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("webhook answered HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}
