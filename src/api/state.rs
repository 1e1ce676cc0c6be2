use super::exports::ExportCache;
use crate::alert::WebhookNotifier;
use crate::config::PolicyConfig;
use crate::terminus::Terminus;

/// Handles shared by every dashboard request.
#[derive(Clone)]
pub struct AppState {
    pub terminus: Terminus,
    pub policy: PolicyConfig,
    /// Set when spike alerts should be posted from the dashboard.
    pub notifier: Option<WebhookNotifier>,
    /// CSV of each rendered table, served by the download link.
    pub exports: ExportCache,
}
