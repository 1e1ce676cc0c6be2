//! Standalone HTML report, written to disk on request.

use askama::Template;

use super::{breakdown, findings, spike_notice};
use crate::session::Session;

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportPage<'a> {
    pub site: &'a str,
    pub environment: &'a str,
    pub period: String,
    pub output: &'a str,
    pub errors: &'a str,
    pub findings: String,
    pub breakdown: String,
    pub spike: String,
    pub generated_at: String,
}

impl<'a> ReportPage<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            site: &session.query.site,
            environment: &session.query.environment,
            period: session.query.period.to_string(),
            output: &session.display_output,
            errors: session.errors.as_deref().unwrap_or(""),
            findings: findings(session),
            breakdown: breakdown(session),
            spike: spike_notice(session).unwrap_or_default(),
            generated_at: chrono::Local::now().format("%m-%d-%Y %H:%M").to_string(),
        }
    }
}

/// Render the report. All interpolated values are HTML-escaped.
pub fn render_html(session: &Session) -> askama::Result<String> {
    ReportPage::new(session).render()
}
