//! Pages served by the local dashboard.

use askama::Template;

use super::charts::{gauge, ratio_chart, traffic_chart, Gauge, LineChart};
use super::{breakdown, findings, spike_notice};
use crate::session::Session;
use crate::terminus::MetricsPeriod;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage<'a> {
    pub site: &'a str,
    pub environment: &'a str,
    pub period: String,
    pub output: &'a str,
    pub errors: &'a str,
    pub diagnostic: &'a str,
    pub has_table: bool,
    pub header: Vec<String>,
    pub records: Vec<Vec<String>>,
    pub charts: Vec<LineChart>,
    pub has_gauge: bool,
    pub gauge: Gauge,
    pub findings: String,
    pub breakdown: String,
    pub spike: String,
    /// Outcome of the spike alert, empty when none was attempted.
    pub alert_status: String,
    pub csv_href: String,
    pub csv_name: String,
}

impl<'a> DashboardPage<'a> {
    pub fn new(session: &'a Session) -> Self {
        let (header, records, charts) = match &session.table {
            Some(table) => (
                table.header(),
                table.records().collect(),
                vec![traffic_chart(table), ratio_chart(table)],
            ),
            None => (Vec::new(), Vec::new(), Vec::new()),
        };
        let average = session.cache.as_ref().map(|c| c.average);

        Self {
            site: &session.query.site,
            environment: &session.query.environment,
            period: session.query.period.to_string(),
            output: &session.display_output,
            errors: session.errors.as_deref().unwrap_or(""),
            diagnostic: session.parse_diagnostic.as_deref().unwrap_or(""),
            has_table: session.table.is_some(),
            header,
            records,
            charts,
            has_gauge: average.is_some(),
            gauge: gauge(average.unwrap_or(0.0)),
            findings: findings(session),
            breakdown: breakdown(session),
            spike: spike_notice(session).unwrap_or_default(),
            alert_status: String::new(),
            csv_href: format!(
                "/metrics.csv?site={}&env={}&period={}",
                session.query.site, session.query.environment, session.query.period
            ),
            csv_name: session.csv_file_name(),
        }
    }

    pub fn with_alert_status(mut self, status: impl Into<String>) -> Self {
        self.alert_status = status.into();
        self
    }
}

pub struct PeriodOption {
    pub value: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub site: String,
    pub environment: String,
    pub periods: Vec<PeriodOption>,
}

impl IndexPage {
    pub fn new(site: &str, environment: &str, period: MetricsPeriod) -> Self {
        Self {
            site: site.to_string(),
            environment: environment.to_string(),
            periods: MetricsPeriod::ALL
                .iter()
                .map(|p| PeriodOption {
                    value: p.as_str(),
                    selected: *p == period,
                })
                .collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage<'a> {
    pub title: &'a str,
    pub message: String,
}

pub fn render_dashboard(session: &Session) -> askama::Result<String> {
    DashboardPage::new(session).render()
}
