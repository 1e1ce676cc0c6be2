//! Per-request report context.
//!
//! A `Session` is built once per fetch from the captured terminus output and
//! handed to every renderer. Nothing in it outlives the request.

use serde::Serialize;
use tracing::debug;

use crate::analysis::{detect_spike, summarize_cache, CacheSummary, TrafficSpike};
use crate::config::PolicyConfig;
use crate::parse::{reformat_dates, scan_table, MetricsTable};
use crate::terminus::{CommandOutput, MetricsQuery, Terminus, TerminusError};

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub query: MetricsQuery,
    /// Stdout with ISO dates rewritten for display.
    pub display_output: String,
    /// Stderr minus deprecation notices.
    pub errors: Option<String>,
    pub table: Option<MetricsTable>,
    /// Why `table` is `None`, when it is.
    pub parse_diagnostic: Option<String>,
    pub cache: Option<CacheSummary>,
    pub spike: Option<TrafficSpike>,
}

impl Session {
    /// Run terminus for `query` and analyse whatever comes back.
    pub async fn fetch(terminus: &Terminus, query: MetricsQuery, policy: &PolicyConfig) -> Result<Self, TerminusError> {
        let output = terminus.metrics(&query).await?;
        Ok(Self::from_output(query, &output, policy))
    }

    /// Build a session from already-captured output.
    pub fn from_output(query: MetricsQuery, output: &CommandOutput, policy: &PolicyConfig) -> Self {
        let display_output = reformat_dates(&output.stdout);
        let scan = scan_table(&display_output);
        let parse_diagnostic = scan.diagnostic();
        let table = scan.into_table();

        let cache = table
            .as_ref()
            .and_then(|t| summarize_cache(t, policy.efficiency_threshold));
        let spike = table.as_ref().and_then(|t| {
            detect_spike(
                t,
                &query.site,
                &query.environment,
                policy.baseline_periods,
                policy.spike_factor,
            )
        });

        debug!(
            rows = table.as_ref().map(MetricsTable::len).unwrap_or(0),
            spike = spike.is_some(),
            "session built"
        );

        Self {
            errors: output.user_errors(),
            query,
            display_output,
            table,
            parse_diagnostic,
            cache,
            spike,
        }
    }

    /// File name offered for the CSV download.
    pub fn csv_file_name(&self) -> String {
        self.query.csv_file_name()
    }
}
