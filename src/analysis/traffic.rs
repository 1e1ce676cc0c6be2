//! Traffic spike detection: latest period vs. the trailing baseline.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::{debug, info};

use super::series::TimeSeries;
use super::AnalysisError;
use crate::parse::{Column, MetricsTable, PeriodLabel};

/// Periods averaged to form the baseline.
pub const DEFAULT_BASELINE_PERIODS: usize = 4;
/// The latest period must exceed the baseline by this factor to count as a spike.
pub const DEFAULT_SPIKE_FACTOR: f64 = 1.25;

/// A detected jump in visits for the most recent period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSpike {
    pub site: String,
    pub environment: String,
    pub date: PeriodLabel,
    pub day_of_week: Option<String>,
    pub recent_visits: u64,
    pub baseline_average: f64,
    pub percent_increase: f64,
    pub prior_periods: Vec<(PeriodLabel, u64)>,
}

impl TrafficSpike {
    /// Chat message body for webhook delivery.
    pub fn message(&self) -> String {
        let when = match &self.day_of_week {
            Some(day) => format!("{} ({})", self.date, day),
            None => self.date.to_string(),
        };
        let mut text = format!(
            ":rotating_light: Traffic spike on {}.{}\n\
             Period: {}\n\
             Visits: {} vs. baseline {:.1} (+{:.1}%)\n\
             Prior periods:\n",
            self.site, self.environment, when, self.recent_visits, self.baseline_average, self.percent_increase
        );
        for (period, visits) in &self.prior_periods {
            let _ = writeln!(text, " - {}: {}", period, visits);
        }
        text
    }
}

/// Compare the last row's visits to the mean of the `window` rows before it.
///
/// Returns `None` when there are too few rows, when the table has no visits
/// column, or when the latest period is within `factor` of the baseline.
pub fn detect_spike(
    table: &MetricsTable,
    site: &str,
    environment: &str,
    window: usize,
    factor: f64,
) -> Option<TrafficSpike> {
    if !table.has_column(&Column::Visits) {
        debug!("no visits column, skipping spike detection");
        return None;
    }

    let rows = table.rows();
    let visits: Vec<u64> = rows.iter().filter_map(|r| r.visits).collect();
    let series = TimeSeries::new(visits.iter().map(|&v| v as f64).collect());

    let baseline = match series.trailing_mean(window) {
        Ok(b) => b,
        Err(AnalysisError::InsufficientBaseline { needed, have }) => {
            debug!(needed, have, "not enough periods for spike detection");
            return None;
        }
    };

    let last = rows.last()?;
    let current = last.visits?;
    if baseline <= 0.0 || (current as f64) <= baseline * factor {
        debug!(current, baseline, factor, "no traffic spike");
        return None;
    }

    let percent_increase = (current as f64 - baseline) / baseline * 100.0;
    let end = rows.len() - 1;
    let prior_periods = rows[end - window..end]
        .iter()
        .filter_map(|r| r.visits.map(|v| (r.period.clone(), v)))
        .collect();

    info!(site, environment, current, baseline, percent_increase, "traffic spike detected");

    Some(TrafficSpike {
        site: site.to_string(),
        environment: environment.to_string(),
        day_of_week: last.period.date().map(|d| d.format("%A").to_string()),
        date: last.period.clone(),
        recent_visits: current,
        baseline_average: baseline,
        percent_increase,
        prior_periods,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_table;

    fn table_with_visits(visits: &[u64]) -> MetricsTable {
        let mut text = String::from("  Period       Visits   Cache Hit Ratio\n");
        for (i, v) in visits.iter().enumerate() {
            text.push_str(&format!("  01-{:02}-2024   {}       80%\n", i + 1, v));
        }
        parse_table(&text).unwrap()
    }

    fn detect(visits: &[u64]) -> Option<TrafficSpike> {
        detect_spike(
            &table_with_visits(visits),
            "mysite",
            "live",
            DEFAULT_BASELINE_PERIODS,
            DEFAULT_SPIKE_FACTOR,
        )
    }

    #[test]
    fn test_spike_above_threshold_triggers() {
        let spike = detect(&[1000, 1000, 1000, 1000, 1251]).unwrap();
        assert_eq!(spike.recent_visits, 1251);
        assert_eq!(spike.baseline_average, 1000.0);
        assert!((spike.percent_increase - 25.1).abs() < 1e-9);
        assert_eq!(spike.prior_periods.len(), 4);
        assert_eq!(spike.date.to_string(), "01-05-2024");
        // 2024-01-05 was a Friday.
        assert_eq!(spike.day_of_week.as_deref(), Some("Friday"));
    }

    #[test]
    fn test_exactly_at_threshold_does_not_trigger() {
        assert!(detect(&[1000, 1000, 1000, 1000, 1250]).is_none());
    }

    #[test]
    fn test_four_rows_are_skipped() {
        assert!(detect(&[10, 10, 10, 5000]).is_none());
        assert!(detect(&[5000]).is_none());
    }

    #[test]
    fn test_baseline_uses_only_the_last_four_prior_rows() {
        // The first row is outside the window; the baseline is 100.
        let spike = detect(&[100_000, 100, 100, 100, 100, 126]).unwrap();
        assert_eq!(spike.baseline_average, 100.0);
        assert_eq!(spike.prior_periods[0].0.to_string(), "01-02-2024");
    }

    #[test]
    fn test_zero_baseline_never_triggers() {
        assert!(detect(&[0, 0, 0, 0, 50]).is_none());
    }

    #[test]
    fn test_missing_visits_column_is_skipped() {
        let text = "  Period       Cache Hit Ratio\n  01-01-2024   80%\n  01-02-2024   80%\n  \
                    01-03-2024   80%\n  01-04-2024   80%\n  01-05-2024   80%\n";
        let table = parse_table(text).unwrap();
        assert!(detect_spike(&table, "s", "e", 4, 1.25).is_none());
    }

    #[test]
    fn test_message_mentions_site_and_prior_periods() {
        let spike = detect(&[1000, 1000, 1000, 1000, 2000]).unwrap();
        let msg = spike.message();
        assert!(msg.contains("mysite.live"));
        assert!(msg.contains("01-05-2024 (Friday)"));
        assert!(msg.contains("+100.0%"));
        assert!(msg.contains(" - 01-01-2024: 1000"));
    }
}
