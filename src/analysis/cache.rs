//! Cache hit ratio breakdown and efficiency verdict.

use std::fmt::Write as _;

use serde::Serialize;

use super::series::TimeSeries;
use crate::parse::{MetricsTable, PeriodLabel};

/// Averages below this are reported as a caching inefficiency.
pub const DEFAULT_EFFICIENCY_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEfficiency {
    Effective,
    Inefficient,
}

impl CacheEfficiency {
    pub fn classify(average: f64, threshold: f64) -> Self {
        if average < threshold {
            CacheEfficiency::Inefficient
        } else {
            CacheEfficiency::Effective
        }
    }

    pub fn note(&self, threshold: f64) -> String {
        match self {
            CacheEfficiency::Inefficient => format!(
                "Average ratio is below {:.0}%, which may indicate caching inefficiencies. \
                 Consider reviewing cache policies or content optimization.",
                threshold
            ),
            CacheEfficiency::Effective => format!(
                "Average ratio is at or above {:.0}%, suggesting effective caching performance.",
                threshold
            ),
        }
    }
}

/// Per-period ratios with their mean and verdict.
#[derive(Debug, Clone, Serialize)]
pub struct CacheSummary {
    pub points: Vec<(PeriodLabel, f64)>,
    pub average: f64,
    pub efficiency: CacheEfficiency,
    pub threshold: f64,
}

impl CacheSummary {
    pub fn from_points(points: Vec<(PeriodLabel, f64)>, threshold: f64) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let average = TimeSeries::new(points.iter().map(|(_, r)| *r).collect()).mean();
        Some(Self {
            efficiency: CacheEfficiency::classify(average, threshold),
            points,
            average,
            threshold,
        })
    }

    pub fn note(&self) -> String {
        self.efficiency.note(self.threshold)
    }

    /// The multi-line breakdown printed under the report.
    pub fn breakdown(&self) -> String {
        let mut out = String::from("Cache Hit Ratio Breakdown:\n");
        for (period, ratio) in &self.points {
            let _ = writeln!(out, " - Period {}: Cache Hit Ratio is {}%", period, ratio);
        }
        let _ = writeln!(out, "   Average Cache Hit Ratio: {:.2}%", self.average);
        let _ = writeln!(out, "   Note: {}", self.note());
        out
    }
}

/// Summarize the `Cache Hit Ratio` column of `table`.
pub fn summarize_cache(table: &MetricsTable, threshold: f64) -> Option<CacheSummary> {
    let points = table
        .rows()
        .iter()
        .map(|row| (row.period.clone(), row.cache_hit_ratio))
        .collect();
    CacheSummary::from_points(points, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_table;

    fn label(s: &str) -> PeriodLabel {
        PeriodLabel::Text(s.to_string())
    }

    #[test]
    fn test_boundary_average_is_effective() {
        let summary = CacheSummary::from_points(
            vec![(label("a"), 80.0), (label("b"), 60.0)],
            DEFAULT_EFFICIENCY_THRESHOLD,
        )
        .unwrap();
        assert_eq!(summary.average, 70.0);
        assert_eq!(summary.efficiency, CacheEfficiency::Effective);
        assert!(summary.note().contains("effective caching"));
    }

    #[test]
    fn test_low_average_is_inefficient() {
        let summary = CacheSummary::from_points(
            vec![(label("a"), 50.0), (label("b"), 69.0)],
            DEFAULT_EFFICIENCY_THRESHOLD,
        )
        .unwrap();
        assert_eq!(summary.efficiency, CacheEfficiency::Inefficient);
        assert!(summary.note().contains("below 70%"));
    }

    #[test]
    fn test_empty_points_have_no_summary() {
        assert!(CacheSummary::from_points(vec![], DEFAULT_EFFICIENCY_THRESHOLD).is_none());
    }

    #[test]
    fn test_breakdown_lists_every_period() {
        let text = "  Period       Cache Hit Ratio\n  01-07-2024   91.5%\n  01-14-2024   88%\n";
        let table = parse_table(text).unwrap();
        let summary = summarize_cache(&table, DEFAULT_EFFICIENCY_THRESHOLD).unwrap();
        let breakdown = summary.breakdown();
        assert!(breakdown.contains(" - Period 01-07-2024: Cache Hit Ratio is 91.5%"));
        assert!(breakdown.contains(" - Period 01-14-2024: Cache Hit Ratio is 88%"));
        assert!(breakdown.contains("Average Cache Hit Ratio: 89.75%"));
    }

    #[test]
    fn test_custom_threshold() {
        let summary = CacheSummary::from_points(vec![(label("a"), 75.0)], 80.0).unwrap();
        assert_eq!(summary.efficiency, CacheEfficiency::Inefficient);
        assert!(summary.note().contains("below 80%"));
    }
}
