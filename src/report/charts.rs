//! SVG geometry for the dashboard: line charts and the cache gauge.
//!
//! Everything here produces plain numbers and strings; markup lives in the
//! templates so user-supplied labels go through the template escaper.

use std::f64::consts::PI;

use crate::parse::{Column, MetricsTable};

pub const CHART_WIDTH: f64 = 640.0;
pub const CHART_HEIGHT: f64 = 240.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 16.0;
const MARGIN_BOTTOM: f64 = 40.0;
const Y_TICKS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub x: String,
    pub y: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub color: &'static str,
    /// `points` attribute of the polyline.
    pub polyline: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTick {
    pub x: String,
    pub y: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub plot_left: String,
    pub plot_right: String,
    pub plot_bottom: String,
    pub series: Vec<ChartSeries>,
    pub x_ticks: Vec<AxisTick>,
    pub y_ticks: Vec<AxisTick>,
}

impl LineChart {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

fn px(v: f64) -> String {
    format!("{:.1}", v)
}

/// Lay out `series` (name, color, values) over shared `labels`.
///
/// `y_max` fixes the top of the axis; `None` scales to the largest value.
fn line_chart(
    title: &str,
    labels: &[String],
    series: Vec<(&str, &'static str, Vec<f64>)>,
    y_max: Option<f64>,
) -> LineChart {
    let plot_w = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let bottom = CHART_HEIGHT - MARGIN_BOTTOM;

    let top = y_max.unwrap_or_else(|| {
        series
            .iter()
            .flat_map(|(_, _, values)| values.iter().copied())
            .fold(0.0_f64, f64::max)
    });
    let top = if top > 0.0 { top } else { 1.0 };

    let x_at = |i: usize| {
        if labels.len() <= 1 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + plot_w * i as f64 / (labels.len() - 1) as f64
        }
    };
    let y_at = |v: f64| bottom - plot_h * (v / top).clamp(0.0, 1.0);

    let series = series
        .into_iter()
        .map(|(name, color, values)| {
            let points: Vec<ChartPoint> = values
                .iter()
                .enumerate()
                .map(|(i, &v)| ChartPoint {
                    x: px(x_at(i)),
                    y: px(y_at(v)),
                    label: format!("{}: {}", labels.get(i).map(String::as_str).unwrap_or(""), v),
                })
                .collect();
            let polyline = points
                .iter()
                .map(|p| format!("{},{}", p.x, p.y))
                .collect::<Vec<_>>()
                .join(" ");
            ChartSeries {
                name: name.to_string(),
                color,
                polyline,
                points,
            }
        })
        .collect();

    let x_ticks = labels
        .iter()
        .enumerate()
        .map(|(i, label)| AxisTick {
            x: px(x_at(i)),
            y: px(bottom + 18.0),
            text: label.clone(),
        })
        .collect();

    let y_ticks = (0..=Y_TICKS)
        .map(|k| {
            let v = top * k as f64 / Y_TICKS as f64;
            AxisTick {
                x: px(MARGIN_LEFT - 8.0),
                y: px(y_at(v)),
                text: if top >= 100.0 { format!("{:.0}", v) } else { format!("{:.1}", v) },
            }
        })
        .collect();

    LineChart {
        title: title.to_string(),
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
        plot_left: px(MARGIN_LEFT),
        plot_right: px(CHART_WIDTH - MARGIN_RIGHT),
        plot_bottom: px(bottom),
        series,
        x_ticks,
        y_ticks,
    }
}

fn period_labels(table: &MetricsTable) -> Vec<String> {
    table.rows().iter().map(|r| r.period.to_string()).collect()
}

/// Visits and pages served over time. Series whose column is missing are left out.
pub fn traffic_chart(table: &MetricsTable) -> LineChart {
    let labels = period_labels(table);
    let mut series = Vec::new();
    if table.has_column(&Column::Visits) {
        let values = table.rows().iter().map(|r| r.visits.unwrap_or(0) as f64).collect();
        series.push(("Visits", "#1f77b4", values));
    }
    if table.has_column(&Column::PagesServed) {
        let values = table.rows().iter().map(|r| r.pages_served.unwrap_or(0) as f64).collect();
        series.push(("Pages Served", "#ff7f0e", values));
    }
    line_chart("Visits and Pages Served", &labels, series, None)
}

/// Cache hit ratio over time on a fixed 0-100 axis.
pub fn ratio_chart(table: &MetricsTable) -> LineChart {
    let labels = period_labels(table);
    let values = table.rows().iter().map(|r| r.cache_hit_ratio).collect();
    line_chart(
        "Cache Hit Ratio (%)",
        &labels,
        vec![("Cache Hit Ratio", "#2ca02c", values)],
        Some(100.0),
    )
}

// ---------------------------------------------------------------------------
// Gauge
// ---------------------------------------------------------------------------

const GAUGE_CX: f64 = 160.0;
const GAUGE_CY: f64 = 150.0;
const GAUGE_R: f64 = 120.0;

/// Colored ranges of the gauge dial: red below 50, orange to 70, green above.
pub const GAUGE_BANDS: [(f64, f64, &str); 3] = [(0.0, 50.0, "red"), (50.0, 70.0, "orange"), (70.0, 100.0, "green")];

#[derive(Debug, Clone, PartialEq)]
pub struct GaugeArc {
    pub path: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gauge {
    pub value: f64,
    pub value_text: String,
    /// Band the value falls in.
    pub color: &'static str,
    pub bands: Vec<GaugeArc>,
    /// Arc from 0 up to the value.
    pub bar: String,
}

fn gauge_point(percent: f64) -> (f64, f64) {
    let theta = PI * (1.0 - percent.clamp(0.0, 100.0) / 100.0);
    (GAUGE_CX + GAUGE_R * theta.cos(), GAUGE_CY - GAUGE_R * theta.sin())
}

fn arc_path(from: f64, to: f64) -> String {
    let (x0, y0) = gauge_point(from);
    let (x1, y1) = gauge_point(to);
    format!(
        "M {:.1} {:.1} A {:.1} {:.1} 0 0 1 {:.1} {:.1}",
        x0, y0, GAUGE_R, GAUGE_R, x1, y1
    )
}

pub fn band_color(value: f64) -> &'static str {
    GAUGE_BANDS
        .iter()
        .find(|(lo, hi, _)| value >= *lo && value < *hi)
        .map(|(_, _, color)| *color)
        .unwrap_or(if value < 0.0 { "red" } else { "green" })
}

pub fn gauge(average: f64) -> Gauge {
    Gauge {
        value: average,
        value_text: format!("{:.2}%", average),
        color: band_color(average),
        bands: GAUGE_BANDS
            .iter()
            .map(|&(lo, hi, color)| GaugeArc {
                path: arc_path(lo, hi),
                color,
            })
            .collect(),
        bar: arc_path(0.0, average),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_table;

    fn sample_table() -> MetricsTable {
        parse_table(
            "  Period       Visits   Pages Served   Cache Hit Ratio\n\
             \x20 01-01-2024   100      300            50%\n\
             \x20 01-02-2024   200      400            100%\n",
        )
        .unwrap()
    }

    #[test]
    fn test_band_colors() {
        assert_eq!(band_color(10.0), "red");
        assert_eq!(band_color(49.99), "red");
        assert_eq!(band_color(50.0), "orange");
        assert_eq!(band_color(69.99), "orange");
        assert_eq!(band_color(70.0), "green");
        assert_eq!(band_color(100.0), "green");
    }

    #[test]
    fn test_gauge_endpoints() {
        let g = gauge(0.0);
        assert!(g.bar.starts_with("M 40.0 150.0"));
        let full = gauge(100.0);
        assert!(full.bar.ends_with("280.0 150.0"));
        assert_eq!(full.bands.len(), 3);
        assert_eq!(gauge(72.5).value_text, "72.50%");
    }

    #[test]
    fn test_traffic_chart_scales_to_max() {
        let chart = traffic_chart(&sample_table());
        assert_eq!(chart.series.len(), 2);
        let pages = &chart.series[1];
        // 400 is the max value, so it sits on the top margin.
        assert_eq!(pages.points[1].y, px(MARGIN_TOP));
        assert_eq!(pages.points[0].x, px(MARGIN_LEFT));
        assert_eq!(pages.points[1].x, px(CHART_WIDTH - MARGIN_RIGHT));
        assert_eq!(chart.x_ticks[0].text, "01-01-2024");
    }

    #[test]
    fn test_ratio_chart_uses_fixed_axis() {
        let chart = ratio_chart(&sample_table());
        let s = &chart.series[0];
        assert_eq!(s.points[1].y, px(MARGIN_TOP));
        assert_eq!(s.points[0].y, px(CHART_HEIGHT - MARGIN_BOTTOM - (CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) / 2.0));
        assert_eq!(chart.y_ticks.last().unwrap().text, "100");
    }

    #[test]
    fn test_missing_columns_drop_series() {
        let table = parse_table("  Period       Cache Hit Ratio\n  01-01-2024   50%\n").unwrap();
        assert!(traffic_chart(&table).is_empty());
        assert!(!ratio_chart(&table).is_empty());
    }
}
