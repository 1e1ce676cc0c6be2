//! Parser for the `terminus env:metrics` table.
//!
//! The CLI prints a fixed-width table padded with spaces:
//!
//! ```text
//!  ------------ -------- -------------- ------------ -------------- -----------------
//!   Period       Visits   Pages Served   Cache Hits   Cache Misses   Cache Hit Ratio
//!  ------------ -------- -------------- ------------ -------------- -----------------
//!   01-07-2024   1,204    4,310          3,950        360            91.65%
//! ```
//!
//! Columns are found by splitting on runs of two or more spaces, so a change
//! in the CLI's padding is the most likely thing to break this module. With
//! `--format csv` the header carries commas instead, and header and rows are
//! read as CSV records so quoted names and `"1,204"` cells survive.

use std::fmt;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::dates::{parse_period_date, DISPLAY_FORMAT};

const PERIOD_TOKEN: &str = "Period";
const RATIO_TOKEN: &str = "Cache Hit Ratio";

/// A table column as named in the terminus header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Column {
    Period,
    Visits,
    PagesServed,
    CacheHits,
    CacheMisses,
    CacheHitRatio,
    Other(String),
}

impl Column {
    pub fn from_header(name: &str) -> Self {
        match name {
            "Period" => Column::Period,
            "Visits" => Column::Visits,
            "Pages Served" => Column::PagesServed,
            "Cache Hits" => Column::CacheHits,
            "Cache Misses" => Column::CacheMisses,
            "Cache Hit Ratio" => Column::CacheHitRatio,
            other => Column::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Column::Period => "Period",
            Column::Visits => "Visits",
            Column::PagesServed => "Pages Served",
            Column::CacheHits => "Cache Hits",
            Column::CacheMisses => "Cache Misses",
            Column::CacheHitRatio => "Cache Hit Ratio",
            Column::Other(name) => name.as_str(),
        }
    }
}

/// The `Period` cell: a calendar date when it parses as one, else the raw label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PeriodLabel {
    Date(NaiveDate),
    Text(String),
}

impl PeriodLabel {
    fn from_cell(cell: &str) -> Self {
        match parse_period_date(cell) {
            Some(date) => PeriodLabel::Date(date),
            None => PeriodLabel::Text(cell.to_string()),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            PeriodLabel::Date(d) => Some(*d),
            PeriodLabel::Text(_) => None,
        }
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::Date(d) => write!(f, "{}", d.format(DISPLAY_FORMAT)),
            PeriodLabel::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One data row. Counters are `None` when the header had no such column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsRow {
    pub period: PeriodLabel,
    pub visits: Option<u64>,
    pub pages_served: Option<u64>,
    pub cache_hits: Option<u64>,
    pub cache_misses: Option<u64>,
    pub cache_hit_ratio: f64,
    /// Cells of unrecognised columns, in header order.
    pub extra: Vec<String>,
}

/// Parsed rows in source order, plus the header they were parsed against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsTable {
    columns: Vec<Column>,
    rows: Vec<MetricsRow>,
}

impl MetricsTable {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[MetricsRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &Column) -> bool {
        self.columns.contains(column)
    }

    /// Column names in header order.
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Every row rendered back to display strings, in header order.
    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            let mut extra = row.extra.iter();
            self.columns
                .iter()
                .map(|column| match column {
                    Column::Period => row.period.to_string(),
                    Column::Visits => count_cell(row.visits),
                    Column::PagesServed => count_cell(row.pages_served),
                    Column::CacheHits => count_cell(row.cache_hits),
                    Column::CacheMisses => count_cell(row.cache_misses),
                    Column::CacheHitRatio => row.cache_hit_ratio.to_string(),
                    Column::Other(_) => extra.next().cloned().unwrap_or_default(),
                })
                .collect()
        })
    }
}

fn count_cell(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// How header and data lines are split into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Tab,
    Comma,
    Padding,
}

impl Delimiter {
    fn detect(header: &str) -> Self {
        if header.contains('\t') {
            Delimiter::Tab
        } else if header.contains(',') {
            Delimiter::Comma
        } else {
            Delimiter::Padding
        }
    }

    fn split(&self, line: &str) -> Vec<String> {
        let cells = match self {
            Delimiter::Tab => split_record(line, b'\t'),
            Delimiter::Comma => split_record(line, b','),
            Delimiter::Padding => padding_pattern()
                .split(line.trim())
                .map(str::to_string)
                .collect(),
        };
        cells
            .into_iter()
            .map(|cell| cell.trim().to_string())
            .filter(|cell| !cell.is_empty())
            .collect()
    }
}

/// Split one delimited line, honouring quotes (`"Cache Hit Ratio"`, `"1,204"`).
fn split_record(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(str::to_string).collect(),
        Ok(false) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "unreadable delimited line");
            Vec::new()
        }
    }
}

fn padding_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s{2,}").expect("padding pattern compiles"))
}

/// What a scan of command output found.
#[derive(Debug, Clone, PartialEq)]
pub enum TableScan {
    /// No line carried both `Period` and `Cache Hit Ratio`.
    NoHeader,
    /// A header was found but no data row matched its shape.
    NoRows { header: String },
    Parsed(MetricsTable),
}

impl TableScan {
    pub fn into_table(self) -> Option<MetricsTable> {
        match self {
            TableScan::Parsed(table) => Some(table),
            _ => None,
        }
    }

    /// A user-facing explanation when nothing was parsed.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            TableScan::NoHeader => Some(format!(
                "Could not find a header with '{}' and '{}' in the output.",
                PERIOD_TOKEN, RATIO_TOKEN
            )),
            TableScan::NoRows { header } => Some(format!(
                "Header found ({}) but no data rows matched it. The table layout may have changed.",
                header.trim()
            )),
            TableScan::Parsed(_) => None,
        }
    }
}

/// Parse terminus output into a table, or `None` when there is nothing to show.
pub fn parse_table(text: &str) -> Option<MetricsTable> {
    scan_table(text).into_table()
}

/// Parse terminus output, keeping the reason when no table comes out.
pub fn scan_table(text: &str) -> TableScan {
    let lines: Vec<&str> = text.lines().collect();

    let Some(header_idx) = lines
        .iter()
        .position(|line| line.contains(PERIOD_TOKEN) && line.contains(RATIO_TOKEN))
    else {
        debug!("no metrics header in command output");
        return TableScan::NoHeader;
    };

    let header_line = lines[header_idx];
    let delimiter = Delimiter::detect(header_line);
    let columns: Vec<Column> = delimiter
        .split(header_line)
        .iter()
        .map(|cell| Column::from_header(cell))
        .collect();
    debug!(header = header_line.trim(), ?delimiter, columns = columns.len(), "metrics header found");

    if !columns.contains(&Column::Period) || !columns.contains(&Column::CacheHitRatio) {
        debug!("header does not name Period and Cache Hit Ratio as separate columns");
        return TableScan::NoRows { header: header_line.to_string() };
    }

    let mut rows = Vec::new();
    for line in &lines[header_idx + 1..] {
        if line.trim().is_empty() || is_separator(line) {
            continue;
        }
        let cells = delimiter.split(line);
        if cells.len() != columns.len() {
            debug!(expected = columns.len(), got = cells.len(), "dropping row with mismatched shape");
            continue;
        }
        match build_row(&columns, &cells) {
            Some(row) => rows.push(row),
            None => debug!(line = line.trim(), "dropping row with unparseable numbers"),
        }
    }

    debug!(rows = rows.len(), "parsed metrics rows");
    if rows.is_empty() {
        return TableScan::NoRows { header: header_line.to_string() };
    }
    TableScan::Parsed(MetricsTable { columns, rows })
}

fn is_separator(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| matches!(c, '-' | '+' | '|' | '=') || c.is_whitespace())
}

fn build_row(columns: &[Column], cells: &[String]) -> Option<MetricsRow> {
    let mut row = MetricsRow {
        period: PeriodLabel::Text(String::new()),
        visits: None,
        pages_served: None,
        cache_hits: None,
        cache_misses: None,
        cache_hit_ratio: 0.0,
        extra: Vec::new(),
    };

    for (column, cell) in columns.iter().zip(cells) {
        match column {
            Column::Period => row.period = PeriodLabel::from_cell(cell),
            Column::Visits => row.visits = Some(parse_count(cell)?),
            Column::PagesServed => row.pages_served = Some(parse_count(cell)?),
            Column::CacheHits => row.cache_hits = Some(parse_count(cell)?),
            Column::CacheMisses => row.cache_misses = Some(parse_count(cell)?),
            Column::CacheHitRatio => row.cache_hit_ratio = parse_ratio(cell)?,
            Column::Other(_) => row.extra.push(cell.clone()),
        }
    }
    Some(row)
}

/// `"12,345"` -> 12345
fn parse_count(cell: &str) -> Option<u64> {
    cell.replace(',', "").parse().ok()
}

/// `"84.01%"` -> 84.01. Anything outside 0-100, NaN included, is rejected.
fn parse_ratio(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    let ratio: f64 = trimmed
        .strip_suffix('%')
        .unwrap_or(trimmed)
        .trim()
        .parse()
        .ok()?;
    (ratio.is_finite() && (0.0..=100.0).contains(&ratio)).then_some(ratio)
}
