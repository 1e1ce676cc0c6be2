//! Text handling for terminus output: date rewriting and table parsing.

pub mod dates;
pub mod table;

pub use dates::reformat_dates;
pub use table::{parse_table, scan_table, Column, MetricsRow, MetricsTable, PeriodLabel, TableScan};
