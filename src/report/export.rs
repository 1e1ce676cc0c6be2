//! File exports: the HTML report and the parsed table as CSV.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::html::render_html;
use crate::parse::MetricsTable;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to render report: {0}")]
    Render(#[from] askama::Error),

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The table as UTF-8 CSV bytes, header row first.
pub fn table_csv(table: &MetricsTable) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.header())?;
    for record in table.records() {
        writer.write_record(&record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(bytes)
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_csv(table: &MetricsTable, path: &Path) -> Result<(), ExportError> {
    let bytes = table_csv(table)?;
    write_file(path, &bytes)?;
    info!(path = %path.display(), rows = table.len(), "CSV written");
    Ok(())
}

pub fn write_html(session: &Session, path: &Path) -> Result<(), ExportError> {
    let html = render_html(session)?;
    write_file(path, html.as_bytes())?;
    info!(path = %path.display(), "HTML report written");
    Ok(())
}
