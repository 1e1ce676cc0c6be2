//! terminus-metrics -- Pantheon site metrics analysis.
//!
//! Runs `terminus env:metrics`, parses the table it prints, summarizes cache
//! efficiency, flags traffic spikes, and renders the result as console text,
//! an HTML report, CSV, or a local dashboard.

pub mod alert;
pub mod analysis;
pub mod api;
pub mod config;
pub mod parse;
pub mod report;
pub mod session;
pub mod terminus;

use anyhow::Result;

/// Start the local dashboard on `bind` and serve until the process exits.
pub async fn serve(bind: &str, state: api::state::AppState) -> Result<()> {
    let addr: std::net::SocketAddr = bind.parse()?;
    let app = api::router(state);

    tracing::info!(%addr, "dashboard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
