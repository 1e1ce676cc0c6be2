//! Rendering a [`Session`]: console text, HTML report, dashboard pages, exports.

pub mod charts;
pub mod dashboard;
pub mod export;
pub mod html;
pub mod text;

use crate::session::Session;

pub use export::ExportError;

pub const BANNER: &str = r"
   Terminus Metrics Analyzer
   ------------------------
       Metrics Graph
          /|       80%
         / |       60%
        /  |       40%
       /___|       20%
      |    |________
      | Visits | Pages
   ------------------------
";

/// The fixed explanatory paragraph shown under every report.
pub fn findings(session: &Session) -> String {
    format!(
        "The output above displays the performance metrics for the site '{}' in the '{}' environment \
         over the chosen period of '{}'. It includes key data such as total visits, pages served, and \
         cache performance (hits, misses, and hit ratio). This information can help assess the site's \
         traffic patterns and caching efficiency, identifying potential areas for optimization if cache \
         misses are high or hit ratios are lower than expected.",
        session.query.site, session.query.environment, session.query.period
    )
}

/// Cache breakdown, or the reason there is none.
pub fn breakdown(session: &Session) -> String {
    match &session.cache {
        Some(summary) => summary.breakdown(),
        None => format!(
            "Cache Hit Ratio Breakdown: Unable to extract data. {}\n",
            session
                .parse_diagnostic
                .as_deref()
                .unwrap_or("The output format may have changed.")
        ),
    }
}

/// One-line spike notice, if a spike was detected.
pub fn spike_notice(session: &Session) -> Option<String> {
    session.spike.as_ref().map(|spike| {
        format!(
            "Traffic spike: {} visits in {} vs. a {}-period baseline of {:.1} (+{:.1}%).",
            spike.recent_visits,
            spike.date,
            spike.prior_periods.len(),
            spike.baseline_average,
            spike.percent_increase
        )
    })
}
