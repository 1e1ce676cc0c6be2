//! Plain-text console report.

use std::fmt::Write as _;

use super::{breakdown, findings, spike_notice};
use crate::session::Session;

pub fn render_text(session: &Session) -> String {
    let mut out = String::new();
    out.push_str(&session.display_output);
    if !session.display_output.ends_with('\n') {
        out.push('\n');
    }

    if let Some(errors) = &session.errors {
        let _ = writeln!(out, "Errors:\n{}", errors);
    }

    let _ = writeln!(out, "\nSummary of Findings:\n{}\n", findings(session));
    out.push_str(&breakdown(session));

    if let Some(notice) = spike_notice(session) {
        let _ = writeln!(out, "\n{}", notice);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::terminus::{CommandOutput, MetricsPeriod, MetricsQuery};

    fn session(stdout: &str, stderr: &str) -> Session {
        Session::from_output(
            MetricsQuery::new("mysite", "live", MetricsPeriod::Week),
            &CommandOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                code: Some(0),
            },
            &PolicyConfig::default(),
        )
    }

    #[test]
    fn test_report_sections() {
        let stdout = "  Period       Visits   Cache Hit Ratio\n\
                      \x20 2024-01-01   100      75%\n\
                      \x20 2024-01-08   100      65%\n";
        let text = render_text(&session(stdout, "Deprecated: x\n[warning] slow\n"));

        assert!(text.contains("01-01-2024   100      75%"));
        assert!(text.contains("Errors:\n[warning] slow"));
        assert!(text.contains("site 'mysite' in the 'live' environment over the chosen period of 'week'"));
        assert!(text.contains("Average Cache Hit Ratio: 70.00%"));
        assert!(!text.contains("Traffic spike"));
    }

    #[test]
    fn test_unparsed_output_explains_itself() {
        let text = render_text(&session("garbage", ""));
        assert!(text.contains("Unable to extract data"));
        assert!(text.contains("Could not find a header"));
        assert!(!text.contains("Errors:"));
    }

    #[test]
    fn test_spike_notice_is_printed() {
        let mut stdout = String::from("  Period       Visits   Cache Hit Ratio\n");
        for (day, visits) in [(1, 1000), (2, 1000), (3, 1000), (4, 1000), (5, 2000)] {
            stdout.push_str(&format!("  2024-01-0{}   {}     80%\n", day, visits));
        }
        let text = render_text(&session(&stdout, ""));
        assert!(text.contains("Traffic spike: 2000 visits in 01-05-2024"));
        assert!(text.contains("(+100.0%)"));
    }
}
