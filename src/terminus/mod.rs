//! Wrapper around the `terminus` CLI: build arguments, spawn, capture output.

pub mod sites;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::TerminusConfig;

/// Fields requested from `env:metrics`, spelled as terminus prints them.
pub const DEFAULT_FIELDS: &str = "Period,Visits,Pages Served,Cache Hits,Cache Misses,Cache Hit Ratio";

/// Stderr lines containing this marker are PHP deprecation noise.
const DEPRECATION_MARKER: &str = "Deprecated";

#[derive(Debug, Error)]
pub enum TerminusError {
    #[error("invalid {field} '{value}': {reason}")]
    InvalidTarget {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("failed to launch '{program}': {source}. Is terminus installed and on PATH?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terminus exited with {}: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "a signal".to_string(),
    }
}

/// Aggregation bucket passed to `--period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MetricsPeriod {
    Day,
    Week,
    Month,
}

impl MetricsPeriod {
    pub const ALL: [MetricsPeriod; 3] = [MetricsPeriod::Day, MetricsPeriod::Week, MetricsPeriod::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsPeriod::Day => "day",
            MetricsPeriod::Week => "week",
            MetricsPeriod::Month => "month",
        }
    }
}

impl fmt::Display for MetricsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(MetricsPeriod::Day),
            "week" => Ok(MetricsPeriod::Week),
            "month" => Ok(MetricsPeriod::Month),
            other => Err(format!("invalid period '{}': choose day, week, or month", other)),
        }
    }
}

/// Output format passed to `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Csv => "csv",
        }
    }
}

/// One `env:metrics` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsQuery {
    pub site: String,
    pub environment: String,
    pub period: MetricsPeriod,
    pub datapoints: String,
    pub format: OutputFormat,
    pub fields: String,
}

impl MetricsQuery {
    pub fn new(site: impl Into<String>, environment: impl Into<String>, period: MetricsPeriod) -> Self {
        Self {
            site: site.into().trim().to_string(),
            environment: environment.into().trim().to_string(),
            period,
            datapoints: "auto".to_string(),
            format: OutputFormat::Table,
            fields: DEFAULT_FIELDS.to_string(),
        }
    }

    /// `<site>.<env>` as terminus expects it.
    pub fn site_env(&self) -> String {
        format!("{}.{}", self.site, self.environment)
    }

    /// File name offered for a CSV download of this query's table.
    pub fn csv_file_name(&self) -> String {
        format!("{}_{}_metrics.csv", self.site, self.environment)
    }

    pub fn validate(&self) -> Result<(), TerminusError> {
        validate_name("site", &self.site)?;
        validate_name("environment", &self.environment)
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "env:metrics".to_string(),
            "--period".to_string(),
            self.period.to_string(),
            "--datapoints".to_string(),
            self.datapoints.clone(),
            "--format".to_string(),
            self.format.as_str().to_string(),
            "--fields".to_string(),
            self.fields.clone(),
            "--".to_string(),
            self.site_env(),
        ]
    }
}

fn validate_name(field: &'static str, value: &str) -> Result<(), TerminusError> {
    let invalid = |reason| TerminusError::InvalidTarget {
        field,
        value: value.to_string(),
        reason,
    };
    if value.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if value.starts_with('-') {
        return Err(invalid("cannot start with a hyphen"));
    }
    if value.chars().any(|c| !c.is_ascii_alphanumeric() && c != '-' && c != '_') {
        return Err(invalid("only letters, digits, '-' and '_' are allowed"));
    }
    Ok(())
}

/// Captured result of one terminus invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Stderr with deprecation notices removed, or `None` if nothing is left.
    pub fn user_errors(&self) -> Option<String> {
        filter_stderr(&self.stderr)
    }
}

pub fn filter_stderr(stderr: &str) -> Option<String> {
    let kept: Vec<&str> = stderr
        .lines()
        .filter(|line| !line.contains(DEPRECATION_MARKER))
        .filter(|line| !line.trim().is_empty())
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("\n"))
    }
}

/// Handle on the terminus binary.
#[derive(Debug, Clone)]
pub struct Terminus {
    binary: String,
}

impl Terminus {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn from_config(config: &TerminusConfig) -> Self {
        Self::new(config.binary.clone())
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run `env:metrics` for `query` and wait for it to finish.
    pub async fn metrics(&self, query: &MetricsQuery) -> Result<CommandOutput, TerminusError> {
        query.validate()?;
        info!(site_env = %query.site_env(), period = %query.period, "fetching metrics");
        self.run(&query.args()).await
    }

    /// Run terminus with `args`. A non-zero exit is an error.
    pub async fn run(&self, args: &[String]) -> Result<CommandOutput, TerminusError> {
        debug!(binary = %self.binary, ?args, "spawning terminus");
        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| TerminusError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code(),
        };

        if !output.status.success() {
            let stderr = captured
                .user_errors()
                .unwrap_or_else(|| "(no diagnostic output)".to_string());
            warn!(code = ?captured.code, %stderr, "terminus failed");
            return Err(TerminusError::Failed {
                code: captured.code,
                stderr,
            });
        }

        debug!(stdout_bytes = captured.stdout.len(), stderr_bytes = captured.stderr.len(), "terminus finished");
        Ok(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_match_terminus_contract() {
        let q = MetricsQuery::new("mysite", "live", MetricsPeriod::Week);
        assert_eq!(
            q.args(),
            vec![
                "env:metrics",
                "--period",
                "week",
                "--datapoints",
                "auto",
                "--format",
                "table",
                "--fields",
                DEFAULT_FIELDS,
                "--",
                "mysite.live",
            ]
        );
    }

    #[test]
    fn test_csv_format_arg() {
        let mut q = MetricsQuery::new("mysite", "dev", MetricsPeriod::Day);
        q.format = OutputFormat::Csv;
        assert!(q.args().windows(2).any(|w| w[0] == "--format" && w[1] == "csv"));
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        assert!(MetricsQuery::new("", "live", MetricsPeriod::Day).validate().is_err());
        assert!(MetricsQuery::new("--help", "live", MetricsPeriod::Day).validate().is_err());
        assert!(MetricsQuery::new("site", "li ve", MetricsPeriod::Day).validate().is_err());
        assert!(MetricsQuery::new("my-site_2", "pr-12", MetricsPeriod::Day).validate().is_ok());
    }

    #[test]
    fn test_names_are_trimmed() {
        let q = MetricsQuery::new("  mysite ", "live\n", MetricsPeriod::Month);
        assert_eq!(q.site_env(), "mysite.live");
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("Week".parse::<MetricsPeriod>().unwrap(), MetricsPeriod::Week);
        assert_eq!(" month ".parse::<MetricsPeriod>().unwrap(), MetricsPeriod::Month);
        assert!("year".parse::<MetricsPeriod>().is_err());
    }

    #[test]
    fn test_filter_stderr_drops_deprecations() {
        let stderr = "PHP Deprecated: foo() is deprecated\n [error] Site not found\n";
        assert_eq!(filter_stderr(stderr).as_deref(), Some(" [error] Site not found"));
        assert_eq!(filter_stderr("Deprecated: x\n\n"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let t = Terminus::new("/nonexistent/terminus-binary");
        let q = MetricsQuery::new("site", "live", MetricsPeriod::Day);
        match t.metrics(&q).await {
            Err(TerminusError::Spawn { program, .. }) => assert_eq!(program, "/nonexistent/terminus-binary"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_query_never_spawns() {
        let t = Terminus::new("/nonexistent/terminus-binary");
        let q = MetricsQuery::new("-x", "live", MetricsPeriod::Day);
        assert!(matches!(t.metrics(&q).await, Err(TerminusError::InvalidTarget { field: "site", .. })));
    }
}
