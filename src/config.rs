//! TOML configuration.
//!
//! Lookup order: an explicit `--config` path, then the file named by the
//! `TERMINUS_METRICS_CONFIG` environment variable, then `./terminus-metrics.toml`,
//! then compiled-in defaults. `METRICS_WEBHOOK_URL` overrides the webhook URL
//! from any of those.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::cache::DEFAULT_EFFICIENCY_THRESHOLD;
use crate::analysis::traffic::{DEFAULT_BASELINE_PERIODS, DEFAULT_SPIKE_FACTOR};

pub const CONFIG_ENV: &str = "TERMINUS_METRICS_CONFIG";
pub const WEBHOOK_ENV: &str = "METRICS_WEBHOOK_URL";
const LOCAL_CONFIG: &str = "terminus-metrics.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub terminus: TerminusConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub alerting: AlertingConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .policy
            .validate()
            .with_context(|| format!("invalid [policy] in {}", path.display()))?;
        Ok(config)
    }

    /// Resolve configuration using the lookup order described above.
    ///
    /// An explicit path that fails to load is an error; the implicit
    /// locations fall through to defaults with a warning.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_or_default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "{} set but file could not be loaded, trying fallback",
                        CONFIG_ENV
                    );
                }
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %local.display(),
                        error = %e,
                        "local config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(WEBHOOK_ENV) {
            if !url.trim().is_empty() {
                info!("webhook URL taken from {}", WEBHOOK_ENV);
                self.alerting.webhook_url = Some(url.trim().to_string());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Terminus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminusConfig {
    /// Path (or bare command name resolved via `$PATH`) to the terminus binary.
    pub binary: String,
}

impl Default for TerminusConfig {
    fn default() -> Self {
        Self {
            binary: "terminus".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Thresholds for the cache verdict and the traffic spike check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Average cache hit ratio (percent) below which caching is called inefficient.
    pub efficiency_threshold: f64,
    /// Number of periods averaged into the traffic baseline.
    pub baseline_periods: usize,
    /// Latest visits must exceed baseline times this factor.
    pub spike_factor: f64,
}

/// Longest baseline accepted from config: a year of weekly periods.
pub const MAX_BASELINE_PERIODS: usize = 52;

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_BASELINE_PERIODS).contains(&self.baseline_periods) {
            bail!(
                "baseline_periods must be between 1 and {}, got {}",
                MAX_BASELINE_PERIODS,
                self.baseline_periods
            );
        }
        if !self.spike_factor.is_finite() || self.spike_factor <= 0.0 {
            bail!("spike_factor must be a positive number, got {}", self.spike_factor);
        }
        if !self.efficiency_threshold.is_finite() || !(0.0..=100.0).contains(&self.efficiency_threshold) {
            bail!(
                "efficiency_threshold must be between 0 and 100, got {}",
                self.efficiency_threshold
            );
        }
        Ok(())
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            efficiency_threshold: DEFAULT_EFFICIENCY_THRESHOLD,
            baseline_periods: DEFAULT_BASELINE_PERIODS,
            spike_factor: DEFAULT_SPIKE_FACTOR,
        }
    }
}

// ---------------------------------------------------------------------------
// Alerting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Incoming-webhook URL for spike alerts. Unset disables delivery.
    pub webhook_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Listen address for `terminus-metrics dashboard`.
    pub bind: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of human-readable logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
