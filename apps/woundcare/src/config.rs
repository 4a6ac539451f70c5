//! # Configuration Module
//!
//! Optional TOML configuration file.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [thresholds]
//! alert_pain_above = 7
//! stalled_min_days = 14
//! discharge_size_below = "1.0"
//! ```
//!
//! Every key is optional; absent keys keep the built-in defaults.
//! Unknown keys are rejected so typos do not silently fall back.

use serde::Deserialize;
use std::path::Path;
use woundcare_core::{
    Centimeters, PainScale, RawField, StageThresholds, WoundcareError, normalize,
};

/// Default bind host for the HTTP server.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port for the HTTP server.
pub const DEFAULT_PORT: u16 = 8080;

// =============================================================================
// FILE LAYOUT
// =============================================================================

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// `[thresholds]` section. Sizes are in centimetres and accept the same
/// forms as the HTTP payloads (`1`, `0.5`, `"1,5"`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdsConfig {
    pub in_progress_max_treatments: Option<usize>,
    pub alert_pain_above: Option<u8>,
    pub stalled_min_days: Option<i64>,
    pub stalled_min_treatments: Option<usize>,
    pub stalled_pain_above: Option<u8>,
    pub stalled_size_above: Option<RawField>,
    pub favorable_min_treatments: Option<usize>,
    pub favorable_pain_max: Option<u8>,
    pub improvement_min_treatments: Option<usize>,
    pub improvement_pain_max: Option<u8>,
    pub improvement_size_below: Option<RawField>,
    pub discharge_size_below: Option<RawField>,
    pub discharge_pain_max: Option<u8>,
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, WoundcareError> {
        toml::from_str(text).map_err(|e| WoundcareError::ConfigError(e.to_string()))
    }

    /// Load `path`, or the defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, WoundcareError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            WoundcareError::ConfigError(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Host to bind, preferring `cli` over the file over the default.
    #[must_use]
    pub fn host(&self, cli: Option<String>) -> String {
        cli.or_else(|| self.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    /// Port to bind, preferring `cli` over the file over the default.
    #[must_use]
    pub fn port(&self, cli: Option<u16>) -> u16 {
        cli.or(self.server.port).unwrap_or(DEFAULT_PORT)
    }
}

impl ThresholdsConfig {
    /// Overlay the configured values on the built-in defaults.
    pub fn resolve(&self) -> Result<StageThresholds, WoundcareError> {
        let d = StageThresholds::default();
        Ok(StageThresholds {
            in_progress_max_treatments: self
                .in_progress_max_treatments
                .unwrap_or(d.in_progress_max_treatments),
            alert_pain_above: pain("alert_pain_above", self.alert_pain_above, d.alert_pain_above)?,
            stalled_min_days: self.stalled_min_days.unwrap_or(d.stalled_min_days),
            stalled_min_treatments: self
                .stalled_min_treatments
                .unwrap_or(d.stalled_min_treatments),
            stalled_pain_above: pain(
                "stalled_pain_above",
                self.stalled_pain_above,
                d.stalled_pain_above,
            )?,
            stalled_size_above: size(
                "stalled_size_above",
                self.stalled_size_above.as_ref(),
                d.stalled_size_above,
            )?,
            favorable_min_treatments: self
                .favorable_min_treatments
                .unwrap_or(d.favorable_min_treatments),
            favorable_pain_max: pain(
                "favorable_pain_max",
                self.favorable_pain_max,
                d.favorable_pain_max,
            )?,
            improvement_min_treatments: self
                .improvement_min_treatments
                .unwrap_or(d.improvement_min_treatments),
            improvement_pain_max: pain(
                "improvement_pain_max",
                self.improvement_pain_max,
                d.improvement_pain_max,
            )?,
            improvement_size_below: size(
                "improvement_size_below",
                self.improvement_size_below.as_ref(),
                d.improvement_size_below,
            )?,
            discharge_size_below: size(
                "discharge_size_below",
                self.discharge_size_below.as_ref(),
                d.discharge_size_below,
            )?,
            discharge_pain_max: pain(
                "discharge_pain_max",
                self.discharge_pain_max,
                d.discharge_pain_max,
            )?,
        })
    }
}

fn pain(name: &'static str, value: Option<u8>, default: u8) -> Result<u8, WoundcareError> {
    match value {
        Some(v) if v > PainScale::MAX => Err(WoundcareError::ConfigError(format!(
            "thresholds.{} = {} is above {}",
            name,
            v,
            PainScale::MAX
        ))),
        Some(v) => Ok(v),
        None => Ok(default),
    }
}

fn size(
    name: &'static str,
    value: Option<&RawField>,
    default: Centimeters,
) -> Result<Centimeters, WoundcareError> {
    normalize::measurement(name, value)
        .map(|cm| cm.unwrap_or(default))
        .map_err(|e| WoundcareError::ConfigError(format!("thresholds: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================
