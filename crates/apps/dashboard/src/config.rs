//! Runtime configuration, read from `FIELDMAP_*` environment variables.
//!
//! Command-line flags on the `fieldmap` binary override these after loading.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use layers::StrokePolicy;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "invalid {key}={value:?}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// A named field and the GeoJSON file holding its cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSource {
    pub name: String,
    pub path: PathBuf,
}

impl FieldSource {
    /// Parses `NAME=PATH`.
    pub fn parse(arg: &str) -> Result<Self, String> {
        let (name, path) = arg
            .split_once('=')
            .ok_or_else(|| "expected NAME=PATH".to_string())?;
        let name = name.trim();
        let path = path.trim();
        if name.is_empty() || path.is_empty() {
            return Err("expected NAME=PATH".to_string());
        }
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(path),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub backend_url: String,
    pub fields: Vec<FieldSource>,
    pub default_field: Option<String>,
    pub timeout: Duration,
    pub min_stroke_zoom: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            fields: Vec::new(),
            default_field: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_stroke_zoom: StrokePolicy::default().min_zoom,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let backend_url = lookup("FIELDMAP_BACKEND_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.backend_url);

        let mut fields = Vec::new();
        if let Some(raw) = lookup("FIELDMAP_FIELDS") {
            for part in raw.split(';').filter(|p| !p.trim().is_empty()) {
                let source = FieldSource::parse(part).map_err(|reason| ConfigError::Invalid {
                    key: "FIELDMAP_FIELDS".to_string(),
                    value: part.to_string(),
                    reason,
                })?;
                fields.push(source);
            }
        }

        let default_field = lookup("FIELDMAP_DEFAULT_FIELD").filter(|v| !v.trim().is_empty());
        let timeout_secs = env_var_u64(&lookup, "FIELDMAP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let min_stroke_zoom =
            env_var_f64(&lookup, "FIELDMAP_MIN_STROKE_ZOOM", defaults.min_stroke_zoom)?;

        Ok(Self {
            backend_url,
            fields,
            default_field,
            timeout: Duration::from_secs(timeout_secs),
            min_stroke_zoom,
        })
    }

    pub fn stroke_policy(&self) -> StrokePolicy {
        StrokePolicy {
            min_zoom: self.min_stroke_zoom,
            ..StrokePolicy::default()
        }
    }
}

fn env_var_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            key: key.to_string(),
            value: v.clone(),
            reason: e.to_string(),
        }),
    }
}

fn env_var_f64<F>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(v) = lookup(key) else {
        return Ok(default);
    };
    let invalid = |reason: String| ConfigError::Invalid {
        key: key.to_string(),
        value: v.clone(),
        reason,
    };
    let parsed: f64 = v
        .trim()
        .parse()
        .map_err(|e: std::num::ParseFloatError| invalid(e.to_string()))?;
    if !parsed.is_finite() {
        return Err(invalid("not a finite number".to_string()));
    }
    Ok(parsed)
}
