//! Application configuration, loaded from TOML.
//!
//! ```toml
//! [engine]
//! lower = 0.0
//! upper = 3.14159
//! partitions = 50
//! orientation = "right"   # or "left", "gauche", "droite"
//! variable = "x"
//!
//! [probe]
//! lower = -10.0
//! upper = 10.0
//! samples = 100
//! scalar = 0.0
//!
//! [integration]
//! backend = "native"
//! singularity_scan = 1000
//!
//! [catalog]
//! path = "functions.json"
//! seed_defaults = true
//!
//! [logging]
//! level = "info"
//! console = true
//! file = "riemann.log"
//! timestamp = true
//! ```
//! Every section and key is optional.

use crate::numerical::riemann::Orientation;
use crate::symbolic::expression_compiler::ProbeDomain;
use crate::symbolic::parse_expr::is_reserved;
use crate::symbolic::symbolic_traits::{DEFAULT_SINGULARITY_SCAN, IntegratorBackend};
use chrono::Local;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    InvalidValue { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "Cannot read configuration: {}", err),
            ConfigError::Parse(err) => write!(f, "Invalid TOML: {}", err),
            ConfigError::Serialize(err) => write!(f, "Cannot write configuration: {}", err),
            ConfigError::InvalidValue { key, message } => {
                write!(f, "Invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Serialize(err) => Some(err),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Serialize(err)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Initial engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub lower: f64,
    pub upper: f64,
    pub partitions: usize,
    pub orientation: Orientation,
    /// name of the free variable in user expressions
    pub variable: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            lower: 0.0,
            upper: 1.0,
            partitions: 10,
            orientation: Orientation::Left,
            variable: "x".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub backend: IntegratorBackend,
    pub singularity_scan: usize,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        IntegrationConfig {
            backend: IntegratorBackend::Native,
            singularity_scan: DEFAULT_SINGULARITY_SCAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
    /// fill an empty catalog with a few sample functions on startup
    pub seed_defaults: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            path: PathBuf::from("functions.json"),
            seed_defaults: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// off, error, warn, info, debug or trace
    pub level: String,
    pub console: bool,
    pub file: Option<PathBuf>,
    /// append the start time to the log file name
    pub timestamp: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            console: true,
            file: None,
            timestamp: true,
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.level.trim()).map_err(|_| {
            invalid(
                "logging.level",
                format!("'{}' is not one of off, error, warn, info, debug, trace", self.level),
            )
        })
    }

    /// Log file path, with `_%Y-%m-%d_%H-%M-%S` inserted before the extension when
    /// `timestamp` is set.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        let file = self.file.as_ref()?;
        if !self.timestamp {
            return Some(file.clone());
        }
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        let name = match file.extension() {
            Some(ext) => format!("{}_{}.{}", stem, date_and_time, ext.to_string_lossy()),
            None => format!("{}_{}", stem, date_and_time),
        };
        Some(file.with_file_name(name))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub probe: ProbeDomain,
    pub integration: IntegrationConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Reads and validates a TOML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if !(engine.lower.is_finite() && engine.upper.is_finite()) {
            return Err(invalid("engine.lower/upper", "bounds must be finite"));
        }
        if engine.lower >= engine.upper {
            return Err(invalid(
                "engine.lower/upper",
                format!("{} is not less than {}", engine.lower, engine.upper),
            ));
        }
        if engine.partitions == 0 {
            return Err(invalid("engine.partitions", "must be at least 1"));
        }
        validate_variable(&engine.variable)?;

        let probe = &self.probe;
        if !(probe.lower.is_finite() && probe.upper.is_finite() && probe.scalar.is_finite()) {
            return Err(invalid("probe", "probe points must be finite"));
        }
        if probe.lower >= probe.upper {
            return Err(invalid(
                "probe.lower/upper",
                format!("{} is not less than {}", probe.lower, probe.upper),
            ));
        }
        if probe.samples < 2 {
            return Err(invalid("probe.samples", "must be at least 2"));
        }

        if self.integration.singularity_scan < 2 {
            return Err(invalid("integration.singularity_scan", "must be at least 2"));
        }
        if self.catalog.path.as_os_str().is_empty() {
            return Err(invalid("catalog.path", "must not be empty"));
        }
        self.logging.level_filter()?;
        Ok(())
    }
}

fn validate_variable(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let well_formed = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !well_formed {
        return Err(invalid(
            "engine.variable",
            format!("'{}' is not an identifier", name),
        ));
    }
    if is_reserved(name) {
        return Err(invalid(
            "engine.variable",
            format!("'{}' is a function or constant name", name),
        ));
    }
    Ok(())
}
