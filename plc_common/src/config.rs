//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the TOML configuration
//! of the runtime service.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plc_common::config::{ConfigError, ConfigLoader, RuntimeConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = RuntimeConfig::load(Path::new("runtime.toml"))?;
//!     config.validate()?;
//!     println!("Working dir: {}", config.runtime.working_dir.display());
//!     Ok(())
//! }
//! ```

use crate::consts::{DEFAULT_DIRTY_PREFIXES, DEFAULT_RELOAD_DELAY_MS, DEFAULT_SERVICE_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "plc-runtime-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Backend used to detect residual libraries after an unload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DirtyDetection {
    /// List the module's dependencies with `ldd`.
    #[default]
    Ldd,
    /// Scan the shared objects mapped into this process.
    ProcMaps,
    /// Never report a dirty unload.
    Off,
}

/// Runtime controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    /// Directory holding the image, hash marker and auxiliary files.
    pub working_dir: PathBuf,

    /// Start the persisted image when the service boots.
    #[serde(default)]
    pub autostart: bool,

    /// Delay between a reload request and the process re-exec.
    #[serde(default = "default_reload_delay_ms")]
    pub reload_delay_ms: u64,

    /// Dirty unload detection backend.
    #[serde(default)]
    pub dirty_detection: DirtyDetection,

    /// Library name prefixes that mark an unload dirty.
    #[serde(default = "default_dirty_prefixes")]
    pub dirty_prefixes: Vec<String>,

    /// Arguments handed to the control program after argv[0].
    #[serde(default)]
    pub program_args: Vec<String>,
}

impl RuntimeSection {
    /// Settings for the given working directory with all defaults.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            autostart: false,
            reload_delay_ms: DEFAULT_RELOAD_DELAY_MS,
            dirty_detection: DirtyDetection::default(),
            dirty_prefixes: default_dirty_prefixes(),
            program_args: Vec::new(),
        }
    }

    /// Reload delay as a `Duration`.
    #[inline]
    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }
}

/// Top-level runtime service configuration.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "plc-runtime"
///
/// [runtime]
/// working_dir = "/var/lib/plc"
/// autostart = true
/// dirty_detection = "proc-maps"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Shared settings.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Controller settings.
    pub runtime: RuntimeSection,
}

impl RuntimeConfig {
    /// Configuration for the given working directory with all defaults.
    pub fn with_working_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared: SharedConfig::default(),
            runtime: RuntimeSection::new(working_dir),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - `working_dir` is empty
    /// - `reload_delay_ms` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.runtime.working_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "working_dir cannot be empty".to_string(),
            ));
        }
        if self.runtime.reload_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reload_delay_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

fn default_reload_delay_ms() -> u64 {
    DEFAULT_RELOAD_DELAY_MS
}

fn default_dirty_prefixes() -> Vec<String> {
    DEFAULT_DIRTY_PREFIXES.iter().map(|p| p.to_string()).collect()
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
