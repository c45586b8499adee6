//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! for RTC applications, plus the session configuration itself.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rtc_common::config::{ConfigLoader, ConfigError, SessionConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = SessionConfig::load(Path::new("rtc.toml"))?;
//!     config.validate()?;
//!     println!("Card: {}", config.card.address);
//!     Ok(())
//! }
//! ```

use crate::card::types::LaserMode;
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

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common configuration fields shared across RTC applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "rtc6-eth"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
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

/// Which card to connect to and what to upload on connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CardConfig {
    /// Dotted IPv4 address of the card.
    pub address: String,
    /// Program file directory.
    pub program_file: PathBuf,
    /// Correction table file.
    pub correction_file: PathBuf,
}

/// Connection retry policy applied by the caller of the session layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retry a failed connect.
    #[serde(default)]
    pub enabled: bool,
    /// Total connect attempts when enabled.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Pause between attempts.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            attempts: default_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl RetryConfig {
    /// Number of connect attempts to make (1 when disabled).
    pub fn effective_attempts(&self) -> u32 {
        if self.enabled { self.attempts } else { 1 }
    }

    /// Pause between attempts.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Scanner delays, in 10 µs units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerDelays {
    /// Delay after a jump.
    pub jump: u32,
    /// Delay after a mark.
    pub mark: u32,
    /// Delay at polygon corners.
    pub polygon: u32,
}

/// Laser and scanner settings applied after connect, before any list is loaded.
///
/// Speeds and delays left unset keep whatever the card already has.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlConfig {
    /// Laser signal timing mode.
    #[serde(default)]
    pub laser_mode: LaserMode,
    /// Laser control word.
    #[serde(default)]
    pub laser_control: u32,
    /// Jump speed in bits/ms.
    #[serde(default)]
    pub jump_speed: Option<f64>,
    /// Mark speed in bits/ms.
    #[serde(default)]
    pub mark_speed: Option<f64>,
    /// Scanner delays.
    #[serde(default)]
    pub delays: Option<ScannerDelays>,
}

impl ControlConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a speed is not a positive
    /// finite number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, speed) in [("jump_speed", self.jump_speed), ("mark_speed", self.mark_speed)] {
            if let Some(speed) = speed.filter(|s| !(s.is_finite() && *s > 0.0)) {
                return Err(ConfigError::ValidationError(format!(
                    "control.{name} must be a positive number, got {speed}"
                )));
            }
        }
        Ok(())
    }
}

/// Session configuration (`rtc.toml`).
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "rtc6-eth"
///
/// [card]
/// address = "172.23.17.192"
/// program_file = "./rtc6_files/program_files"
/// correction_file = "./correction_files/D2_2034.ct5"
///
/// [retry]
/// enabled = true
/// attempts = 5
///
/// [control]
/// laser_mode = "YAG5"
/// laser_control = 0
/// jump_speed = 1000.0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Shared fields.
    pub shared: SharedConfig,
    /// Card to connect to.
    pub card: CardConfig,
    /// Retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Laser and scanner settings.
    #[serde(default)]
    pub control: ControlConfig,
}

impl SessionConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - the card address or either file path is empty
    /// - retry is enabled with zero attempts
    /// - a control speed is not a positive number
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.control.validate()?;

        if self.card.address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "card.address cannot be empty".to_string(),
            ));
        }
        if self.card.program_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "card.program_file cannot be empty".to_string(),
            ));
        }
        if self.card.correction_file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "card.correction_file cannot be empty".to_string(),
            ));
        }
        if self.retry.enabled && self.retry.attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.attempts must be at least 1 when retry is enabled".to_string(),
            ));
        }
        Ok(())
    }
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

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample() -> SessionConfig {
        SessionConfig {
            shared: SharedConfig {
                log_level: LogLevel::Info,
                service_name: "rtc6-eth".to_string(),
            },
            card: CardConfig {
                address: "172.23.17.192".to_string(),
                program_file: PathBuf::from("./program"),
                correction_file: PathBuf::from("./D2_2034.ct5"),
            },
            retry: RetryConfig::default(),
            control: ControlConfig::default(),
        }
    }

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"")
                .unwrap()
                .level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"error\"")
                .unwrap()
                .level,
            LogLevel::Error
        );
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_session_config_validation() {
        assert!(sample().validate().is_ok());

        let mut config = sample();
        config.card.address = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("address")
        ));

        let mut config = sample();
        config.card.correction_file = PathBuf::new();
        assert!(config.validate().is_err());

        let mut config = sample();
        config.retry.enabled = true;
        config.retry.attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_control_config_validation() {
        let mut config = sample();
        config.control.jump_speed = Some(1000.0);
        assert!(config.validate().is_ok());

        config.control.mark_speed = Some(0.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("mark_speed")
        ));

        config.control.mark_speed = Some(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_control_section_parses() {
        let config: ControlConfig = toml::from_str(
            r#"
laser_mode = "CO2"
laser_control = 4
mark_speed = 250.0

[delays]
jump = 25
mark = 10
polygon = 5
"#,
        )
        .unwrap();
        assert_eq!(config.laser_mode, LaserMode::Co2);
        assert_eq!(config.laser_control, 4);
        assert_eq!(config.jump_speed, None);
        assert_eq!(config.mark_speed, Some(250.0));
        assert_eq!(
            config.delays,
            Some(ScannerDelays {
                jump: 25,
                mark: 10,
                polygon: 5
            })
        );
    }

    #[test]
    fn test_retry_effective_attempts() {
        let mut retry = RetryConfig::default();
        assert_eq!(retry.effective_attempts(), 1);
        retry.enabled = true;
        assert_eq!(retry.effective_attempts(), 3);
        assert_eq!(retry.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = SessionConfig::load(Path::new("/nonexistent/path/rtc.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = SessionConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_config_loader_success() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[shared]
log_level = "debug"
service_name = "rtc6-eth"

[card]
address = "172.23.17.192"
program_file = "./rtc6_files/program_files"
correction_file = "./correction_files/D2_2034.ct5"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.shared.log_level, LogLevel::Debug);
        assert_eq!(config.card.address, "172.23.17.192");
        assert!(!config.retry.enabled);
        assert_eq!(config.control.laser_mode, LaserMode::Yag5);
        assert_eq!(config.control.laser_control, 0);
        assert!(config.validate().is_ok());
    }
}
