//! Configuration management for the grptrace CLI.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```yaml
//! directory:
//!   backend: grouper
//!   base_url: https://grouper.example.edu/grouper-ws/servicesRest/json/v4_0_000
//!   username: svc-trace
//! trace:
//!   default_max_depth: 10
//!   timeout_secs: 30
//! logging:
//!   level: warn
//! ```
//!
//! The password is best supplied as `GRPTRACE_DIRECTORY__PASSWORD`.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use grptrace_directory::GrouperConfig;
use grptrace_domain::resolver::ABSOLUTE_MAX_DEPTH;
use grptrace_domain::ResolverConfig;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "GRPTRACE";

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Directory backend settings
    #[serde(default)]
    pub directory: DirectorySettings,

    /// Trace settings
    #[serde(default)]
    pub trace: TraceSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Directory backend settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DirectorySettings {
    /// Backend type: "memory" or "grouper"
    #[serde(default = "default_backend")]
    pub backend: String,

    /// YAML/JSON fixture loaded by the memory backend. Without one the
    /// directory starts empty.
    pub fixture_path: Option<String>,

    /// Grouper WS base URL (required if backend is "grouper")
    pub base_url: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    pub act_as_subject_id: Option<String>,
    pub act_as_subject_source_id: Option<String>,
    pub act_as_subject_identifier: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            fixture_path: None,
            base_url: None,
            username: None,
            password: None,
            act_as_subject_id: None,
            act_as_subject_source_id: None,
            act_as_subject_identifier: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

/// Trace settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TraceSettings {
    /// Depth used when a trace does not request one
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,

    /// Whole-trace timeout in seconds
    #[serde(default = "default_trace_timeout")]
    pub timeout_secs: u64,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            timeout_secs: default_trace_timeout(),
        }
    }
}

fn default_max_depth() -> u32 {
    grptrace_domain::resolver::DEFAULT_MAX_DEPTH
}

fn default_trace_timeout() -> u64 {
    30
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format
    #[serde(default)]
    pub json: bool,

    /// Log span enter/exit events
    #[serde(default)]
    pub spans: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            spans: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `GRPTRACE_` and use `__` as
    /// separator, e.g. `GRPTRACE_TRACE__DEFAULT_MAX_DEPTH=5` overrides
    /// `trace.default_max_depth`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(env_source())
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let valid_backends = ["memory", "grouper"];
        if !valid_backends.contains(&self.directory.backend.as_str()) {
            return Err(invalid(format!(
                "directory.backend must be one of: {:?}, got: {}",
                valid_backends, self.directory.backend
            )));
        }

        if self.directory.backend == "grouper" && is_blank(&self.directory.base_url) {
            return Err(invalid(
                "directory.base_url is required when backend is 'grouper'",
            ));
        }

        if !is_blank(&self.directory.username) && self.directory.password.is_none() {
            return Err(invalid(
                "directory.password is required when directory.username is set",
            ));
        }

        if self.directory.request_timeout_secs == 0 {
            return Err(invalid(
                "directory.request_timeout_secs must be greater than 0",
            ));
        }

        if !(1..=ABSOLUTE_MAX_DEPTH).contains(&self.trace.default_max_depth) {
            return Err(invalid(format!(
                "trace.default_max_depth must be between 1 and {ABSOLUTE_MAX_DEPTH}, got: {}",
                self.trace.default_max_depth
            )));
        }

        if self.trace.timeout_secs == 0 {
            return Err(invalid("trace.timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }

    /// Resolver settings derived from the `trace` section.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_default_max_depth(self.trace.default_max_depth)
            .with_timeout(Duration::from_secs(self.trace.timeout_secs))
    }

    /// Grouper client settings derived from the `directory` section.
    pub fn grouper_config(&self) -> GrouperConfig {
        let directory = &self.directory;
        let mut config = GrouperConfig::new(directory.base_url.clone().unwrap_or_default())
            .with_request_timeout(Duration::from_secs(directory.request_timeout_secs));
        config.username = directory.username.clone().filter(|u| !u.trim().is_empty());
        config.password = directory.password.clone();
        config.act_as_subject_id = directory.act_as_subject_id.clone();
        config.act_as_subject_source_id = directory.act_as_subject_source_id.clone();
        config.act_as_subject_identifier = directory.act_as_subject_identifier.clone();
        config
    }
}

/// Use __ as separator for nested keys: GRPTRACE_DIRECTORY__BACKEND -> directory.backend
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
directory:
  backend: grouper
  base_url: "https://grouper.example.edu/ws"
  username: svc
  password: secret
  act_as_subject_id: GrouperSystem
  request_timeout_secs: 10
trace:
  default_max_depth: 15
  timeout_secs: 5
logging:
  level: debug
  json: true
  spans: true
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.directory.backend, "grouper");
        assert_eq!(
            config.directory.base_url.as_deref(),
            Some("https://grouper.example.edu/ws")
        );
        assert_eq!(config.directory.username.as_deref(), Some("svc"));
        assert_eq!(
            config.directory.act_as_subject_id.as_deref(),
            Some("GrouperSystem")
        );
        assert_eq!(config.directory.request_timeout_secs, 10);
        assert_eq!(config.trace.default_max_depth, 15);
        assert_eq!(config.trace.timeout_secs, 5);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.logging.spans);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
directory:
  backend: memory
  fixture_path: /etc/grptrace/directory.yaml
trace:
  default_max_depth: 8
"#
        )
        .unwrap();

        std::env::set_var("GRPTRACE_TRACE__DEFAULT_MAX_DEPTH", "12");
        std::env::set_var("GRPTRACE_LOGGING__LEVEL", "error");

        let config = AppConfig::load(file.path());

        std::env::remove_var("GRPTRACE_TRACE__DEFAULT_MAX_DEPTH");
        std::env::remove_var("GRPTRACE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.trace.default_max_depth, 12); // Overridden by env
        assert_eq!(
            config.directory.fixture_path.as_deref(),
            Some("/etc/grptrace/directory.yaml")
        ); // From file
        assert_eq!(config.logging.level, "error"); // Overridden by env
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = AppConfig::default();
        config.directory.backend = "ldap".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("directory.backend"));

        // Grouper backend needs a base URL, blank counts as missing
        for base_url in [None, Some(""), Some("   ")] {
            let mut config = AppConfig::default();
            config.directory.backend = "grouper".to_string();
            config.directory.base_url = base_url.map(str::to_string);
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("base_url"), "base_url {base_url:?}");
        }

        let mut config = AppConfig::default();
        config.directory.username = Some("svc".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("directory.password"));

        let mut config = AppConfig::default();
        config.directory.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trace.timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trace.timeout_secs"));

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    /// Test: Depth bounds are enforced
    #[test]
    fn test_default_max_depth_must_be_within_bounds() {
        let test_cases = [(0, true), (1, false), (20, false), (21, true), (1000, true)];

        for (depth, should_err) in test_cases {
            let mut config = AppConfig::default();
            config.trace.default_max_depth = depth;
            let result = config.validate();
            if should_err {
                let err = result.unwrap_err();
                assert!(
                    err.to_string().contains("trace.default_max_depth"),
                    "Error for depth {depth} should name the field"
                );
            } else {
                assert!(result.is_ok(), "Expected ok for depth {depth}");
            }
        }
    }

    /// Test: Invalid config returns clear error
    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = AppConfig::load("/nonexistent/path/grptrace.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();
        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    /// Test: Default config is valid
    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.directory.backend, "memory");
        assert!(config.directory.fixture_path.is_none());
        assert_eq!(config.trace.default_max_depth, 10);
        assert_eq!(config.trace.timeout_secs, 30);
        assert_eq!(config.logging.level, "warn");
        assert!(!config.logging.json);
        assert!(!config.logging.spans);
    }

    /// Test: from_env loads defaults with env overrides
    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("GRPTRACE_DIRECTORY__FIXTURE_PATH", "/tmp/fixture.yaml");

        let config = AppConfig::from_env();

        std::env::remove_var("GRPTRACE_DIRECTORY__FIXTURE_PATH");

        let config = config.unwrap();
        assert_eq!(
            config.directory.fixture_path.as_deref(),
            Some("/tmp/fixture.yaml")
        );
        assert_eq!(config.directory.backend, "memory");
    }

    #[test]
    fn test_derived_resolver_and_grouper_configs() {
        let mut config = AppConfig::default();
        config.trace.default_max_depth = 4;
        config.trace.timeout_secs = 7;
        config.directory.base_url = Some("https://grouper.example.edu/ws".to_string());
        config.directory.username = Some("svc".to_string());
        config.directory.password = Some("secret".to_string());
        config.directory.request_timeout_secs = 3;

        let resolver = config.resolver_config();
        assert_eq!(resolver.default_max_depth, 4);
        assert_eq!(resolver.timeout, Duration::from_secs(7));

        let grouper = config.grouper_config();
        assert_eq!(grouper.base_url, "https://grouper.example.edu/ws");
        assert_eq!(grouper.username.as_deref(), Some("svc"));
        assert_eq!(grouper.password.as_deref(), Some("secret"));
        assert_eq!(grouper.request_timeout, Duration::from_secs(3));
    }
}
