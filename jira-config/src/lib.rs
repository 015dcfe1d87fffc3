//! Shared configuration loader for the jira command-line client.
//!
//! `defaults/jira.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`JiraConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use jira_adf::{ConversionRules, MarkEquality};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/jira.default.toml");

/// Name of the project-local configuration file picked up from the working
/// directory.
pub const LOCAL_CONFIG_FILE: &str = "jira.toml";

/// Top-level configuration consumed by jira applications.
#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    pub convert: ConvertConfig,
    pub output: OutputConfig,
    pub log: LogConfig,
}

impl JiraConfig {
    /// Conversion rules for both directions, including output settings.
    pub fn conversion_rules(&self) -> ConversionRules {
        ConversionRules {
            pretty_json: self.output.pretty_json,
            ..ConversionRules::from(&self.convert)
        }
    }
}

/// Mirrors the knobs exposed by [`ConversionRules`].
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertConfig {
    pub max_input_bytes: usize,
    pub mark_equality: MarkEquality,
    pub bullet_marker: char,
    pub soft_breaks_as_hard: bool,
}

impl From<ConvertConfig> for ConversionRules {
    fn from(config: ConvertConfig) -> Self {
        ConversionRules::from(&config)
    }
}

impl From<&ConvertConfig> for ConversionRules {
    fn from(config: &ConvertConfig) -> Self {
        ConversionRules {
            max_input_bytes: config.max_input_bytes,
            mark_equality: config.mark_equality,
            bullet_marker: config.bullet_marker,
            soft_breaks_as_hard: config.soft_breaks_as_hard,
            ..ConversionRules::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub pretty_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// A `tracing` level name or `EnvFilter` directive.
    pub level: String,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<JiraConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<JiraConfig, ConfigError> {
    Loader::new().build()
}
