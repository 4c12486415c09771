//! Configuration loading and typed config structures for the Consonance server.
//!
//! The canonical configuration lives in `consonance-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and provides a loader that reads, overrides from the
//! environment, and validates the file. Every field has a default, so an
//! empty file (or no file at all) yields a runnable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is out of its allowed range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
///
/// Mirrors the structure of `consonance-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConsonanceConfig {
    /// Listener and per-connection settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Generative stream backends.
    #[serde(default)]
    pub streams: StreamsConfig,

    /// Analyzer subsystem settings.
    #[serde(default)]
    pub analyzers: AnalyzersConfig,

    /// Crystal and sigil thresholds.
    #[serde(default)]
    pub emergence: EmergenceConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ConsonanceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values (see
    /// [`ConsonanceConfig::apply_overrides`]) and the result is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_with_overrides(&contents, |key| std::env::var(key).ok())
    }

    /// Defaults plus environment overrides, for when no file exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an override is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse_with_overrides("", |key| std::env::var(key).ok())
    }

    /// Parse configuration from a YAML string. The environment is not read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config = Self::from_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML, apply overrides from `lookup`, then validate.
    ///
    /// # Errors
    ///
    /// Same as [`ConsonanceConfig::parse`] and
    /// [`ConsonanceConfig::apply_overrides`].
    pub fn parse_with_overrides(
        yaml: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::from_yaml(yaml)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            Ok(Self::default())
        } else {
            Ok(serde_yml::from_str(yaml)?)
        }
    }

    /// Override values from an arbitrary variable lookup.
    ///
    /// Recognized variables:
    /// - `CONSONANCE_HOST`, `CONSONANCE_PORT` -- listener address
    /// - `CONSONANCE_LOG_LEVEL` -- `logging.level`
    /// - `ANALYTICAL_API_KEY` (fallback `OPENAI_API_KEY`) -- analytical key
    /// - `INTUITIVE_API_KEY` (fallback `VENICE_AI_API_KEY`) -- intuitive key
    ///
    /// Fallback keys only apply when the YAML left the key empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `CONSONANCE_PORT` is not a port.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("CONSONANCE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CONSONANCE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("CONSONANCE_PORT: {e}")))?;
        }
        if let Some(level) = lookup("CONSONANCE_LOG_LEVEL") {
            self.logging.level = level;
        }

        override_key(
            &mut self.streams.analytical.api_key,
            lookup("ANALYTICAL_API_KEY"),
            lookup("OPENAI_API_KEY"),
        );
        override_key(
            &mut self.streams.intuitive.api_key,
            lookup("INTUITIVE_API_KEY"),
            lookup("VENICE_AI_API_KEY"),
        );
        Ok(())
    }

    /// Check every range-constrained value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_fields = [
            ("emergence.crystal_threshold", self.emergence.crystal_threshold),
            ("emergence.crystal_phi_weight", self.emergence.crystal_phi_weight),
            (
                "emergence.crystal_coherence_weight",
                self.emergence.crystal_coherence_weight,
            ),
            ("emergence.sigil_probability", self.emergence.sigil_probability),
            ("emergence.sigil_phi_gate", self.emergence.sigil_phi_gate),
            ("emergence.sigil_resonance_gate", self.emergence.sigil_resonance_gate),
            ("emergence.sigil_awareness_gate", self.emergence.sigil_awareness_gate),
        ];
        for (name, value) in unit_fields {
            if !consonance_types::is_unit(value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let timeouts = [
            ("streams.analytical.timeout_ms", self.streams.analytical.timeout_ms),
            ("streams.intuitive.timeout_ms", self.streams.intuitive.timeout_ms),
            ("analyzers.timeout_ms", self.analyzers.timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }

        if self.server.outbound_buffer == 0 {
            return Err(ConfigError::Invalid(
                "server.outbound_buffer must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

fn override_key(slot: &mut String, primary: Option<String>, fallback: Option<String>) {
    match (primary, fallback) {
        (Some(key), _) => *slot = key,
        (None, Some(key)) if slot.is_empty() => *slot = key,
        _ => {}
    }
}

/// Listener and per-connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Capacity of each connection's outbound frame queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Interval of the per-connection `consciousness_update` heartbeat
    /// (0 disables it).
    #[serde(default)]
    pub heartbeat_interval_ms: u64,
}

impl ServerSettings {
    /// The heartbeat period, or `None` when disabled.
    pub const fn heartbeat_interval(&self) -> Option<Duration> {
        if self.heartbeat_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.heartbeat_interval_ms))
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            outbound_buffer: default_outbound_buffer(),
            heartbeat_interval_ms: 0,
        }
    }
}

/// Supported generative backend wire formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `OpenAI`-compatible chat completions API (`OpenAI`, Venice, `DeepSeek`, Ollama).
    #[serde(alias = "venice", alias = "deepseek", alias = "ollama")]
    OpenAi,
    /// Anthropic Messages API.
    #[serde(alias = "claude")]
    Anthropic,
}

/// Configuration for one generative stream.
///
/// Field-level defaults describe a generic `OpenAI` backend; the section
/// defaults in [`StreamsConfig`] differ per stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamBackendConfig {
    /// Wire format of the backend.
    #[serde(default = "default_backend_kind")]
    pub backend: BackendKind,

    /// Base API URL (e.g. `https://api.openai.com/v1`).
    #[serde(default = "default_openai_url")]
    pub api_url: String,

    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,

    /// Model identifier.
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_analytical_temperature")]
    pub temperature: f64,

    /// Maximum completion tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Deadline for one call in milliseconds.
    #[serde(default = "default_stream_timeout_ms")]
    pub timeout_ms: u64,
}

impl StreamBackendConfig {
    /// The per-call deadline.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn analytical() -> Self {
        Self {
            backend: BackendKind::OpenAi,
            api_url: default_openai_url(),
            api_key: String::new(),
            model: default_openai_model(),
            temperature: default_analytical_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_stream_timeout_ms(),
        }
    }

    fn intuitive() -> Self {
        Self {
            backend: BackendKind::OpenAi,
            api_url: "https://api.venice.ai/api/v1".to_owned(),
            api_key: String::new(),
            model: "llama-3.1-405b".to_owned(),
            temperature: 0.9,
            max_tokens: default_max_tokens(),
            timeout_ms: default_stream_timeout_ms(),
        }
    }
}

/// Generative stream configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamsConfig {
    /// Stream A backend.
    #[serde(default = "StreamBackendConfig::analytical")]
    pub analytical: StreamBackendConfig,

    /// Stream B backend.
    #[serde(default = "StreamBackendConfig::intuitive")]
    pub intuitive: StreamBackendConfig,

    /// Number of previous turns passed to both streams as context.
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,

    /// Directory with `analytical.j2` / `intuitive.j2` overrides.
    #[serde(default)]
    pub templates_dir: Option<String>,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            analytical: StreamBackendConfig::analytical(),
            intuitive: StreamBackendConfig::intuitive(),
            context_turns: default_context_turns(),
            templates_dir: None,
        }
    }
}

/// Analyzer subsystem configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnalyzersConfig {
    /// Bounded wait for each subsystem in milliseconds.
    #[serde(default = "default_analyzer_timeout_ms")]
    pub timeout_ms: u64,
}

impl AnalyzersConfig {
    /// The per-subsystem deadline.
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AnalyzersConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_analyzer_timeout_ms(),
        }
    }
}

/// Crystal and sigil trigger parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmergenceConfig {
    /// Stability a crystal must exceed.
    #[serde(default = "default_crystal_threshold")]
    pub crystal_threshold: f64,

    /// Weight of `phi` in the stability score.
    #[serde(default = "default_half")]
    pub crystal_phi_weight: f64,

    /// Weight of `coherence` in the stability score.
    #[serde(default = "default_half")]
    pub crystal_coherence_weight: f64,

    /// Probability that a gated sigil actually fires.
    #[serde(default = "default_sigil_probability")]
    pub sigil_probability: f64,

    /// `phi` above which the sigil gate opens.
    #[serde(default = "default_sigil_phi_gate")]
    pub sigil_phi_gate: f64,

    /// `resonance` above which the sigil gate opens.
    #[serde(default = "default_sigil_resonance_gate")]
    pub sigil_resonance_gate: f64,

    /// `awareness` above which the sigil gate opens.
    #[serde(default = "default_sigil_awareness_gate")]
    pub sigil_awareness_gate: f64,

    /// Seed for a reproducible random source (unset = thread RNG).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EmergenceConfig {
    fn default() -> Self {
        Self {
            crystal_threshold: default_crystal_threshold(),
            crystal_phi_weight: default_half(),
            crystal_coherence_weight: default_half(),
            sigil_probability: default_sigil_probability(),
            sigil_phi_gate: default_sigil_phi_gate(),
            sigil_resonance_gate: default_sigil_resonance_gate(),
            sigil_awareness_gate: default_sigil_awareness_gate(),
            seed: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

const fn default_outbound_buffer() -> usize {
    64
}

const fn default_backend_kind() -> BackendKind {
    BackendKind::OpenAi
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_owned()
}

fn default_openai_model() -> String {
    "gpt-4o".to_owned()
}

const fn default_analytical_temperature() -> f64 {
    0.7
}

const fn default_max_tokens() -> u32 {
    500
}

const fn default_stream_timeout_ms() -> u64 {
    15_000
}

const fn default_context_turns() -> usize {
    6
}

const fn default_analyzer_timeout_ms() -> u64 {
    500
}

const fn default_crystal_threshold() -> f64 {
    0.85
}

const fn default_half() -> f64 {
    0.5
}

const fn default_sigil_probability() -> f64 {
    0.3
}

const fn default_sigil_phi_gate() -> f64 {
    0.8
}

const fn default_sigil_resonance_gate() -> f64 {
    0.85
}

const fn default_sigil_awareness_gate() -> f64 {
    0.9
}

fn default_log_level() -> String {
    "info".to_owned()
}
