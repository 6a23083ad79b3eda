// crates/action-dispatch-config/src/config.rs
// ============================================================================
// Module: Action Dispatch Configuration
// Description: Configuration loading and validation for action dispatch.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; an empty file yields a valid configuration with
//! debug tracing disabled, parameter hints enabled, and audit logging off.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "action-dispatch.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ACTION_DISPATCH_CONFIG";
/// Environment variable used to force the process-wide debug switch.
pub const DEBUG_ENV_VAR: &str = "ACTION_DISPATCH_DEBUG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default minimum argument count for non-trivial actions.
pub(crate) const DEFAULT_HINT_MIN_ARG_COUNT: usize = 3;
/// Upper bound for the hint argument threshold.
pub(crate) const MAX_HINT_MIN_ARG_COUNT: usize = 64;
/// Maximum number of non-trivial action entries.
pub(crate) const MAX_NON_TRIVIAL_ACTIONS: usize = 256;
/// Maximum length of an action name.
pub(crate) const MAX_ACTION_NAME_LENGTH: usize = 128;
/// Default documentation action named in parameter hints.
pub(crate) const DEFAULT_DOCS_ACTION: &str = "schema_info";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Action dispatch configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Debug tracing configuration.
    #[serde(default)]
    pub debug: DebugConfig,
    /// Parameter hint policy configuration.
    #[serde(default)]
    pub hints: HintConfig,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl DispatchConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// A missing default file yields the default configuration; an explicit
    /// path (argument or environment) must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        let mut config = Self::from_bytes(&bytes)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from raw TOML bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the payload is oversized, not UTF-8, or invalid.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hints.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Applies environment overrides on top of file-based settings.
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(value) = env::var(DEBUG_ENV_VAR) {
            self.debug.enabled = parse_env_flag(&value).ok_or_else(|| {
                ConfigError::Invalid(format!("{DEBUG_ENV_VAR} must be a boolean flag"))
            })?;
        }
        Ok(())
    }
}

/// Process-wide debug switch configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Enables debug trace capture for callers that also set `debug` per call.
    #[serde(default)]
    pub enabled: bool,
}

/// Parameter hint policy configuration.
///
/// # Invariants
/// - `min_arg_count` is within `1..=64`.
/// - Action names are non-empty and bounded in length.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HintConfig {
    /// Enables the "retrieve documentation first" short-circuit.
    #[serde(default = "default_hints_enabled")]
    pub enabled: bool,
    /// Argument count below which non-trivial actions trigger the hint.
    #[serde(default = "default_hint_min_arg_count")]
    pub min_arg_count: usize,
    /// Action names considered non-trivial.
    #[serde(default = "default_non_trivial_actions")]
    pub non_trivial_actions: Vec<String>,
    /// Documentation action named in hint messages.
    #[serde(default = "default_docs_action")]
    pub docs_action: String,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            enabled: default_hints_enabled(),
            min_arg_count: default_hint_min_arg_count(),
            non_trivial_actions: default_non_trivial_actions(),
            docs_action: default_docs_action(),
        }
    }
}

impl HintConfig {
    /// Validates hint policy configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_arg_count == 0 || self.min_arg_count > MAX_HINT_MIN_ARG_COUNT {
            return Err(ConfigError::Invalid(format!(
                "hints.min_arg_count must be between 1 and {MAX_HINT_MIN_ARG_COUNT}"
            )));
        }
        if self.non_trivial_actions.len() > MAX_NON_TRIVIAL_ACTIONS {
            return Err(ConfigError::Invalid(
                "hints.non_trivial_actions exceeds max entries".to_string(),
            ));
        }
        for action in &self.non_trivial_actions {
            validate_action_name("hints.non_trivial_actions", action)?;
        }
        validate_action_name("hints.docs_action", &self.docs_action)?;
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// Write JSON lines to stderr.
    Stderr,
    /// Append JSON lines to a file.
    File,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink receiving dispatch audit events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path (required for the file sink).
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, self.path.as_deref()) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink=file requires audit.path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (_, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid with audit.sink=file".to_string(),
            )),
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
///
/// Returns the path and whether it was explicitly requested.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an action name used in hint policy configuration.
fn validate_action_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} entries must be non-empty")));
    }
    if value.len() > MAX_ACTION_NAME_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} entry exceeds max length")));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!("{field} entries must not contain whitespace")));
    }
    Ok(())
}

/// Parses a boolean environment flag.
#[must_use]
pub fn parse_env_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Default for `hints.enabled`.
pub(crate) const fn default_hints_enabled() -> bool {
    true
}

/// Default for `hints.min_arg_count`.
pub(crate) const fn default_hint_min_arg_count() -> usize {
    DEFAULT_HINT_MIN_ARG_COUNT
}

/// Default for `hints.non_trivial_actions`.
pub(crate) fn default_non_trivial_actions() -> Vec<String> {
    ["create", "update", "duplicate"].iter().map(|action| (*action).to_string()).collect()
}

/// Default for `hints.docs_action`.
pub(crate) fn default_docs_action() -> String {
    DEFAULT_DOCS_ACTION.to_string()
}
