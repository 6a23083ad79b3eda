// crates/action-dispatch-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for action-dispatch-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use action_dispatch_config::ConfigError;
use action_dispatch_config::DispatchConfig;

/// Parses a TOML string into a `DispatchConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<DispatchConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<DispatchConfig, toml::de::Error> {
    config_from_toml("")
}

/// Asserts that a validation result failed with a message containing `needle`.
pub fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}
