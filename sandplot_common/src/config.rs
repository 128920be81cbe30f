//! TOML firmware configuration with validation.
//!
//! Loads `FirmwareConfig` from a TOML file. Every field has a default
//! matching the reference machine, so a partial (or absent) file yields a
//! runnable configuration. Validation catches the combinations that would
//! make homing or motion nonsensical.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("config I/O error: {0}")]
    Io(String),
    /// TOML parse error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Parameter validation error.
    #[error("config validation: {0}")]
    Validation(String),
}

/// Firmware configuration for the two-axis plotter core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirmwareConfig {
    /// Lower radial clamp bound [steps].
    pub r_min_steps: i32,
    /// Upper radial clamp bound [steps].
    pub r_max_steps: i32,
    /// Radial position latched when the endstop triggers [steps].
    /// The angular axis always zeroes at that moment.
    pub r_home_offset_steps: i32,
    /// Signed constant speed used while homing [steps/s].
    /// Negative drives the carriage toward the endstop.
    pub homing_speed: f32,
    /// Max axis speed after homing, until the host sends a speed command
    /// [steps/s].
    pub initial_speed: f32,
    /// Cooperative tick pacing for the simulator loop [µs].
    pub tick_interval_us: u64,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            r_min_steps: 0,
            r_max_steps: 20_700,
            r_home_offset_steps: -300,
            homing_speed: -600.0,
            initial_speed: 800.0,
            tick_interval_us: 1_000,
        }
    }
}

impl FirmwareConfig {
    /// Validate parameter combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.r_min_steps >= self.r_max_steps {
            return Err(ConfigError::Validation(format!(
                "r_min_steps {} must be below r_max_steps {}",
                self.r_min_steps, self.r_max_steps
            )));
        }
        if self.initial_speed <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "initial_speed {} must be positive",
                self.initial_speed
            )));
        }
        if self.homing_speed == 0.0 {
            return Err(ConfigError::Validation(
                "homing_speed must be nonzero".to_string(),
            ));
        }
        if self.tick_interval_us == 0 {
            return Err(ConfigError::Validation(
                "tick_interval_us must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and validate the firmware configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<FirmwareConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    load_config_from_str(&text)
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(toml_text: &str) -> Result<FirmwareConfig, ConfigError> {
    let config: FirmwareConfig =
        toml::from_str(toml_text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
