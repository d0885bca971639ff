//! Monitor configuration
//!
//! Every field has a default, so a config file only needs the values it
//! changes. Durations are stored in milliseconds to keep the JSON form plain.

use crate::alert::DEFAULT_ALERT_DELAY_MS;
use crate::classifier::DEFAULT_HYSTERESIS_WINDOW_MS;
use crate::error::ComputeError;
use crate::session::DEFAULT_TICK_INTERVAL_MS;
use crate::thresholds::Thresholds;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default interval between emitted stats records
pub const DEFAULT_EMIT_INTERVAL_MS: i64 = 1_000;

/// Upper bound for every millisecond field (24 hours)
pub const MAX_DURATION_MS: i64 = 24 * 60 * 60 * 1_000;

/// Configuration for one monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Initial face/eye thresholds
    pub thresholds: Thresholds,
    /// Distraction streak before the alert flag is raised
    pub alert_delay_ms: i64,
    /// How long a new raw classification must persist before it is confirmed
    pub hysteresis_window_ms: i64,
    /// Session accumulator cadence
    pub tick_interval_ms: i64,
    /// Minimum spacing between emitted stats records (0 emits every tick)
    pub emit_interval_ms: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            alert_delay_ms: DEFAULT_ALERT_DELAY_MS,
            hysteresis_window_ms: DEFAULT_HYSTERESIS_WINDOW_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            emit_interval_ms: DEFAULT_EMIT_INTERVAL_MS,
        }
    }
}

impl MonitorConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(ComputeError::JsonError)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        self.thresholds.validate()?;

        check_millis("alert_delay_ms", self.alert_delay_ms, 0)?;
        check_millis("hysteresis_window_ms", self.hysteresis_window_ms, 0)?;
        check_millis("tick_interval_ms", self.tick_interval_ms, 1)?;
        check_millis("emit_interval_ms", self.emit_interval_ms, 0)
    }

    pub fn alert_delay(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.alert_delay_ms)
    }

    pub fn hysteresis_window(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.hysteresis_window_ms)
    }

    pub fn tick_interval(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.tick_interval_ms)
    }

    pub fn emit_interval(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.emit_interval_ms)
    }
}

fn check_millis(name: &str, value: i64, min: i64) -> Result<(), ComputeError> {
    if (min..=MAX_DURATION_MS).contains(&value) {
        Ok(())
    } else {
        Err(ComputeError::InvalidConfig(format!(
            "{name} must be between {min} and {MAX_DURATION_MS}, got {value}"
        )))
    }
}
