//! Bridge configuration.
//!
//! Loaded from JSON or built in code; every field has a default, so a
//! partial document only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::Vector;
use crate::sim::WorldSettings;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Simulated seconds per internal step.
    pub fixed_time_step: f64,
    /// Internal steps allowed per tick before the backlog is dropped.
    pub max_sub_steps: u32,
    /// Squared-distance threshold a simulated value must exceed to be written back.
    pub dead_band: f64,
    /// Gravity used when the graph declares no world node.
    pub default_gravity: Vector,
    pub player_radius: f64,
    /// Add a static ground plane at y = 0 on init.
    pub ground_plane: bool,
    pub allow_sleep: bool,
    pub sleep_speed_limit: f64,
    pub sleep_time_limit: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_time_step: 1.0 / 50.0,
            max_sub_steps: 3,
            dead_band: 0.01,
            default_gravity: Vector::new(0.0, -20.0, 0.0),
            player_radius: 0.5,
            ground_plane: true,
            allow_sleep: true,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
            linear_damping: 0.01,
            angular_damping: 0.01,
        }
    }
}

impl PhysicsConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.fixed_time_step.is_finite() && self.fixed_time_step > 0.0) {
            return Err(invalid("fixed_time_step", "must be a positive number of seconds"));
        }
        if self.max_sub_steps == 0 {
            return Err(invalid("max_sub_steps", "must be at least 1"));
        }
        if !(self.dead_band.is_finite() && self.dead_band >= 0.0) {
            return Err(invalid("dead_band", "must be finite and non-negative"));
        }
        if !self.default_gravity.is_finite() {
            return Err(invalid("default_gravity", "components must be finite"));
        }
        if !(self.player_radius.is_finite() && self.player_radius > 0.0) {
            return Err(invalid("player_radius", "must be positive"));
        }
        for (name, value) in [
            ("sleep_speed_limit", self.sleep_speed_limit),
            ("sleep_time_limit", self.sleep_time_limit),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(invalid(name, "must be finite and non-negative"));
            }
        }
        for (name, value) in [
            ("linear_damping", self.linear_damping),
            ("angular_damping", self.angular_damping),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, "must lie in [0, 1]"));
            }
        }
        Ok(())
    }

    /// Wall-clock period of the step timer.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.fixed_time_step)
    }

    pub(crate) fn world_settings(&self) -> WorldSettings {
        WorldSettings {
            allow_sleep: self.allow_sleep,
            sleep_speed_limit: self.sleep_speed_limit,
            sleep_time_limit: self.sleep_time_limit,
            linear_damping: self.linear_damping,
            angular_damping: self.angular_damping,
        }
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidConfig(format!("{field} {reason}"))
}
