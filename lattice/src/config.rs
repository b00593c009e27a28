//! Engine configuration parsed from environment variables.

use std::env::VarError;

use crate::consts::{
    CONTROL_MAX, CONTROL_MIN, DEFAULT_DAMPING, DEFAULT_REST_LENGTH, DEFAULT_STIFFNESS, FRICTION_DIVISOR, PICK_RADIUS,
    SPAWN_POSITION,
};
use crate::graph::SpringParams;
use crate::point::Vec3;
use crate::selection::ControlRange;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Tunables shared by the graph, the selection, and the render-loop tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Parameters of springs created by add-spring and connect-all.
    pub spring: SpringParams,
    pub control_min: f64,
    pub control_max: f64,
    /// Per-frame velocity divisor.
    pub friction: f64,
    /// Pick slop in world units for the headless collaborator.
    pub pick_radius: f64,
    /// Where add-mass places a new mass when no position is given.
    pub spawn: Vec3,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let (x, y, z) = SPAWN_POSITION;
        Self {
            spring: SpringParams::default(),
            control_min: CONTROL_MIN,
            control_max: CONTROL_MAX,
            friction: FRICTION_DIVISOR,
            pick_radius: PICK_RADIUS,
            spawn: Vec3::new(x, y, z),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables.
    ///
    /// Optional, each falling back to the built-in default:
    /// - `LATTICE_REST_LENGTH`: default 5
    /// - `LATTICE_STIFFNESS`: default 10
    /// - `LATTICE_DAMPING`: default 0.5
    /// - `LATTICE_CONTROL_MIN` / `LATTICE_CONTROL_MAX`: slider range, default 1..10
    /// - `LATTICE_FRICTION`: default 1.05
    /// - `LATTICE_PICK_RADIUS`: default 1
    ///
    /// # Errors
    ///
    /// `Invalid` when a variable is set but is not a finite non-negative
    /// number, or when the slider range is inverted.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Same as [`Self::from_env`] with an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str, default: f64| parse_number(key, lookup(key), default);
        let config = Self {
            spring: SpringParams {
                rest_length: get("LATTICE_REST_LENGTH", DEFAULT_REST_LENGTH)?,
                stiffness: get("LATTICE_STIFFNESS", DEFAULT_STIFFNESS)?,
                damping: get("LATTICE_DAMPING", DEFAULT_DAMPING)?,
            },
            control_min: get("LATTICE_CONTROL_MIN", CONTROL_MIN)?,
            control_max: get("LATTICE_CONTROL_MAX", CONTROL_MAX)?,
            friction: get("LATTICE_FRICTION", FRICTION_DIVISOR)?,
            pick_radius: get("LATTICE_PICK_RADIUS", PICK_RADIUS)?,
            ..Self::default()
        };
        if config.control_min > config.control_max {
            return Err(ConfigError::Invalid {
                key: "LATTICE_CONTROL_MIN",
                value: format!("{} > {}", config.control_min, config.control_max),
            });
        }
        Ok(config)
    }

    #[must_use]
    pub fn control_range(&self) -> ControlRange {
        ControlRange { min: self.control_min, max: self.control_max }
    }
}

/// A value that is not valid unicode is passed through lossily and fails number parsing.
fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => Some(raw.to_string_lossy().into_owned()),
    }
}

fn parse_number(key: &'static str, raw: Option<String>, default: f64) -> Result<f64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
