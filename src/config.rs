//! Configuration for the Romi control stack
//!
//! Loads robot geometry, controller gains, and the calibration record path
//! from a TOML file. Every field has a default matching the physical Romi
//! chassis, so the stack runs without a config file.

use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Robot configuration, immutable after startup.
///
/// Constructed once in `main` and cloned into every component that needs it.
#[derive(Clone, Debug, Deserialize)]
pub struct RobotConfig {
    /// Wheel track width `w` in meters (default: 0.141)
    #[serde(default = "default_track_width")]
    pub track_width: f32,

    /// Wheel radius `r` in meters (default: 0.035)
    #[serde(default = "default_wheel_radius")]
    pub wheel_radius: f32,

    /// Nominal translational speed `V` in m/s (default: 0.10)
    #[serde(default = "default_nominal_velocity")]
    pub nominal_velocity: f32,

    /// Encoder counts per wheel revolution (default: 1440)
    #[serde(default = "default_counts_per_rev")]
    pub counts_per_rev: f32,

    /// Divisor applied to the raw line-position reading before it is used
    /// as a yaw-rate setpoint (default: 1500)
    #[serde(default = "default_line_scale")]
    pub line_scale: f32,

    /// Path of the persisted IMU calibration offset record
    #[serde(default = "default_calibration_file")]
    pub calibration_file: String,

    /// Per-wheel speed controller gains
    #[serde(default)]
    pub wheel_gains: PiGains,

    /// Body velocity/yaw controller gains
    #[serde(default)]
    pub body_gains: BodyGains,
}

/// Proportional-integral gain pair
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PiGains {
    #[serde(default = "default_wheel_kp")]
    pub kp: f32,
    #[serde(default = "default_wheel_ki")]
    pub ki: f32,
}

/// Gains for the body velocity/yaw controller
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct BodyGains {
    #[serde(default = "default_kp_v")]
    pub kp_v: f32,
    #[serde(default = "default_ki_v")]
    pub ki_v: f32,
    #[serde(default = "default_kp_yaw")]
    pub kp_yaw: f32,
    #[serde(default = "default_ki_yaw")]
    pub ki_yaw: f32,
}

fn default_track_width() -> f32 {
    0.141
}

fn default_wheel_radius() -> f32 {
    0.035
}

fn default_nominal_velocity() -> f32 {
    0.10
}

fn default_counts_per_rev() -> f32 {
    1440.0
}

fn default_line_scale() -> f32 {
    1500.0
}

fn default_calibration_file() -> String {
    "calibration.bin".to_string()
}

fn default_wheel_kp() -> f32 {
    7.0
}

fn default_wheel_ki() -> f32 {
    8.0
}

fn default_kp_v() -> f32 {
    0.8
}

fn default_ki_v() -> f32 {
    0.87
}

fn default_kp_yaw() -> f32 {
    0.7
}

fn default_ki_yaw() -> f32 {
    0.95
}

impl Default for PiGains {
    fn default() -> Self {
        Self {
            kp: default_wheel_kp(),
            ki: default_wheel_ki(),
        }
    }
}

impl Default for BodyGains {
    fn default() -> Self {
        Self {
            kp_v: default_kp_v(),
            ki_v: default_ki_v(),
            kp_yaw: default_kp_yaw(),
            ki_yaw: default_ki_yaw(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            track_width: default_track_width(),
            wheel_radius: default_wheel_radius(),
            nominal_velocity: default_nominal_velocity(),
            counts_per_rev: default_counts_per_rev(),
            line_scale: default_line_scale(),
            calibration_file: default_calibration_file(),
            wheel_gains: PiGains::default(),
            body_gains: BodyGains::default(),
        }
    }
}

impl RobotConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: RobotConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.wheel_radius <= 0.0 || self.track_width <= 0.0 {
            return Err(crate::Error::Config(
                "wheel_radius and track_width must be positive".to_string(),
            ));
        }
        if self.counts_per_rev <= 0.0 {
            return Err(crate::Error::Config(
                "counts_per_rev must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_romi_chassis() {
        let cfg = RobotConfig::default();
        assert_eq!(cfg.track_width, 0.141);
        assert_eq!(cfg.wheel_radius, 0.035);
        assert_eq!(cfg.nominal_velocity, 0.10);
        assert_eq!(cfg.counts_per_rev, 1440.0);
        assert_eq!(cfg.wheel_gains.kp, 7.0);
        assert_eq!(cfg.wheel_gains.ki, 8.0);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: RobotConfig = toml::from_str("nominal_velocity = 0.2").unwrap();
        assert_eq!(cfg.nominal_velocity, 0.2);
        assert_eq!(cfg.track_width, 0.141);
    }

    #[test]
    fn rejects_bad_geometry() {
        let cfg = RobotConfig {
            wheel_radius: 0.0,
            ..RobotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
