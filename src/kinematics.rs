//! Differential-drive kinematics and encoder-count conversions

use crate::config::RobotConfig;
use std::f32::consts::{PI, TAU};

/// Degrees to radians conversion factor
pub const DEG_TO_RAD: f32 = PI / 180.0;

/// Inverse kinematics: body velocity request to per-wheel angular velocities.
///
/// # Arguments
/// * `v` - Linear velocity (m/s)
/// * `yaw` - Yaw rate (rad/s, CCW positive)
/// * `w` - Track width (m)
/// * `r` - Wheel radius (m)
///
/// # Returns
/// (omega_left, omega_right) in rad/s
pub fn wheel_setpoints(v: f32, yaw: f32, w: f32, r: f32) -> (f32, f32) {
    let omega_left = v / r - w * yaw / (2.0 * r);
    let omega_right = v / r + w * yaw / (2.0 * r);
    (omega_left, omega_right)
}

/// Forward kinematics: wheel angular velocities to body linear velocity (m/s).
pub fn body_velocity(omega_left: f32, omega_right: f32, r: f32) -> f32 {
    (r / 2.0) * (omega_left + omega_right)
}

/// Forward kinematics: wheel angular velocities to body yaw rate (rad/s).
pub fn body_yaw_rate(omega_left: f32, omega_right: f32, w: f32, r: f32) -> f32 {
    (r / w) * (omega_right - omega_left)
}

/// Convert encoder speed (counts per microsecond, CCW-positive convention)
/// to wheel angular velocity in rad/s in the drive-forward convention.
///
/// Scale is 10^6 us/s * 2*pi rad/rev / counts-per-rev, negated to map the
/// encoder's CCW-positive getters onto the drive-forward-positive convention
/// the controllers use.
pub fn encoder_speed_to_omega(speed_counts_per_us: f32, counts_per_rev: f32) -> f32 {
    speed_counts_per_us * -(1_000_000.0 * TAU / counts_per_rev)
}

/// Motion thresholds in raw encoder counts, derived once from the robot
/// geometry. The navigator compares absolute encoder displacement against
/// multiples of these, never wall-clock time.
#[derive(Clone, Copy, Debug)]
pub struct MotionThresholds {
    /// Counts for the wheel to roll 3 inches
    pub drive_3in: f32,
    /// Counts for the outer wheel during a 90-degree turn in place
    pub turn_90: f32,
}

impl MotionThresholds {
    pub fn from_config(cfg: &RobotConfig) -> Self {
        Self {
            drive_3in: counts_for_distance(3.0 * 0.0254, cfg),
            turn_90: counts_for_spin(PI / 2.0, cfg),
        }
    }
}

/// Encoder counts for the wheel to roll a straight-line distance in meters.
pub fn counts_for_distance(meters: f32, cfg: &RobotConfig) -> f32 {
    cfg.counts_per_rev * meters / (TAU * cfg.wheel_radius)
}

/// Encoder counts seen by one wheel while the robot spins in place through
/// `angle` radians. Each wheel rolls angle * w / 2 along the ground.
pub fn counts_for_spin(angle: f32, cfg: &RobotConfig) -> f32 {
    counts_for_distance(angle * cfg.track_width / 2.0, cfg)
}
