//! Simulated robot physics
//!
//! One shared world backs all simulated peripherals. Each motor is a
//! first-order lag from duty to wheel angular velocity; wheel motion is
//! integrated into encoder ticks (wrapping 16-bit, fractional remainder
//! carried) and into a differential-drive pose used by the simulated IMU.
//!
//! The world only moves when `advance` is called, so tests and the demo
//! binary control simulated time explicitly.

use super::noise::NoiseGenerator;
use crate::config::RobotConfig;
use crate::drivers::OperatingMode;
use crate::kinematics::{body_velocity, body_yaw_rate};
use parking_lot::Mutex;
use std::f32::consts::TAU;
use std::sync::Arc;

/// Wheel angular velocity at full duty (rad/s per duty unit).
const DUTY_TO_OMEGA: f32 = 0.4;
/// Motor first-order time constant (seconds).
const MOTOR_TAU: f32 = 0.05;
/// Encoder tick jitter (standard deviation, ticks per advance).
const TICK_JITTER: f32 = 0.25;
/// Gyro noise (standard deviation, deg/s).
const GYRO_NOISE: f32 = 0.05;

#[derive(Default)]
pub(super) struct WheelSim {
    pub duty: f32,
    pub enabled: bool,
    pub omega: f32,
    tick_accumulator: f32,
    pub ticks: u16,
}

impl WheelSim {
    fn advance(&mut self, dt: f32, counts_per_rev: f32, noise: &mut NoiseGenerator) {
        let target = if self.enabled {
            self.duty.clamp(-100.0, 100.0) * DUTY_TO_OMEGA
        } else {
            0.0
        };
        let alpha = (dt / MOTOR_TAU).min(1.0);
        self.omega += (target - self.omega) * alpha;

        // Forward rotation counts the raw 16-bit counter up
        let ticks = self.omega / TAU * counts_per_rev * dt + noise.gaussian(TICK_JITTER);
        self.tick_accumulator += ticks;
        let whole = self.tick_accumulator.trunc() as i32;
        self.tick_accumulator = self.tick_accumulator.fract();
        self.ticks = self.ticks.wrapping_add(whole as u16);
    }
}

pub(super) struct SimState {
    pub left: WheelSim,
    pub right: WheelSim,
    pub x: f32,
    pub y: f32,
    pub theta: f32,
    pub gyro_z_deg: f32,
    pub line_frame: [u32; 8],
    /// Simulated IMU self-calibration progress (status reads so far)
    pub calib_reads: u32,
    pub reads_to_full: u32,
    pub offsets: Option<crate::calibration::CalibrationOffsets>,
    /// Currently selected IMU operating mode
    pub mode: OperatingMode,
    noise: NoiseGenerator,
    wheel_radius: f32,
    track_width: f32,
    counts_per_rev: f32,
}

/// Handle to the shared simulation. Cheap to clone; every simulated
/// peripheral holds one.
#[derive(Clone)]
pub struct SimWorld {
    pub(super) state: Arc<Mutex<SimState>>,
}

impl SimWorld {
    pub fn new(cfg: &RobotConfig, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                left: WheelSim::default(),
                right: WheelSim::default(),
                x: 0.0,
                y: 0.0,
                theta: 0.0,
                gyro_z_deg: 0.0,
                line_frame: [300; 8],
                calib_reads: 0,
                reads_to_full: 3,
                offsets: None,
                mode: OperatingMode::Config,
                noise: NoiseGenerator::new(seed),
                wheel_radius: cfg.wheel_radius,
                track_width: cfg.track_width,
                counts_per_rev: cfg.counts_per_rev,
            })),
        }
    }

    /// Advance the world by `dt` seconds.
    pub fn advance(&self, dt: f32) {
        let s = &mut *self.state.lock();
        let counts_per_rev = s.counts_per_rev;
        s.left.advance(dt, counts_per_rev, &mut s.noise);
        s.right.advance(dt, counts_per_rev, &mut s.noise);

        let v = body_velocity(s.left.omega, s.right.omega, s.wheel_radius);
        let yaw = body_yaw_rate(s.left.omega, s.right.omega, s.track_width, s.wheel_radius);
        s.x += v * s.theta.cos() * dt;
        s.y += v * s.theta.sin() * dt;
        s.theta += yaw * dt;
        s.gyro_z_deg = yaw.to_degrees() + s.noise.gaussian(GYRO_NOISE);
    }

    /// Current pose: (x, y, theta) in world frame.
    pub fn pose(&self) -> (f32, f32, f32) {
        let s = self.state.lock();
        (s.x, s.y, s.theta)
    }

    /// Current wheel angular velocities (left, right) in rad/s.
    pub fn wheel_omegas(&self) -> (f32, f32) {
        let s = self.state.lock();
        (s.left.omega, s.right.omega)
    }

    /// Replace the frame the line-sensor array will report.
    pub fn set_line_frame(&self, frame: [u32; 8]) {
        self.state.lock().line_frame = frame;
    }

    /// How many status reads the simulated IMU needs before it reports
    /// fully calibrated.
    pub fn set_reads_to_full(&self, reads: u32) {
        self.state.lock().reads_to_full = reads;
    }
}
