//! Body velocity/yaw controller
//!
//! Converts the requested linear velocity and yaw rate into per-wheel
//! angular-velocity setpoints. Linear velocity feedback comes from the
//! wheels' published actual speeds; yaw feedback comes from the IMU gyro.
//! Also publishes the IMU Euler heading each step so the navigator never
//! touches the sensor itself.

use super::Task;
use crate::config::RobotConfig;
use crate::drivers::SharedImu;
use crate::error::Result;
use crate::kinematics::{body_velocity, wheel_setpoints, DEG_TO_RAD};
use crate::signals::SignalBus;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BodyState {
    Off,
    Active,
}

/// PI controller over body velocity and yaw rate.
pub struct BodyController {
    state: BodyState,
    bus: Arc<SignalBus>,
    imu: SharedImu,
    track_width: f32,
    wheel_radius: f32,
    kp_v: f32,
    ki_v: f32,
    kp_yaw: f32,
    ki_yaw: f32,
    v_err_sum: f32,
    yaw_err_sum: f32,
    time_old_us: u64,
}

impl BodyController {
    pub fn new(bus: Arc<SignalBus>, imu: SharedImu, cfg: &RobotConfig) -> Self {
        Self {
            state: BodyState::Off,
            bus,
            imu,
            track_width: cfg.track_width,
            wheel_radius: cfg.wheel_radius,
            kp_v: cfg.body_gains.kp_v,
            ki_v: cfg.body_gains.ki_v,
            kp_yaw: cfg.body_gains.kp_yaw,
            ki_yaw: cfg.body_gains.ki_yaw,
            v_err_sum: 0.0,
            yaw_err_sum: 0.0,
            time_old_us: 0,
        }
    }

    fn publish_heading(&mut self) -> Result<()> {
        let heading = self.imu.lock().euler_heading()?;
        self.bus.heading.put(heading);
        Ok(())
    }
}

impl Task for BodyController {
    fn name(&self) -> &'static str {
        "body_control"
    }

    fn step(&mut self, now_us: u64) -> Result<()> {
        let enabled = self.bus.control_enable.get();

        // Heading is published in both states: the navigator captures its
        // reference heading before control is first enabled.
        self.publish_heading()?;

        match self.state {
            BodyState::Off => {
                // Keep the dt baseline current while off
                self.time_old_us = now_us;
                if enabled {
                    self.state = BodyState::Active;
                    log::debug!("body_control: enabled");
                }
            }
            BodyState::Active => {
                let v_ref = self.bus.velocity_setpoint.get();
                let yaw_ref = self.bus.yaw_setpoint.get();
                let omega_left = self.bus.omega_left_actual.get();
                let omega_right = self.bus.omega_right_actual.get();

                let dt = now_us.saturating_sub(self.time_old_us) as f32 / 1_000_000.0;
                self.time_old_us = now_us;

                let v_act = body_velocity(omega_left, omega_right, self.wheel_radius);
                let yaw_act = self.imu.lock().gyro_z()? * DEG_TO_RAD;

                let v_err = v_ref - v_act;
                let yaw_err = yaw_ref - yaw_act;
                self.v_err_sum += v_err * dt;
                self.yaw_err_sum += yaw_err * dt;

                let v_request = self.kp_v * v_err + self.ki_v * self.v_err_sum;
                let yaw_request = self.kp_yaw * yaw_err + self.ki_yaw * self.yaw_err_sum;

                let (omega_left_req, omega_right_req) =
                    wheel_setpoints(v_request, yaw_request, self.track_width, self.wheel_radius);
                self.bus.omega_left_setpoint.put(omega_left_req);
                self.bus.omega_right_setpoint.put(omega_right_req);

                if !enabled {
                    self.v_err_sum = 0.0;
                    self.yaw_err_sum = 0.0;
                    self.state = BodyState::Off;
                    log::debug!("body_control: disabled");
                }
            }
        }
        Ok(())
    }
}
