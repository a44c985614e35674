//! Per-wheel speed controller
//!
//! Converts a requested wheel angular velocity into a motor duty cycle with
//! PI control on the encoder-measured speed. One instance runs per wheel.
//! The right instance additionally publishes its cumulative encoder position
//! for the navigator's distance thresholds.

use super::Task;
use crate::config::RobotConfig;
use crate::drivers::MotorDriver;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::kinematics::encoder_speed_to_omega;
use crate::signals::SignalBus;
use std::sync::Arc;

/// Which wheel this controller drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WheelSide {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WheelState {
    Off,
    Active,
}

/// PI wheel-speed controller task.
pub struct WheelController {
    side: WheelSide,
    state: WheelState,
    motor: Box<dyn MotorDriver>,
    encoder: Encoder,
    bus: Arc<SignalBus>,
    counts_per_rev: f32,
    kp: f32,
    ki: f32,
    err_sum: f32,
}

impl WheelController {
    pub fn new(
        side: WheelSide,
        motor: Box<dyn MotorDriver>,
        encoder: Encoder,
        bus: Arc<SignalBus>,
        cfg: &RobotConfig,
    ) -> Self {
        let mut controller = Self {
            side,
            state: WheelState::Off,
            motor,
            encoder,
            bus,
            counts_per_rev: cfg.counts_per_rev,
            kp: cfg.wheel_gains.kp,
            ki: cfg.wheel_gains.ki,
            err_sum: 0.0,
        };
        controller.motor.disable();
        controller
    }

    fn setpoint(&self) -> f32 {
        match self.side {
            WheelSide::Left => self.bus.omega_left_setpoint.get(),
            WheelSide::Right => self.bus.omega_right_setpoint.get(),
        }
    }

    fn publish_actual(&self, omega: f32) {
        match self.side {
            WheelSide::Left => self.bus.omega_left_actual.put(omega),
            WheelSide::Right => self.bus.omega_right_actual.put(omega),
        }
    }

    /// The navigator rebases against this share instead of touching the
    /// encoder, which stays exclusively owned here.
    fn publish_position(&self) {
        if self.side == WheelSide::Right {
            self.bus.right_position.put(self.encoder.position() as f32);
        }
    }

    /// Transition to `Off`: duty zeroed, driver disabled, integral cleared.
    /// Idempotent, so a repeated disable changes nothing.
    fn disable_motor(&mut self) {
        self.motor.set_duty(0.0);
        self.motor.disable();
        self.err_sum = 0.0;
        self.state = WheelState::Off;
    }
}

impl Task for WheelController {
    fn name(&self) -> &'static str {
        match self.side {
            WheelSide::Left => "wheel_left",
            WheelSide::Right => "wheel_right",
        }
    }

    fn step(&mut self, now_us: u64) -> Result<()> {
        let enabled = self.bus.control_enable.get();

        match self.state {
            WheelState::Off => {
                // Keep the delta/time baseline current while off
                self.encoder.update(now_us);
                self.publish_position();
                if enabled {
                    self.motor.set_duty(0.0);
                    self.motor.enable();
                    self.state = WheelState::Active;
                    log::debug!("{}: enabled", self.name());
                }
            }
            WheelState::Active => {
                let omega_ref = self.setpoint();

                self.encoder.update(now_us);
                self.publish_position();
                let dt = self.encoder.dt_us() as f32 / 1_000_000.0;

                let omega_act = encoder_speed_to_omega(self.encoder.speed(), self.counts_per_rev);
                self.publish_actual(omega_act);

                let err = omega_ref - omega_act;
                self.err_sum += err * dt;
                let duty = self.kp * err + self.ki * self.err_sum;
                self.motor.set_duty(duty);

                if !enabled {
                    self.disable_motor();
                    log::debug!("{}: disabled", self.name());
                }
            }
        }
        Ok(())
    }

    fn halt(&mut self) {
        self.disable_motor();
    }
}
