//! Hardware driver traits
//!
//! Narrow interfaces over the peripherals the control stack consumes. Real
//! implementations talk to the motor driver stage, the BNO055-class
//! orientation sensor, the encoder timers, and the reflectance array; the
//! [`crate::sim`] module provides hardware-free implementations of all of
//! them for tests and demo runs.
//!
//! Each peripheral is owned by exactly one task. The orientation sensor is
//! the one exception: the planner (calibration registers) and the body
//! controller (gyro/Euler registers) share it behind a mutex that is locked
//! only for single register reads inside a step.

use crate::calibration::{CalibrationOffsets, CalibrationStatus};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

pub use crate::encoder::EncoderCounter;
pub use crate::line::LineSensorArray;

/// DRV8838-class motor driver: signed duty percent plus an enable gate.
pub trait MotorDriver: Send {
    /// Set the duty cycle in percent. Sign selects direction; magnitude
    /// beyond 100 saturates at the driver stage.
    fn set_duty(&mut self, duty: f32);

    /// Enable the driver stage.
    fn enable(&mut self);

    /// Disable the driver stage. The motor ignores duty while disabled.
    fn disable(&mut self);
}

/// Orientation sensor operating modes. Offset registers are only accessible
/// in `Config` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatingMode {
    Config,
    ImuPlus,
    Compass,
    M4g,
    NdofFmcOff,
    Ndof,
}

impl OperatingMode {
    /// Register value for the operating-mode register.
    pub fn register_value(self) -> u8 {
        match self {
            OperatingMode::Config => 0x00,
            OperatingMode::ImuPlus => 0x08,
            OperatingMode::Compass => 0x09,
            OperatingMode::M4g => 0x0A,
            OperatingMode::NdofFmcOff => 0x0B,
            OperatingMode::Ndof => 0x0C,
        }
    }
}

/// BNO055-class fused orientation sensor.
pub trait ImuDriver: Send {
    /// Select the operating mode.
    fn set_mode(&mut self, mode: OperatingMode) -> Result<()>;

    /// Read the packed calibration status levels.
    fn calibration_status(&mut self) -> Result<CalibrationStatus>;

    /// Euler heading in degrees.
    fn euler_heading(&mut self) -> Result<f32>;

    /// Yaw rate in degrees per second.
    fn gyro_z(&mut self) -> Result<f32>;

    /// Read the calibration offset registers. Implementations switch to
    /// `Config` mode for the access and restore the previous mode.
    fn read_offsets(&mut self) -> Result<CalibrationOffsets>;

    /// Write the calibration offset registers, same mode discipline.
    fn write_offsets(&mut self, offsets: &CalibrationOffsets) -> Result<()>;
}

/// Shared handle to the one orientation sensor.
pub type SharedImu = Arc<Mutex<Box<dyn ImuDriver>>>;

/// Wrap an IMU driver for sharing between the planner and body controller.
pub fn share_imu(imu: Box<dyn ImuDriver>) -> SharedImu {
    Arc::new(Mutex::new(imu))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_register_values() {
        assert_eq!(OperatingMode::Config.register_value(), 0x00);
        assert_eq!(OperatingMode::Ndof.register_value(), 0x0C);
        assert_eq!(OperatingMode::NdofFmcOff.register_value(), 0x0B);
    }
}
