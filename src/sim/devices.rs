//! Simulated peripherals backed by [`SimWorld`]
//!
//! Each device satisfies the same driver trait the hardware implementation
//! would, so the control stack runs unchanged against the simulation.

use super::world::SimWorld;
use crate::calibration::{CalibrationOffsets, CalibrationStatus, OFFSET_RECORD_LEN};
use crate::drivers::{EncoderCounter, ImuDriver, LineSensorArray, MotorDriver, OperatingMode};
use crate::error::Result;
use crate::tasks::WheelSide;

/// Simulated DRV8838 motor driver.
pub struct SimMotor {
    world: SimWorld,
    side: WheelSide,
}

impl SimMotor {
    pub fn new(world: SimWorld, side: WheelSide) -> Self {
        Self { world, side }
    }
}

impl MotorDriver for SimMotor {
    fn set_duty(&mut self, duty: f32) {
        let mut s = self.world.state.lock();
        match self.side {
            WheelSide::Left => s.left.duty = duty,
            WheelSide::Right => s.right.duty = duty,
        }
    }

    fn enable(&mut self) {
        let mut s = self.world.state.lock();
        match self.side {
            WheelSide::Left => s.left.enabled = true,
            WheelSide::Right => s.right.enabled = true,
        }
    }

    fn disable(&mut self) {
        let mut s = self.world.state.lock();
        match self.side {
            WheelSide::Left => s.left.enabled = false,
            WheelSide::Right => s.right.enabled = false,
        }
    }
}

/// Simulated free-running encoder counter.
pub struct SimEncoder {
    world: SimWorld,
    side: WheelSide,
}

impl SimEncoder {
    pub fn new(world: SimWorld, side: WheelSide) -> Self {
        Self { world, side }
    }
}

impl EncoderCounter for SimEncoder {
    fn count(&mut self) -> u16 {
        let s = self.world.state.lock();
        match self.side {
            WheelSide::Left => s.left.ticks,
            WheelSide::Right => s.right.ticks,
        }
    }
}

/// Simulated BNO055-class orientation sensor.
///
/// Calibration levels climb with successive status reads, standing in for
/// the figure-eight dance the real sensor needs.
pub struct SimImu {
    world: SimWorld,
}

impl SimImu {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl ImuDriver for SimImu {
    fn set_mode(&mut self, mode: OperatingMode) -> Result<()> {
        log::debug!("imu: operating mode 0x{:02X}", mode.register_value());
        self.world.state.lock().mode = mode;
        Ok(())
    }

    fn calibration_status(&mut self) -> Result<CalibrationStatus> {
        let mut s = self.world.state.lock();
        let level = if s.calib_reads >= s.reads_to_full {
            3
        } else {
            (s.calib_reads * 3 / s.reads_to_full) as u8
        };
        s.calib_reads += 1;
        Ok(CalibrationStatus {
            sys: level,
            gyr: level,
            acc: level,
            mag: level,
        })
    }

    fn euler_heading(&mut self) -> Result<f32> {
        Ok(self.world.state.lock().theta.to_degrees())
    }

    fn gyro_z(&mut self) -> Result<f32> {
        Ok(self.world.state.lock().gyro_z_deg)
    }

    fn read_offsets(&mut self) -> Result<CalibrationOffsets> {
        let mut s = self.world.state.lock();
        // Offset registers are only reachable in Config mode; switch over
        // for the access and restore the previous selection
        let prev = s.mode;
        s.mode = OperatingMode::Config;
        let offsets = s
            .offsets
            .unwrap_or(CalibrationOffsets([0x5A; OFFSET_RECORD_LEN]));
        s.mode = prev;
        Ok(offsets)
    }

    fn write_offsets(&mut self, offsets: &CalibrationOffsets) -> Result<()> {
        let mut s = self.world.state.lock();
        let prev = s.mode;
        s.mode = OperatingMode::Config;
        s.offsets = Some(*offsets);
        // Applied offsets make the sensor immediately trustworthy
        s.calib_reads = s.reads_to_full;
        s.mode = prev;
        Ok(())
    }
}

/// Simulated reflectance array; reports whatever frame the world holds.
pub struct SimLineSensor {
    world: SimWorld,
}

impl SimLineSensor {
    pub fn new(world: SimWorld) -> Self {
        Self { world }
    }
}

impl LineSensorArray for SimLineSensor {
    fn read_decays(&mut self) -> [u32; 8] {
        self.world.state.lock().line_frame
    }
}
