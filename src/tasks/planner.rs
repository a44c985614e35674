//! Mission planner
//!
//! Top-level state machine gating the whole control stack: holds the robot
//! in calibration until the IMU is trustworthy, then arms on the user
//! button. A button press while uncalibrated is never consumed, so control
//! can only ever be enabled after calibration completes.

use super::Task;
use crate::calibration;
use crate::config::RobotConfig;
use crate::drivers::SharedImu;
use crate::error::Result;
use crate::signals::SignalBus;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlannerState {
    Init,
    WaitForStart,
    Calibration,
}

/// Mission planner task.
pub struct MissionPlanner {
    state: PlannerState,
    bus: Arc<SignalBus>,
    imu: SharedImu,
    cfg: RobotConfig,
    calibrated: bool,
    last_status_log: Option<(u8, u8, u8, u8)>,
}

impl MissionPlanner {
    pub fn new(bus: Arc<SignalBus>, imu: SharedImu, cfg: RobotConfig) -> Self {
        Self {
            state: PlannerState::Init,
            bus,
            imu,
            cfg,
            calibrated: false,
            last_status_log: None,
        }
    }

    fn mark_calibrated(&mut self) {
        self.calibrated = true;
        self.bus.calibrated.put(true);
    }

    /// One calibration pass: apply a persisted record if present, otherwise
    /// poll the live status levels. A present-but-unusable record is fatal.
    fn calibration_pass(&mut self) -> Result<()> {
        match calibration::load_offsets(&self.cfg.calibration_file)? {
            Some(offsets) => {
                self.imu.lock().write_offsets(&offsets)?;
                self.mark_calibrated();
                log::info!(
                    "Applied calibration record from {}",
                    self.cfg.calibration_file
                );
            }
            None => {
                let status = self.imu.lock().calibration_status()?;
                let levels = (status.sys, status.gyr, status.acc, status.mag);
                if self.last_status_log != Some(levels) {
                    log::info!(
                        "Calibration levels: sys={} gyr={} acc={} mag={}",
                        status.sys,
                        status.gyr,
                        status.acc,
                        status.mag
                    );
                    self.last_status_log = Some(levels);
                }
                if status.is_fully_calibrated() {
                    self.mark_calibrated();
                    log::info!("IMU calibrated");
                    self.persist_offsets();
                }
            }
        }
        Ok(())
    }

    /// Save the live-calibration result so the next boot can skip the dance.
    /// Persistence failure here is logged, not fatal: the session is already
    /// calibrated.
    fn persist_offsets(&mut self) {
        let offsets = match self.imu.lock().read_offsets() {
            Ok(offsets) => offsets,
            Err(e) => {
                log::warn!("Could not read calibration offsets: {e}");
                return;
            }
        };
        match calibration::store_offsets(&self.cfg.calibration_file, &offsets) {
            Ok(()) => log::info!("Calibration record saved to {}", self.cfg.calibration_file),
            Err(e) => log::warn!("Could not save calibration record: {e}"),
        }
    }
}

impl Task for MissionPlanner {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn step(&mut self, _now_us: u64) -> Result<()> {
        match self.state {
            PlannerState::Init => {
                if self.calibrated {
                    log::info!("Press the user button to begin driving");
                    self.state = PlannerState::WaitForStart;
                } else {
                    self.state = PlannerState::Calibration;
                }
            }
            PlannerState::WaitForStart => {
                if self.bus.button_pressed.take() {
                    self.bus.velocity_setpoint.put(self.cfg.nominal_velocity);
                    self.bus.yaw_setpoint.put(0.0);
                    self.bus.control_enable.put(true);
                    log::info!("Button pressed: control enabled");
                }
            }
            PlannerState::Calibration => {
                self.calibration_pass()?;
                self.state = PlannerState::Init;
            }
        }
        Ok(())
    }
}
