//! Cooperative control tasks
//!
//! Each task is a finite-state machine exposing one short, non-blocking
//! `step`. The scheduler invokes steps in priority order; tasks never block
//! on I/O or each other, and exchange data only through the
//! [`crate::signals::SignalBus`].

mod body;
mod navigator;
mod planner;
mod wheel;

pub use body::BodyController;
pub use navigator::Navigator;
pub use planner::MissionPlanner;
pub use wheel::{WheelController, WheelSide};

use crate::error::Result;

/// One cooperatively scheduled task.
pub trait Task: Send {
    /// Task name for logs and error reporting.
    fn name(&self) -> &'static str;

    /// Run one non-blocking step. `now_us` is monotonic microseconds
    /// supplied by the dispatcher.
    fn step(&mut self, now_us: u64) -> Result<()>;

    /// Force the task into a safe state. Called by the scheduler after any
    /// task surfaces a fatal error, before the error propagates; motor
    /// owners must zero their duty and disable the driver stage here.
    fn halt(&mut self) {}
}
