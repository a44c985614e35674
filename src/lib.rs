//! Control stack for a Romi-class differential-drive robot
//!
//! Cooperatively scheduled control tasks (mission planner, driving-mode
//! navigator, body velocity/yaw controller, per-wheel speed controllers)
//! exchange data through lock-free single-slot shares and run against
//! hardware driver traits. The `sim` module provides hardware-free
//! implementations of every peripheral for tests and demo runs.

pub mod calibration;
pub mod config;
pub mod drivers;
pub mod encoder;
pub mod error;
pub mod kinematics;
pub mod line;
pub mod scheduler;
pub mod signals;
pub mod sim;
pub mod tasks;

// Re-export commonly used types
pub use config::RobotConfig;
pub use error::{Error, Result};
pub use scheduler::Scheduler;
pub use signals::SignalBus;
