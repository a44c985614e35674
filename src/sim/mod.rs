//! Hardware-free simulation of the robot and its peripherals
//!
//! Used by the demo binary and the integration tests. The [`SimWorld`]
//! integrates motor, encoder, and pose physics; the device types in
//! [`devices`] expose it through the same traits the hardware drivers
//! implement.

mod devices;
mod noise;
mod world;

pub use devices::{SimEncoder, SimImu, SimLineSensor, SimMotor};
pub use noise::NoiseGenerator;
pub use world::SimWorld;
