//! Single-slot shared values and interrupt event flags
//!
//! All inter-task communication goes through these types. Each share holds
//! exactly one value: `put` overwrites unconditionally, `get` returns the
//! last written value without blocking. There is no queueing and no
//! backpressure; a consumer tolerates reading the previous scheduler pass's
//! value depending on step order.
//!
//! Ownership discipline (by convention, not enforced by the types):
//! - each share has exactly one writer task at steady state
//! - each event flag has one producer (interrupt context) that only sets,
//!   and one consumer task that alone clears it

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Single-slot f32 share.
///
/// Uses `AtomicU32` with bit reinterpretation for lock-free access.
#[derive(Debug)]
pub struct ShareF32(AtomicU32);

impl ShareF32 {
    pub fn new(val: f32) -> Self {
        Self(AtomicU32::new(val.to_bits()))
    }

    /// Overwrite the stored value.
    pub fn put(&self, val: f32) {
        self.0.store(val.to_bits(), Ordering::Release);
    }

    /// Read the most recently written value (never blocks).
    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }
}

impl Default for ShareF32 {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Single-slot boolean share.
#[derive(Debug, Default)]
pub struct ShareBool(AtomicBool);

impl ShareBool {
    pub fn put(&self, val: bool) {
        self.0.store(val, Ordering::Release);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Event flag set asynchronously by an interrupt handler.
///
/// The producer only ever calls `raise`; the single consuming task calls
/// `take` (read-and-clear) or `clear`.
#[derive(Debug, Default)]
pub struct EventFlag(AtomicBool);

impl EventFlag {
    /// Set the flag. Called from interrupt context.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Read and clear the flag in one operation.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    /// Clear without consuming.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Peek without clearing. Intended for status reporting only.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// All shares and event flags used by the control stack.
///
/// Writers at steady state:
/// - `velocity_setpoint`, `yaw_setpoint`: planner (startup), navigator (driving)
/// - `control_enable`: planner (startup), navigator (maneuver sequencing)
/// - `omega_left_setpoint`, `omega_right_setpoint`: body controller
/// - `omega_left_actual`, `omega_right_actual`: wheel controllers
/// - `right_position`: right wheel controller (cumulative encoder counts)
/// - `heading`: body controller (IMU Euler heading, degrees)
/// - `calibrated`: planner
/// - `button_pressed`, `bump_detected`: interrupt context only
#[derive(Debug, Default)]
pub struct SignalBus {
    pub velocity_setpoint: ShareF32,
    pub yaw_setpoint: ShareF32,
    pub omega_left_setpoint: ShareF32,
    pub omega_right_setpoint: ShareF32,
    pub omega_left_actual: ShareF32,
    pub omega_right_actual: ShareF32,
    pub right_position: ShareF32,
    pub heading: ShareF32,
    pub control_enable: ShareBool,
    pub calibrated: ShareBool,
    pub button_pressed: EventFlag,
    pub bump_detected: EventFlag,
}

impl SignalBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_defaults_before_first_write() {
        let bus = SignalBus::new();
        assert_eq!(bus.velocity_setpoint.get(), 0.0);
        assert!(!bus.control_enable.get());
    }

    #[test]
    fn share_overwrites() {
        let s = ShareF32::default();
        s.put(1.5);
        s.put(-2.25);
        assert_eq!(s.get(), -2.25);
        // get does not consume
        assert_eq!(s.get(), -2.25);
    }

    #[test]
    fn event_flag_take_clears() {
        let f = EventFlag::default();
        assert!(!f.take());
        f.raise();
        assert!(f.take());
        assert!(!f.take());
    }

    #[test]
    fn event_flag_raise_is_sticky_until_taken() {
        let f = EventFlag::default();
        f.raise();
        f.raise();
        assert!(f.is_raised());
        assert!(f.take());
        assert!(!f.is_raised());
    }
}
