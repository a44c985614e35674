//! Driving-mode navigator
//!
//! The mission-level state machine: leave the start box, follow the painted
//! line, recover around an obstacle after a bump, turn around on the dark
//! target, and drive the return leg back to the start.
//!
//! Every motion segment is bounded by absolute encoder displacement since
//! the last rebase, never wall-clock time, so the sequencing is insensitive
//! to how fast the speed controllers converge. The navigator never touches
//! a peripheral the wheel tasks own: it reads the right wheel's published
//! cumulative position and keeps a private baseline ("zeroing" the encoder
//! means rebasing against the share).

use super::Task;
use crate::config::RobotConfig;
use crate::error::{Error, Result};
use crate::kinematics::MotionThresholds;
use crate::line::LinePosition;
use crate::signals::SignalBus;
use std::f32::consts::PI;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NavState {
    /// Waiting for control-enable
    Idle,
    /// Driving straight out of the start box
    LeaveStart,
    /// Steering from the line-position reading
    LineFollow,
    /// Seven-segment square detour around the obstacle
    ObstacleRecovery,
    /// Forward, rotate to the captured heading, reverse
    TurnAround,
    /// Reversing until the dark target is found again
    SeekLine,
    /// Back up and aim the 90-degree return turn
    Align,
    /// Executing the return turn back to the start
    ReturnTurn,
}

/// Driving-mode navigator task.
pub struct Navigator {
    state: NavState,
    bus: Arc<SignalBus>,
    line: LinePosition,
    thresholds: MotionThresholds,
    nominal_velocity: f32,
    line_scale: f32,
    /// Right wheel position at the last rebase
    baseline: f32,
    /// Heading captured when control was first enabled (degrees)
    start_heading: f32,
    /// Set once an obstacle recovery has completed; arms the turn-around
    /// on the next full-black detection
    after_wall: bool,
    /// Sub-step 1-7 within ObstacleRecovery
    recovery_step: u8,
    /// Sub-step 1-3 within TurnAround
    turn_step: u8,
}

impl Navigator {
    pub fn new(bus: Arc<SignalBus>, line: LinePosition, cfg: &RobotConfig) -> Self {
        Self {
            state: NavState::Idle,
            bus,
            line,
            thresholds: MotionThresholds::from_config(cfg),
            nominal_velocity: cfg.nominal_velocity,
            line_scale: cfg.line_scale,
            baseline: 0.0,
            start_heading: 0.0,
            after_wall: false,
            recovery_step: 0,
            turn_step: 0,
        }
    }

    /// Absolute encoder displacement since the last rebase.
    fn displacement(&self) -> f32 {
        (self.bus.right_position.get() - self.baseline).abs()
    }

    /// Take the current position as the new zero reference.
    fn rebase(&mut self) {
        self.baseline = self.bus.right_position.get();
    }

    /// Command a motion segment and enable control.
    fn command(&self, velocity: f32, yaw: f32) {
        self.bus.velocity_setpoint.put(velocity);
        self.bus.yaw_setpoint.put(yaw);
        self.bus.control_enable.put(true);
    }

    /// End the current segment: stop control and rebase.
    fn end_segment(&mut self) {
        self.bus.control_enable.put(false);
        self.rebase();
    }

    fn transition(&mut self, next: NavState) {
        log::debug!("navigator: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn step_idle(&mut self) {
        // Spurious bumps before calibration are discarded; bump handling is
        // armed only once a mission can actually start
        if !self.bus.calibrated.get() {
            self.bus.bump_detected.clear();
        }
        if self.bus.control_enable.get() {
            self.start_heading = self.bus.heading.get();
            self.rebase();
            self.transition(NavState::LeaveStart);
        }
    }

    fn step_line_follow(&mut self) {
        if self.bus.bump_detected.take() {
            log::info!("Bump detected, starting obstacle recovery");
            self.bus.control_enable.put(false);
            self.rebase();
            self.recovery_step = 1;
            self.transition(NavState::ObstacleRecovery);
            return;
        }

        let reading = self.line.read();
        if self.after_wall && reading.full_black {
            // Crossed the dark target after the wall: begin the turn-around
            self.command(self.nominal_velocity, 0.0);
            self.rebase();
            self.after_wall = false;
            self.turn_step = 1;
            self.transition(NavState::TurnAround);
        } else if reading.full_black {
            // Uniform dark under every channel carries no steering
            // information; hold course rather than chase a ghost offset
            self.bus.yaw_setpoint.put(0.0);
        } else {
            self.bus.yaw_setpoint.put(reading.position / self.line_scale);
        }
    }

    /// Fixed seven-segment choreography: back away, two 90-degree-class
    /// turns and straight legs squaring around the obstacle, then rejoin
    /// the line. Bump events are not consulted here; a second bump cannot
    /// perturb the sub-step index.
    fn step_recovery(&mut self) -> Result<()> {
        let t = self.thresholds;
        let v = self.nominal_velocity;
        let position = self.displacement();

        match self.recovery_step {
            1 => {
                // Back away from the obstacle
                self.command(-v, 0.0);
                if position > t.drive_3in / 2.0 {
                    self.end_segment();
                    self.recovery_step = 2;
                }
            }
            2 | 4 => {
                let turn_rate = if self.recovery_step == 2 {
                    -PI / 2.0
                } else {
                    PI / 2.0
                };
                self.command(0.0, turn_rate);
                if position > t.turn_90 {
                    self.end_segment();
                    self.recovery_step += 1;
                }
            }
            3 => {
                self.command(v, 0.0);
                if position > t.drive_3in * 3.0 {
                    self.end_segment();
                    self.recovery_step = 4;
                }
            }
            5 => {
                self.command(v, 0.0);
                if position > t.drive_3in * 6.0 {
                    self.end_segment();
                    self.recovery_step = 6;
                }
            }
            6 => {
                // Slightly under 90 degrees aims the rejoin leg at the line
                self.command(0.0, PI / 2.0);
                if position > t.turn_90 * 0.65 {
                    self.end_segment();
                    self.recovery_step = 7;
                }
            }
            7 => {
                self.command(v, 0.0);
                if position > t.drive_3in * 4.0 {
                    // Control stays on: the robot rolls straight back onto
                    // the line and resumes following it
                    self.rebase();
                    self.recovery_step = 0;
                    self.bus.bump_detected.clear();
                    self.after_wall = true;
                    log::info!("Obstacle recovery complete");
                    self.transition(NavState::LineFollow);
                }
            }
            step => {
                return Err(Error::InvalidState {
                    task: "navigator",
                    state: step,
                });
            }
        }
        Ok(())
    }

    fn step_turn_around(&mut self) -> Result<()> {
        let t = self.thresholds;
        let position = self.displacement();

        match self.turn_step {
            1 => {
                // Carry on past the target edge before rotating
                self.bus.control_enable.put(true);
                if position > t.drive_3in * 2.0 {
                    self.bus.velocity_setpoint.put(0.0);
                    self.bus.yaw_setpoint.put(PI / 4.0);
                    self.end_segment();
                    self.turn_step = 2;
                }
            }
            2 => {
                // Rotate in place until the heading recovers the reference
                // captured at mission start, within one degree
                self.bus.control_enable.put(true);
                if self.bus.heading.get() > self.start_heading - 1.0 {
                    self.bus.velocity_setpoint.put(-self.nominal_velocity);
                    self.bus.yaw_setpoint.put(0.0);
                    self.end_segment();
                    self.turn_step = 3;
                }
            }
            3 => {
                self.bus.control_enable.put(true);
                if position > t.drive_3in * 3.0 {
                    self.turn_step = 0;
                    self.rebase();
                    self.transition(NavState::SeekLine);
                }
            }
            step => {
                return Err(Error::InvalidState {
                    task: "navigator",
                    state: step,
                });
            }
        }
        Ok(())
    }

    fn step_seek_line(&mut self) {
        // Still reversing from the turn-around; watch for the dark target
        let reading = self.line.read();
        if reading.full_black {
            self.rebase();
            self.transition(NavState::Align);
        }
    }

    fn step_align(&mut self) {
        if self.displacement() > self.thresholds.drive_3in * 1.5 {
            self.bus.velocity_setpoint.put(0.0);
            self.bus.yaw_setpoint.put(PI / 2.0);
            self.end_segment();
            self.transition(NavState::ReturnTurn);
        }
    }

    fn step_return_turn(&mut self) {
        self.bus.control_enable.put(true);
        if self.displacement() > self.thresholds.turn_90 * 2.0 {
            self.end_segment();
            self.transition(NavState::Idle);
        }
    }
}

impl Task for Navigator {
    fn name(&self) -> &'static str {
        "navigator"
    }

    fn step(&mut self, _now_us: u64) -> Result<()> {
        match self.state {
            NavState::Idle => self.step_idle(),
            NavState::LeaveStart => {
                if self.displacement() > self.thresholds.drive_3in * 2.0 {
                    self.transition(NavState::LineFollow);
                }
            }
            NavState::LineFollow => self.step_line_follow(),
            NavState::ObstacleRecovery => self.step_recovery()?,
            NavState::TurnAround => self.step_turn_around()?,
            NavState::SeekLine => self.step_seek_line(),
            NavState::Align => self.step_align(),
            NavState::ReturnTurn => self.step_return_turn(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{LineSensorArray, DECAY_TIMEOUT_US};
    use parking_lot::Mutex;

    /// Line array whose next frame the test can swap at will
    #[derive(Clone)]
    struct SharedFrame(Arc<Mutex<[u32; 8]>>);

    impl SharedFrame {
        fn new(frame: [u32; 8]) -> Self {
            Self(Arc::new(Mutex::new(frame)))
        }
        fn set(&self, frame: [u32; 8]) {
            *self.0.lock() = frame;
        }
    }

    struct FrameArray(SharedFrame);

    impl LineSensorArray for FrameArray {
        fn read_decays(&mut self) -> [u32; 8] {
            *self.0 .0.lock()
        }
    }

    const ON_LINE: [u32; 8] = [300, 300, 300, 300, 300, 300, 300, 300];
    const FULL_BLACK: [u32; 8] = [DECAY_TIMEOUT_US; 8];

    fn build(frame: [u32; 8]) -> (Navigator, Arc<SignalBus>, SharedFrame) {
        let cfg = RobotConfig::default();
        let bus = SignalBus::new();
        let shared = SharedFrame::new(frame);
        let line = LinePosition::new(Box::new(FrameArray(shared.clone())));
        let nav = Navigator::new(Arc::clone(&bus), line, &cfg);
        (nav, bus, shared)
    }

    fn drive_to_line_follow(nav: &mut Navigator, bus: &SignalBus) {
        bus.calibrated.put(true);
        bus.control_enable.put(true);
        bus.heading.put(90.0);
        nav.step(0).unwrap(); // Idle -> LeaveStart
        assert_eq!(nav.state, NavState::LeaveStart);
        bus.right_position.put(nav.thresholds.drive_3in * 2.0 + 1.0);
        nav.step(1).unwrap();
        assert_eq!(nav.state, NavState::LineFollow);
    }

    #[test]
    fn idle_waits_for_enable_and_captures_heading() {
        let (mut nav, bus, _) = build(ON_LINE);
        bus.calibrated.put(true);
        bus.heading.put(42.0);
        nav.step(0).unwrap();
        assert_eq!(nav.state, NavState::Idle);

        bus.control_enable.put(true);
        nav.step(1).unwrap();
        assert_eq!(nav.state, NavState::LeaveStart);
        assert_eq!(nav.start_heading, 42.0);
    }

    #[test]
    fn idle_discards_bumps_while_uncalibrated() {
        let (mut nav, bus, _) = build(ON_LINE);
        bus.bump_detected.raise();
        nav.step(0).unwrap();
        assert!(!bus.bump_detected.is_raised());
    }

    #[test]
    fn line_follow_steers_from_scaled_reading() {
        let (mut nav, bus, frame) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);

        // Offset frame: left-edge channel saturated
        let mut offset = ON_LINE;
        offset[6] = 2000;
        frame.set(offset);
        nav.step(2).unwrap();
        let expected = (300.0 * (-1.4 + 1.4 - 2.4 + 2.4 - 3.75 + 3.75 + 5.0) + 2000.0 * -5.0)
            / 1500.0;
        assert!((bus.yaw_setpoint.get() - expected).abs() < 1e-3);
    }

    #[test]
    fn line_follow_holds_course_on_full_black_before_wall() {
        let (mut nav, bus, frame) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        frame.set(FULL_BLACK);
        nav.step(2).unwrap();
        // No wall bumped yet: full black must not trigger the turn-around
        assert_eq!(nav.state, NavState::LineFollow);
        assert_eq!(bus.yaw_setpoint.get(), 0.0);
    }

    #[test]
    fn bump_starts_recovery_and_cuts_control() {
        let (mut nav, bus, _) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);

        bus.bump_detected.raise();
        nav.step(2).unwrap();
        assert_eq!(nav.state, NavState::ObstacleRecovery);
        assert_eq!(nav.recovery_step, 1);
        assert!(!bus.control_enable.get());
    }

    /// Walk the full seven-segment recovery by advancing the position share
    /// past each threshold.
    fn run_recovery(nav: &mut Navigator, bus: &SignalBus) {
        let t = nav.thresholds;
        let segments = [
            t.drive_3in / 2.0,
            t.turn_90,
            t.drive_3in * 3.0,
            t.turn_90,
            t.drive_3in * 6.0,
            t.turn_90 * 0.65,
            t.drive_3in * 4.0,
        ];
        let mut now = 100;
        for threshold in segments {
            // Segment begins: setpoints commanded, control on
            nav.step(now).unwrap();
            assert!(bus.control_enable.get());
            // Cross the threshold
            bus.right_position.put(bus.right_position.get() + threshold + 1.0);
            nav.step(now + 1).unwrap();
            now += 2;
        }
    }

    #[test]
    fn recovery_runs_all_seven_segments_and_rejoins_line() {
        let (mut nav, bus, _) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();

        run_recovery(&mut nav, &bus);
        assert_eq!(nav.state, NavState::LineFollow);
        assert!(nav.after_wall);
        assert_eq!(nav.recovery_step, 0);
        // Control left on for the rejoin leg
        assert!(bus.control_enable.get());
        assert!(!bus.bump_detected.is_raised());
    }

    #[test]
    fn recovery_turn_directions_alternate() {
        let (mut nav, bus, _) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();

        let t = nav.thresholds;
        // Segment 1: reverse
        nav.step(3).unwrap();
        assert_eq!(bus.velocity_setpoint.get(), -0.10);
        bus.right_position.put(bus.right_position.get() + t.drive_3in / 2.0 + 1.0);
        nav.step(4).unwrap();

        // Segment 2: clockwise quarter turn
        nav.step(5).unwrap();
        assert_eq!(bus.velocity_setpoint.get(), 0.0);
        assert!((bus.yaw_setpoint.get() + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn second_bump_mid_recovery_does_not_perturb_substep() {
        let (mut nav, bus, _) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();

        // Advance into segment 3
        let t = nav.thresholds;
        nav.step(3).unwrap();
        bus.right_position.put(bus.right_position.get() + t.drive_3in / 2.0 + 1.0);
        nav.step(4).unwrap();
        nav.step(5).unwrap();
        bus.right_position.put(bus.right_position.get() + t.turn_90 + 1.0);
        nav.step(6).unwrap();
        assert_eq!(nav.recovery_step, 3);

        // Second bump fires mid-sequence: only LineFollow consults the flag
        bus.bump_detected.raise();
        nav.step(7).unwrap();
        nav.step(8).unwrap();
        assert_eq!(nav.state, NavState::ObstacleRecovery);
        assert_eq!(nav.recovery_step, 3);
        // The recovery completion clears the stale flag before rejoining
    }

    #[test]
    fn full_black_after_wall_starts_turn_around() {
        let (mut nav, bus, frame) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();
        run_recovery(&mut nav, &bus);
        assert!(nav.after_wall);

        frame.set(FULL_BLACK);
        nav.step(100).unwrap();
        assert_eq!(nav.state, NavState::TurnAround);
        assert_eq!(nav.turn_step, 1);
        assert_eq!(bus.velocity_setpoint.get(), 0.10);
        assert_eq!(bus.yaw_setpoint.get(), 0.0);
        assert!(!nav.after_wall);
    }

    #[test]
    fn turn_around_waits_for_heading_recovery() {
        let (mut nav, bus, frame) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();
        run_recovery(&mut nav, &bus);
        frame.set(FULL_BLACK);
        nav.step(100).unwrap();

        let t = nav.thresholds;
        // Sub-step 1: forward past the edge
        nav.step(101).unwrap();
        bus.right_position.put(bus.right_position.get() + t.drive_3in * 2.0 + 1.0);
        nav.step(102).unwrap();
        assert_eq!(nav.turn_step, 2);
        assert!((bus.yaw_setpoint.get() - PI / 4.0).abs() < 1e-6);

        // Sub-step 2: heading still short of the reference, keeps rotating
        bus.heading.put(nav.start_heading - 20.0);
        nav.step(103).unwrap();
        assert_eq!(nav.turn_step, 2);

        // Heading recovers to within a degree: reverse leg commanded
        bus.heading.put(nav.start_heading - 0.5);
        nav.step(104).unwrap();
        assert_eq!(nav.turn_step, 3);
        assert_eq!(bus.velocity_setpoint.get(), -0.10);

        // Sub-step 3: reverse the fixed distance, then seek the line
        nav.step(105).unwrap();
        bus.right_position.put(bus.right_position.get() + t.drive_3in * 3.0 + 1.0);
        nav.step(106).unwrap();
        assert_eq!(nav.state, NavState::SeekLine);
    }

    #[test]
    fn seek_align_return_completes_to_idle() {
        let (mut nav, bus, frame) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();
        run_recovery(&mut nav, &bus);
        frame.set(FULL_BLACK);
        nav.step(100).unwrap();

        let t = nav.thresholds;
        nav.step(101).unwrap();
        bus.right_position.put(bus.right_position.get() + t.drive_3in * 2.0 + 1.0);
        nav.step(102).unwrap();
        bus.heading.put(nav.start_heading);
        nav.step(103).unwrap();
        nav.step(104).unwrap();
        bus.right_position.put(bus.right_position.get() + t.drive_3in * 3.0 + 1.0);
        nav.step(105).unwrap();
        assert_eq!(nav.state, NavState::SeekLine);

        // Reversing over bright floor, then the dark target appears
        frame.set(ON_LINE);
        nav.step(106).unwrap();
        assert_eq!(nav.state, NavState::SeekLine);
        frame.set(FULL_BLACK);
        nav.step(107).unwrap();
        assert_eq!(nav.state, NavState::Align);

        bus.right_position.put(bus.right_position.get() + t.drive_3in * 1.5 + 1.0);
        nav.step(108).unwrap();
        assert_eq!(nav.state, NavState::ReturnTurn);
        assert!((bus.yaw_setpoint.get() - PI / 2.0).abs() < 1e-6);
        assert!(!bus.control_enable.get());

        nav.step(109).unwrap();
        assert!(bus.control_enable.get());
        bus.right_position.put(bus.right_position.get() + t.turn_90 * 2.0 + 1.0);
        nav.step(110).unwrap();
        assert_eq!(nav.state, NavState::Idle);
        assert!(!bus.control_enable.get());
    }

    #[test]
    fn out_of_range_substep_is_fatal() {
        let (mut nav, bus, _) = build(ON_LINE);
        drive_to_line_follow(&mut nav, &bus);
        bus.bump_detected.raise();
        nav.step(2).unwrap();
        nav.recovery_step = 9;
        match nav.step(3) {
            Err(Error::InvalidState { task, state }) => {
                assert_eq!(task, "navigator");
                assert_eq!(state, 9);
            }
            other => panic!("expected invalid state error, got {other:?}"),
        }
    }
}
