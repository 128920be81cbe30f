//! Motion state machine driving the stepper capability.
//!
//! Owns the live target position and homing status. Ticked once per control
//! cycle; consumes single targets pushed by the tick glue and delegates the
//! actual multi-axis interpolation to the [`StepperBank`] capability.
//!
//! ## Target semantics
//!
//! The radial coordinate of every new target is an absolute value clamped
//! into the configured window; the angular coordinate is a delta accumulated
//! onto the running target. This asymmetry is the protocol contract: hosts
//! stream relative arm rotations but absolute carriage positions.

use sandplot_common::config::FirmwareConfig;
use sandplot_common::hal::{Axis, Endstop, StepperBank};
use sandplot_common::wire::Position;
use tracing::debug;

/// Motion lifecycle state. Starts in `Homing`: the machine establishes its
/// radial origin before the first coordinated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Driving the radial axis toward the endstop at homing speed.
    Homing,
    /// A coordinated move toward the current target is in progress.
    Moving,
    /// No motion driven (stopped or cleared by the host).
    Idle,
    /// The current target was reached; ready for the next one.
    Finished,
}

/// Two-axis motion controller.
pub struct MotionController<S: StepperBank, E: Endstop> {
    steppers: S,
    endstop: E,
    state: MotionState,
    /// Running target: `r` clamped, `phi` accumulated.
    target: Position,
    /// Max speed applied to both axes outside homing.
    normal_speed: f32,
    homed: bool,
    move_finished: bool,
    /// Whether the homing speed was already latched for this homing pass.
    homing_speed_set: bool,
    r_min: i32,
    r_max: i32,
    r_home_offset: i32,
    homing_speed: f32,
}

impl<S: StepperBank, E: Endstop> MotionController<S, E> {
    pub fn new(mut steppers: S, endstop: E, config: &FirmwareConfig) -> Self {
        steppers.set_max_speed(Axis::R, config.initial_speed);
        steppers.set_max_speed(Axis::Phi, config.initial_speed);
        Self {
            steppers,
            endstop,
            state: MotionState::Homing,
            target: Position::default(),
            normal_speed: config.initial_speed,
            homed: false,
            move_finished: false,
            homing_speed_set: false,
            r_min: config.r_min_steps,
            r_max: config.r_max_steps,
            r_home_offset: config.r_home_offset_steps,
            homing_speed: config.homing_speed,
        }
    }

    #[inline]
    pub const fn state(&self) -> MotionState {
        self.state
    }

    #[inline]
    pub const fn is_homed(&self) -> bool {
        self.homed
    }

    /// Whether the last issued move has completed (set by `tick()` in
    /// `Moving`, or by a clear request). Gates the queue drain.
    #[inline]
    pub const fn move_finished(&self) -> bool {
        self.move_finished
    }

    /// Current running target (for diagnostics and tests).
    #[inline]
    pub const fn target(&self) -> Position {
        self.target
    }

    /// Stepper capability access (for diagnostics and tests).
    #[inline]
    pub const fn steppers(&self) -> &S {
        &self.steppers
    }

    /// Advance motion by one control cycle.
    pub fn tick(&mut self) {
        match self.state {
            MotionState::Homing => self.tick_homing(),
            MotionState::Moving => {
                if !self.steppers.run() {
                    debug!(target = ?self.target, "move finished");
                    self.state = MotionState::Finished;
                    self.move_finished = true;
                }
            }
            MotionState::Idle | MotionState::Finished => {}
        }
    }

    /// One homing cycle: drive the radial axis at homing speed until the
    /// endstop triggers, then establish the origin and resume normal motion.
    fn tick_homing(&mut self) {
        if !self.homing_speed_set {
            self.steppers.set_speed(Axis::R, self.homing_speed);
            self.homing_speed_set = true;
        }

        if !self.endstop.is_triggered() {
            self.steppers.run_speed();
            return;
        }

        // Endstop hit: latch the origin and stop the homing drive.
        self.steppers.set_current_position(Axis::R, self.r_home_offset);
        self.steppers.set_current_position(Axis::Phi, 0);
        self.steppers.set_speed(Axis::R, 0.0);
        self.steppers.run_speed();

        self.homed = true;
        self.homing_speed_set = false;
        self.steppers.set_max_speed(Axis::R, self.normal_speed);
        self.steppers.set_max_speed(Axis::Phi, self.normal_speed);
        self.steppers.move_to(self.target);
        self.state = MotionState::Moving;
        debug!(offset = self.r_home_offset, "homing complete");
    }

    /// Force a homing pass from any state.
    pub fn request_home(&mut self) {
        self.state = MotionState::Homing;
    }

    /// Resume motion toward the current target.
    pub fn request_start(&mut self) {
        self.state = MotionState::Moving;
    }

    /// Pause motion; the target and queue are untouched.
    pub fn request_stop(&mut self) {
        self.state = MotionState::Idle;
    }

    /// Stop and mark the current move done (pairs with a queue clear).
    pub fn request_clear(&mut self) {
        self.state = MotionState::Idle;
        self.move_finished = true;
    }

    /// Accept the next target: clamp `r`, accumulate `phi`, start moving.
    /// Never fails; an out-of-range `r` is silently clamped.
    pub fn set_target_delta(&mut self, r: i32, phi: i32) {
        self.target.r = r.clamp(self.r_min, self.r_max);
        self.target.phi += phi;
        self.state = MotionState::Moving;
        self.move_finished = false;
        self.steppers.move_to(self.target);
    }

    /// Apply a new max speed to both axes immediately; no state change.
    pub fn set_speed(&mut self, speed: f32) {
        self.normal_speed = speed;
        self.steppers.set_max_speed(Axis::R, speed);
        self.steppers.set_max_speed(Axis::Phi, speed);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
