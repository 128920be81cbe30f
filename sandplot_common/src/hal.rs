//! Hardware capability traits.
//!
//! The firmware core never touches pins or UART registers directly; it
//! drives hardware through these seams, enabling pluggable backends
//! (simulation, real stepper drivers, a serial port).
//!
//! # Lifecycle
//!
//! All three capabilities are polled from the single cooperative tick loop.
//! No call may block: the transport reports availability before reads, and
//! `run()` / `run_speed()` perform at most one service step per call.

use crate::wire::Position;

/// Identifier for one of the two plotter axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Radial axis (carriage along the arm), homed against the endstop.
    R,
    /// Angular axis (arm rotation), unbounded.
    Phi,
}

/// Two-axis stepper driver bank with coordinated moves.
///
/// `run()` advances an in-progress coordinated move by at most one service
/// step and reports whether motion is still in progress. `run_speed()`
/// services constant-speed motion (used while homing) without a target.
pub trait StepperBank {
    /// Set the maximum speed used for coordinated moves on one axis.
    fn set_max_speed(&mut self, axis: Axis, speed: f32);

    /// Set a signed constant speed for `run_speed()` on one axis.
    fn set_speed(&mut self, axis: Axis, speed: f32);

    /// Redefine the current step count of one axis (no motion).
    fn set_current_position(&mut self, axis: Axis, steps: i32);

    /// Begin a coordinated move of both axes toward `target`.
    fn move_to(&mut self, target: Position);

    /// Service the coordinated move. Returns `true` while motion toward
    /// the target is still in progress, `false` once it completes.
    fn run(&mut self) -> bool;

    /// Service constant-speed motion on axes with a nonzero set speed.
    fn run_speed(&mut self);
}

/// Limit switch at the radial axis home reference point.
pub trait Endstop {
    /// Whether the switch is currently pressed.
    fn is_triggered(&self) -> bool;
}

/// Non-blocking byte stream to and from the host.
pub trait ByteTransport {
    /// Number of bytes currently readable without blocking.
    fn bytes_available(&self) -> usize;

    /// Read one byte, or `None` if nothing is available.
    fn read_byte(&mut self) -> Option<u8>;

    /// Fill `buf` completely, or return `false` without a partial read.
    /// Callers check `bytes_available()` first, so `false` is unexpected.
    fn read_exact(&mut self, buf: &mut [u8]) -> bool;

    /// Queue `bytes` for transmission to the host.
    fn write(&mut self, bytes: &[u8]);
}
