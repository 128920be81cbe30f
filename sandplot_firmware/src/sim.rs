//! Simulation hardware backends.
//!
//! Discrete stand-ins for the stepper drivers, the radial endstop, and the
//! serial link, used by the simulator binary and the test suite. The
//! stepper bank advances one step per axis per service call, which makes
//! tick counts deterministic in assertions; the endstop observes the
//! simulated radial position through a shared feedback cell, so homing
//! physically "reaches" the switch instead of being scripted.

use std::cell::Cell;
use std::rc::Rc;

use heapless::Deque;
use sandplot_common::hal::{Axis, ByteTransport, Endstop, StepperBank};
use sandplot_common::wire::Position;
use tracing::warn;

/// FIFO depth of each transport direction.
pub const TRANSPORT_FIFO_DEPTH: usize = 256;

// ─── Stepper Bank ───────────────────────────────────────────────────

/// Two-axis stepper simulation: one step per axis per service call.
#[derive(Debug)]
pub struct SimStepperBank {
    current: [i32; 2],
    target: [i32; 2],
    max_speed: [f32; 2],
    speed: [f32; 2],
    /// Radial position feedback shared with the endstop.
    r_feedback: Rc<Cell<i32>>,
}

impl SimStepperBank {
    fn new(start_r: i32, r_feedback: Rc<Cell<i32>>) -> Self {
        r_feedback.set(start_r);
        Self {
            current: [start_r, 0],
            target: [start_r, 0],
            max_speed: [0.0, 0.0],
            speed: [0.0, 0.0],
            r_feedback,
        }
    }

    /// Current simulated step count of one axis.
    pub const fn position(&self, axis: Axis) -> i32 {
        self.current[axis_index(axis)]
    }

    /// Max speed last applied to one axis.
    pub const fn max_speed(&self, axis: Axis) -> f32 {
        self.max_speed[axis_index(axis)]
    }

    fn publish_r(&self) {
        self.r_feedback.set(self.current[0]);
    }
}

const fn axis_index(axis: Axis) -> usize {
    match axis {
        Axis::R => 0,
        Axis::Phi => 1,
    }
}

impl StepperBank for SimStepperBank {
    fn set_max_speed(&mut self, axis: Axis, speed: f32) {
        self.max_speed[axis_index(axis)] = speed;
    }

    fn set_speed(&mut self, axis: Axis, speed: f32) {
        self.speed[axis_index(axis)] = speed;
    }

    fn set_current_position(&mut self, axis: Axis, steps: i32) {
        let i = axis_index(axis);
        self.current[i] = steps;
        self.target[i] = steps;
        self.publish_r();
    }

    fn move_to(&mut self, target: Position) {
        self.target = [target.r, target.phi];
    }

    fn run(&mut self) -> bool {
        for i in 0..2 {
            let delta = self.target[i] - self.current[i];
            self.current[i] += delta.signum();
        }
        self.publish_r();
        self.current != self.target
    }

    fn run_speed(&mut self) {
        // signum() maps 0.0 to 1.0, so a zero-speed axis must not step.
        for i in 0..2 {
            if self.speed[i] != 0.0 {
                self.current[i] += self.speed[i].signum() as i32;
            }
        }
        self.publish_r();
    }
}

// ─── Endstop ────────────────────────────────────────────────────────

/// Radial limit switch: pressed while the simulated carriage position is
/// at or below the trigger threshold.
#[derive(Debug)]
pub struct SimEndstop {
    r_position: Rc<Cell<i32>>,
    trigger_at: i32,
}

impl Endstop for SimEndstop {
    fn is_triggered(&self) -> bool {
        self.r_position.get() <= self.trigger_at
    }
}

/// Build a linked stepper bank and endstop. The carriage starts `start_r`
/// steps away from the switch, which triggers at position zero.
pub fn sim_rig(start_r: i32) -> (SimStepperBank, SimEndstop) {
    let feedback = Rc::new(Cell::new(start_r));
    let steppers = SimStepperBank::new(start_r, feedback.clone());
    let endstop = SimEndstop {
        r_position: feedback,
        trigger_at: 0,
    };
    (steppers, endstop)
}

// ─── Loopback Transport ─────────────────────────────────────────────

/// In-memory serial link: two fixed-capacity byte FIFOs.
///
/// The host side pushes into `rx` and drains `tx`; the firmware sees the
/// [`ByteTransport`] view.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    rx: Deque<u8, TRANSPORT_FIFO_DEPTH>,
    tx: Deque<u8, TRANSPORT_FIFO_DEPTH>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host side: queue bytes toward the firmware. Returns how many fit.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        let mut pushed = 0;
        for &byte in bytes {
            if self.rx.push_back(byte).is_err() {
                warn!(dropped = bytes.len() - pushed, "rx fifo full");
                break;
            }
            pushed += 1;
        }
        pushed
    }

    /// Host side: drain everything the firmware has sent.
    pub fn take_tx(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.tx.len());
        while let Some(byte) = self.tx.pop_front() {
            out.push(byte);
        }
        out
    }

    /// Bytes still queued toward the firmware.
    pub fn bytes_available_rx(&self) -> usize {
        self.rx.len()
    }
}

impl ByteTransport for LoopbackTransport {
    fn bytes_available(&self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> bool {
        if self.rx.len() < buf.len() {
            return false;
        }
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(byte) => *slot = byte,
                None => return false,
            }
        }
        true
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.tx.push_back(byte).is_err() {
                warn!("tx fifo full, dropping response byte");
                return;
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
