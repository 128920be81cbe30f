//! # Sandplot Firmware Core
//!
//! Control core of a two-axis polar sand plotter: a byte-driven protocol
//! parser that frames host commands into a bounded position queue, and a
//! motion state machine that drains that queue and drives the stepper
//! capability through homing, coordinated moves, and stop/clear requests.
//!
//! ## Cooperative Tick Model
//!
//! Everything runs from one single-threaded loop: each tick first lets the
//! parser consume whatever bytes are available (never blocking), then
//! advances motion by one step. Shared state (queue, pending speed, control
//! requests) has exactly one writer and one reader, and the two machines
//! never execute concurrently, so no locking is needed anywhere.
//!
//! ## Zero-Allocation Core
//!
//! The queue is a fixed array with two modulo cursors, the parser's scratch
//! state is inline, and response frames are built in a four-byte buffer.
//! The tick path performs no heap allocation.

pub mod firmware;
pub mod motion;
pub mod protocol;
pub mod queue;
pub mod sim;
