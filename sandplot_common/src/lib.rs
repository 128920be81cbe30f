//! Sandplot Common Library
//!
//! Shared foundation for the sandplot workspace: the byte-exact wire
//! protocol spoken between host and plotter, the hardware capability traits
//! behind which the stepper drivers / endstop / serial transport live, and
//! the firmware configuration loader.
//!
//! # Module Structure
//!
//! - [`wire`] - Protocol opcodes, frame layout constants, `Position`
//! - [`hal`] - Hardware capability traits (steppers, endstop, transport)
//! - [`config`] - TOML configuration loading and validation

pub mod config;
pub mod hal;
pub mod wire;
