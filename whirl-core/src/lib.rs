//! Board-agnostic event core for the POV display firmware
//!
//! This crate contains the logic that runs between the interrupt handlers
//! and the main loop, independent of any specific chip:
//!
//! - Power-mode arbiter (reference-counted sleep-depth blocking)
//! - Event scheduler (deferred work bitmask)
//! - I2C transaction engine (per-bus interrupt-driven state machine)
//! - Rotation timing engine (hall-sensor synchronised zones)
//! - Display composer (frames, glyphs, pixel buffer)
//! - Configuration type definitions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod display;
pub mod events;
pub mod i2c;
pub mod power;
pub mod rotation;

pub use whirl_hal::EnergyMode;
