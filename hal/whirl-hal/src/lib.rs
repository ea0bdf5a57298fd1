//! Whirl Hardware Abstraction Layer
//!
//! This crate defines the peripheral primitives the event core drives.
//! Chip-specific glue implements them; the host simulator implements them
//! with in-memory models.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (whirl-app)                │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  whirl-core / whirl-drivers             │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  whirl-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board glue   │       │   whirl-sim   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cController`] - Command-level I2C controller
//! - [`timer::TickTimer`], [`timer::IntervalTimer`] - Phase and interval timers
//! - [`led::LedStrip`] - One column of addressable LEDs
//! - [`adc::AdcChannel`] - Single-channel ADC
//! - [`power::LowPowerWait`] - Processor low-power wait primitive

#![no_std]
#![deny(unsafe_code)]

pub mod adc;
pub mod i2c;
pub mod led;
pub mod power;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use adc::AdcChannel;
pub use i2c::{BusCommand, BusInterrupts, I2cController, InterruptKind};
pub use led::{Column, Grb, LedStrip, LEDS_PER_COLUMN};
pub use power::{EnergyMode, LowPowerWait};
pub use timer::{IntervalTimer, TickTimer};
