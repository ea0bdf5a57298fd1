//! Hardware driver implementations
//!
//! This crate provides the device-level pieces that sit on top of the
//! whirl-core engines and the whirl-hal traits:
//!
//! - Environmental sensors (Si7021 humidity, BMP280 pressure)
//! - Battery monitor (ADC-polled low-voltage detection)
//! - LED strip encoders (WS2812 over SPI)
//! - Energy-mode sleep (Cortex-M, behind the `cortex-m` feature)

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod battery;
pub mod led;
pub mod power;
pub mod sensor;
