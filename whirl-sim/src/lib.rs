//! Host simulator for the POV display
//!
//! Runs the real [`whirl_app::App`] against simulated peripherals:
//!
//! - Two I2C buses with byte-level Si7021 and BMP280 models that can NACK
//!   the read phase to exercise the retry path
//! - Tick, measure and battery timers on a shared tick clock
//! - A rotor whose hall edges alternate between a short and a long arc
//! - An LED strip that records every column, an ADC, and a sleep recorder

pub mod bus;
pub mod devices;
pub mod peripherals;
pub mod render;
pub mod simulation;

pub use bus::{SimDevice, SimI2c};
pub use devices::{SimBmp280, SimSi7021};
pub use simulation::{SimBoard, SimConfig, Simulation};
