//! Environmental sensors on the I2C engines
//!
//! Drivers here never block on the bus. Each `read_*` call starts a
//! transaction and returns; the caller picks the result word up from the
//! engine once the completion event fires and hands it back to the
//! driver's `on_*` method for conversion.

pub mod bmp280;
pub mod si7021;

pub use bmp280::{Bmp280, Calibration, SetupState};
pub use si7021::{Resolution, Si7021};

use whirl_core::i2c::I2cError;

/// Errors raised by the sensor drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The engine refused the transaction
    Bus(I2cError),
    /// Measurement requested before the calibration chain finished
    NotCalibrated,
    /// Setup step completed while no setup was in progress
    UnexpectedSetupStep,
    /// Result word wider than the read that produced it
    WordOverflow(u32),
    /// Chip identification register did not match
    UnexpectedId(u8),
    /// Compensation would divide by zero (all-zero calibration)
    InvalidCalibration,
}

impl From<I2cError> for SensorError {
    fn from(err: I2cError) -> Self {
        SensorError::Bus(err)
    }
}
