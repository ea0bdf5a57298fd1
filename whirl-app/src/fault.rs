//! Fatal fault latch

use whirl_core::i2c::I2cError;
use whirl_core::power::PowerError;
use whirl_drivers::sensor::SensorError;

/// Unrecoverable error
///
/// Every one of these is a firmware bug or a hardware failure. Once one is
/// latched the application stops dispatching and leaves the LEDs alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Unbalanced energy-mode block/unblock
    Power(PowerError),
    /// I2C engine misuse or protocol violation
    Bus(I2cError),
    /// Sensor driver error
    Sensor(SensorError),
    /// The LED strip rejected a write
    LedStrip,
}

impl From<PowerError> for Fault {
    fn from(err: PowerError) -> Self {
        Fault::Power(err)
    }
}

impl From<I2cError> for Fault {
    fn from(err: I2cError) -> Self {
        Fault::Bus(err)
    }
}

impl From<SensorError> for Fault {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::Bus(bus) => Fault::Bus(bus),
            other => Fault::Sensor(other),
        }
    }
}
