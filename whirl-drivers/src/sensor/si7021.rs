//! Si7021 relative humidity and temperature sensor
//!
//! Measurements use the "no hold master" commands, so the device NACKs the
//! read command until the conversion is done. The I2C engine retries that
//! NACK on its own; from here a measurement is one 2-byte read.

use whirl_core::events::Event;
use whirl_core::i2c::{ByteOrder, I2cEngine, TransferRequest};
use whirl_core::power::PowerArbiter;
use whirl_hal::I2cController;

use super::SensorError;

/// Default 7-bit address
pub const ADDRESS: u8 = 0x40;

/// Measure relative humidity, no hold master
pub const CMD_MEASURE_HUMIDITY: u8 = 0xF5;
/// Measure temperature, no hold master
pub const CMD_MEASURE_TEMPERATURE: u8 = 0xF3;
/// Write user register 1
pub const CMD_WRITE_USER_REG: u8 = 0xE6;
/// Read user register 1
pub const CMD_READ_USER_REG: u8 = 0xE7;

/// Measurement resolution, encoded as the full user register value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Resolution {
    /// 12-bit humidity, 14-bit temperature (power-on default)
    Rh12Temp14 = 0x3A,
    /// 8-bit humidity, 12-bit temperature
    Rh8Temp12 = 0x3B,
}

impl Resolution {
    /// Decode a user register value read back from the device
    pub fn from_register(value: u8) -> Option<Self> {
        match value {
            0x3A => Some(Resolution::Rh12Temp14),
            0x3B => Some(Resolution::Rh8Temp12),
            _ => None,
        }
    }
}

/// Convert a raw humidity code to percent relative humidity
pub fn compute_humidity(raw: u16) -> f32 {
    125.0 * f32::from(raw) / 65536.0 - 6.0
}

/// Convert a raw temperature code to degrees Fahrenheit
pub fn compute_temperature_f(raw: u16) -> f32 {
    let celsius = 175.72 * f32::from(raw) / 65536.0 - 46.85;
    celsius * 9.0 / 5.0 + 32.0
}

/// Si7021 driver state
///
/// Holds the last converted readings. The bus itself belongs to the
/// caller's [`I2cEngine`].
#[derive(Debug, Clone, Copy)]
pub struct Si7021 {
    address: u8,
    humidity: Option<f32>,
    temperature_f: Option<f32>,
}

impl Si7021 {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            humidity: None,
            temperature_f: None,
        }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Start a humidity conversion; completes with [`Event::HumidityReady`]
    pub fn read_humidity<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::read(
                self.address,
                CMD_MEASURE_HUMIDITY,
                2,
                ByteOrder::MsbFirst,
                Event::HumidityReady,
            ),
        )?;
        Ok(())
    }

    /// Start a temperature conversion; completes with
    /// [`Event::HumidityTemperatureReady`]
    pub fn read_temperature<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::read(
                self.address,
                CMD_MEASURE_TEMPERATURE,
                2,
                ByteOrder::MsbFirst,
                Event::HumidityTemperatureReady,
            ),
        )?;
        Ok(())
    }

    /// Write the resolution into the user register
    pub fn set_resolution<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
        resolution: Resolution,
        completion: Event,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::write(self.address, CMD_WRITE_USER_REG, resolution as u8, completion),
        )?;
        Ok(())
    }

    /// Read the user register back
    pub fn read_user_register<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
        completion: Event,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::read(self.address, CMD_READ_USER_REG, 1, ByteOrder::MsbFirst, completion),
        )?;
        Ok(())
    }

    /// Convert a completed humidity read
    pub fn on_humidity(&mut self, word: u32) -> Result<f32, SensorError> {
        let raw = u16::try_from(word).map_err(|_| SensorError::WordOverflow(word))?;
        let rh = compute_humidity(raw);
        self.humidity = Some(rh);
        Ok(rh)
    }

    /// Convert a completed temperature read
    pub fn on_temperature(&mut self, word: u32) -> Result<f32, SensorError> {
        let raw = u16::try_from(word).map_err(|_| SensorError::WordOverflow(word))?;
        let temp = compute_temperature_f(raw);
        self.temperature_f = Some(temp);
        Ok(temp)
    }

    /// Last humidity (%RH), if one has been read
    pub fn humidity(&self) -> Option<f32> {
        self.humidity
    }

    /// Last temperature (°F), if one has been read
    pub fn temperature_f(&self) -> Option<f32> {
        self.temperature_f
    }
}

impl Default for Si7021 {
    fn default() -> Self {
        Self::new(ADDRESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::vec::Vec;
    use whirl_core::i2c::{BusId, Direction};
    use whirl_core::EnergyMode;
    use whirl_hal::{BusCommand, BusInterrupts};

    #[derive(Default)]
    struct MockController {
        issued: Vec<BusCommand>,
    }

    impl I2cController for MockController {
        fn issue(&mut self, command: BusCommand) {
            self.issued.push(command);
        }

        fn read_data(&mut self) -> u8 {
            0
        }

        fn take_interrupts(&mut self) -> BusInterrupts {
            BusInterrupts::NONE
        }

        fn reset_bus(&mut self) {}
    }

    fn engine() -> I2cEngine<MockController> {
        I2cEngine::new(BusId::Bus0, MockController::default(), EnergyMode::Em1)
    }

    #[test]
    fn test_compute_humidity_midscale() {
        assert_eq!(compute_humidity(32768), 56.5);
        assert_eq!(compute_humidity(0), -6.0);
    }

    #[test]
    fn test_compute_temperature_midscale() {
        let t = compute_temperature_f(32768);
        assert!((t - 105.818).abs() < 0.01, "got {}", t);
    }

    #[test]
    fn test_compute_temperature_freezing_point() {
        // 0°C is raw ≈ 17473
        let t = compute_temperature_f(17473);
        assert!((t - 32.0).abs() < 0.05, "got {}", t);
    }

    #[test]
    fn test_read_humidity_starts_msb_two_byte_read() {
        let sensor = Si7021::default();
        let power = PowerArbiter::new();
        let mut bus = engine();

        sensor.read_humidity(&mut bus, &power).unwrap();

        let req = bus.transaction().request().copied().unwrap();
        assert_eq!(req.register, CMD_MEASURE_HUMIDITY);
        assert_eq!(req.byte_count, 2);
        assert_eq!(req.byte_order, ByteOrder::MsbFirst);
        assert_eq!(req.completion, Event::HumidityReady);
        assert_eq!(
            bus.controller().issued,
            [BusCommand::Start, BusCommand::Transmit(0x80)]
        );
        assert_eq!(power.block_count(EnergyMode::Em1), 1);
    }

    #[test]
    fn test_read_temperature_while_busy_is_rejected() {
        let sensor = Si7021::default();
        let power = PowerArbiter::new();
        let mut bus = engine();

        sensor.read_humidity(&mut bus, &power).unwrap();
        let err = sensor.read_temperature(&mut bus, &power).unwrap_err();

        assert!(matches!(err, SensorError::Bus(_)));
        assert_eq!(power.block_count(EnergyMode::Em1), 1);
    }

    #[test]
    fn test_set_resolution_is_single_byte_write() {
        let sensor = Si7021::default();
        let power = PowerArbiter::new();
        let mut bus = engine();

        sensor
            .set_resolution(&mut bus, &power, Resolution::Rh8Temp12, Event::BootUp)
            .unwrap();

        let req = bus.transaction().request().copied().unwrap();
        assert_eq!(req.direction, Direction::Write);
        assert_eq!(req.register, CMD_WRITE_USER_REG);
        assert_eq!(req.payload, 0x3B);
    }

    #[test]
    fn test_on_humidity_caches_reading() {
        let mut sensor = Si7021::default();
        assert_eq!(sensor.humidity(), None);

        assert_eq!(sensor.on_humidity(32768), Ok(56.5));
        assert_eq!(sensor.humidity(), Some(56.5));
    }

    #[test]
    fn test_wide_word_is_rejected() {
        let mut sensor = Si7021::default();
        assert_eq!(
            sensor.on_temperature(0x1_0000),
            Err(SensorError::WordOverflow(0x1_0000))
        );
        assert_eq!(sensor.temperature_f(), None);
    }

    #[test]
    fn test_resolution_from_register() {
        assert_eq!(Resolution::from_register(0x3A), Some(Resolution::Rh12Temp14));
        assert_eq!(Resolution::from_register(0x3B), Some(Resolution::Rh8Temp12));
        assert_eq!(Resolution::from_register(0x00), None);
    }

    proptest! {
        #[test]
        fn test_conversions_are_monotonic(a in any::<u16>(), b in any::<u16>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(compute_humidity(lo) <= compute_humidity(hi));
            prop_assert!(compute_temperature_f(lo) <= compute_temperature_f(hi));
        }

        #[test]
        fn test_humidity_stays_in_sensor_range(raw in any::<u16>()) {
            let rh = compute_humidity(raw);
            prop_assert!((-6.0..119.0).contains(&rh));
        }
    }
}
