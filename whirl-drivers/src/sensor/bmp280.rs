//! BMP280 barometric pressure and temperature sensor
//!
//! Setup runs as a chain of bus transactions, one per
//! [`Event::PressureSetupStep`]:
//!
//! ```text
//! CTRL_MEAS <- 0x3F -> CONFIG <- 0x30 -> calib[0] -> ... -> calib[11] -> Ready
//! ```
//!
//! Compensation uses the datasheet's integer routines: 32-bit for
//! temperature (producing `t_fine`), 64-bit for pressure in Q24.8 Pa.

use micromath::F32Ext;
use whirl_core::events::Event;
use whirl_core::i2c::{word_to_i16, word_to_u16, ByteOrder, I2cEngine, TransferRequest};
use whirl_core::power::PowerArbiter;
use whirl_hal::I2cController;

use super::SensorError;

/// Default 7-bit address (SDO high)
pub const ADDRESS: u8 = 0x77;

pub const REG_CHIP_ID: u8 = 0xD0;
pub const REG_CTRL_MEAS: u8 = 0xF4;
pub const REG_CONFIG: u8 = 0xF5;
pub const REG_PRESS_MSB: u8 = 0xF7;
pub const REG_TEMP_MSB: u8 = 0xFA;
pub const REG_CALIB_START: u8 = 0x88;

/// Value of the chip ID register
pub const CHIP_ID: u8 = 0x58;

/// osrs_t x1, osrs_p x16, normal mode
pub const CTRL_MEAS_VALUE: u8 = 0x3F;
/// 0.5 ms standby, IIR filter coefficient 16
pub const CONFIG_VALUE: u8 = 0x30;

/// Calibration words dig_T1..dig_P9
pub const CALIB_WORDS: usize = 12;

/// Calibration coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

impl Calibration {
    /// Decode the twelve calibration words in register order
    ///
    /// `dig_T1` and `dig_P1` are unsigned; every other word is two's
    /// complement.
    pub fn from_words(words: &[u32; CALIB_WORDS]) -> Result<Self, SensorError> {
        let unsigned = |w: u32| word_to_u16(w).ok_or(SensorError::WordOverflow(w));
        let signed = |w: u32| word_to_i16(w).ok_or(SensorError::WordOverflow(w));

        Ok(Self {
            t1: unsigned(words[0])?,
            t2: signed(words[1])?,
            t3: signed(words[2])?,
            p1: unsigned(words[3])?,
            p2: signed(words[4])?,
            p3: signed(words[5])?,
            p4: signed(words[6])?,
            p5: signed(words[7])?,
            p6: signed(words[8])?,
            p7: signed(words[9])?,
            p8: signed(words[10])?,
            p9: signed(words[11])?,
        })
    }

    /// Temperature in hundredths of a degree Celsius, plus `t_fine`
    pub fn compensate_temperature(&self, adc_t: i32) -> (i32, i32) {
        // Evaluated in i64; the squared term can exceed i32 for raw values
        // far from the calibration point.
        let adc_t = i64::from(adc_t);
        let t1 = i64::from(self.t1);
        let var1 = (((adc_t >> 3) - (t1 << 1)) * i64::from(self.t2)) >> 11;
        let d = (adc_t >> 4) - t1;
        let var2 = (((d * d) >> 12) * i64::from(self.t3)) >> 14;
        let t_fine = saturate(var1 + var2);
        let centi = saturate((i64::from(t_fine) * 5 + 128) >> 8);
        (centi, t_fine)
    }

    /// Pressure in Q24.8 Pa (divide by 256 for Pa)
    ///
    /// Returns `None` when the calibration would divide by zero.
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: i32) -> Option<u32> {
        let mut var1 = i64::from(t_fine) - 128_000;
        let mut var2 = var1 * var1 * i64::from(self.p6);
        var2 += (var1 * i64::from(self.p5)) << 17;
        var2 += i64::from(self.p4) << 35;
        var1 = ((var1 * var1 * i64::from(self.p3)) >> 8) + ((var1 * i64::from(self.p2)) << 12);
        var1 = (((1i64 << 47) + var1) * i64::from(self.p1)) >> 33;
        if var1 == 0 {
            return None;
        }

        let mut p = 1_048_576 - i64::from(adc_p);
        p = (((p << 31) - var2) * 3125) / var1;
        var1 = (i64::from(self.p9) * (p >> 13) * (p >> 13)) >> 25;
        var2 = (i64::from(self.p8) * p) >> 19;
        p = ((p + var1 + var2) >> 8) + (i64::from(self.p7) << 4);
        u32::try_from(p).ok()
    }
}

fn saturate(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

/// Extract the 20-bit ADC value from a 3-byte MSB-first read
fn raw_20bit(word: u32) -> Result<i32, SensorError> {
    if word > 0x00FF_FFFF {
        return Err(SensorError::WordOverflow(word));
    }
    i32::try_from(word >> 4).map_err(|_| SensorError::WordOverflow(word))
}

/// Barometric pressure to altitude (m) with the hypsometric formula
///
/// Both pressures in the same unit.
pub fn altitude_m(sea_level: f32, pressure: f32, temperature_c: f32) -> f32 {
    let ratio = sea_level / pressure;
    (F32Ext::powf(ratio, 1.0 / 5.257) - 1.0) * (temperature_c + 273.15) / 0.0065
}

/// Where the asynchronous setup chain stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetupState {
    /// Setup not started
    Unconfigured,
    /// CTRL_MEAS write in flight
    WritingControl,
    /// CONFIG write in flight
    WritingConfig,
    /// Calibration word `n` read in flight
    ReadingCalibration(u8),
    /// Calibration decoded; measurements allowed
    Ready,
}

/// BMP280 driver state
#[derive(Debug, Clone, Copy)]
pub struct Bmp280 {
    address: u8,
    setup: SetupState,
    words: [u32; CALIB_WORDS],
    calibration: Option<Calibration>,
    t_fine: Option<i32>,
    temperature_c: Option<f32>,
    pressure_pa: Option<f32>,
}

impl Bmp280 {
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            setup: SetupState::Unconfigured,
            words: [0; CALIB_WORDS],
            calibration: None,
            t_fine: None,
            temperature_c: None,
            pressure_pa: None,
        }
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn setup_state(&self) -> SetupState {
        self.setup
    }

    pub fn is_ready(&self) -> bool {
        self.setup == SetupState::Ready
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    /// Kick off the setup chain with the CTRL_MEAS write
    pub fn begin_setup<C: I2cController>(
        &mut self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::write(
                self.address,
                REG_CTRL_MEAS,
                CTRL_MEAS_VALUE,
                Event::PressureSetupStep,
            ),
        )?;
        self.setup = SetupState::WritingControl;
        self.calibration = None;
        Ok(())
    }

    /// Advance the setup chain after a [`Event::PressureSetupStep`]
    ///
    /// `word` is the bus's result word; it is only meaningful for the
    /// calibration reads.
    pub fn on_setup_step<C: I2cController>(
        &mut self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
        word: u32,
    ) -> Result<SetupState, SensorError> {
        let next = match self.setup {
            SetupState::WritingControl => {
                bus.start(
                    power,
                    TransferRequest::write(
                        self.address,
                        REG_CONFIG,
                        CONFIG_VALUE,
                        Event::PressureSetupStep,
                    ),
                )?;
                SetupState::WritingConfig
            }
            SetupState::WritingConfig => {
                self.read_calibration_word(bus, power, 0)?;
                SetupState::ReadingCalibration(0)
            }
            SetupState::ReadingCalibration(index) => {
                let slot = usize::from(index);
                self.words[slot] = word;
                if slot + 1 < CALIB_WORDS {
                    self.read_calibration_word(bus, power, index + 1)?;
                    SetupState::ReadingCalibration(index + 1)
                } else {
                    self.calibration = Some(Calibration::from_words(&self.words)?);
                    SetupState::Ready
                }
            }
            SetupState::Unconfigured | SetupState::Ready => {
                return Err(SensorError::UnexpectedSetupStep);
            }
        };
        self.setup = next;
        Ok(next)
    }

    fn read_calibration_word<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
        index: u8,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::read(
                self.address,
                REG_CALIB_START + index * 2,
                2,
                ByteOrder::LsbFirst,
                Event::PressureSetupStep,
            ),
        )?;
        Ok(())
    }

    /// Start a temperature read; completes with
    /// [`Event::PressureTemperatureReady`]
    pub fn read_temperature<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
    ) -> Result<(), SensorError> {
        if !self.is_ready() {
            return Err(SensorError::NotCalibrated);
        }
        bus.start(
            power,
            TransferRequest::read(
                self.address,
                REG_TEMP_MSB,
                3,
                ByteOrder::MsbFirst,
                Event::PressureTemperatureReady,
            ),
        )?;
        Ok(())
    }

    /// Start a pressure read; completes with [`Event::PressureReady`]
    pub fn read_pressure<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
    ) -> Result<(), SensorError> {
        if !self.is_ready() {
            return Err(SensorError::NotCalibrated);
        }
        bus.start(
            power,
            TransferRequest::read(
                self.address,
                REG_PRESS_MSB,
                3,
                ByteOrder::MsbFirst,
                Event::PressureReady,
            ),
        )?;
        Ok(())
    }

    /// Start a chip ID read
    pub fn read_chip_id<C: I2cController>(
        &self,
        bus: &mut I2cEngine<C>,
        power: &PowerArbiter,
        completion: Event,
    ) -> Result<(), SensorError> {
        bus.start(
            power,
            TransferRequest::read(self.address, REG_CHIP_ID, 1, ByteOrder::MsbFirst, completion),
        )?;
        Ok(())
    }

    /// Compensate a completed temperature read (°C)
    pub fn on_temperature(&mut self, word: u32) -> Result<f32, SensorError> {
        let cal = self.calibration.ok_or(SensorError::NotCalibrated)?;
        let (centi, t_fine) = cal.compensate_temperature(raw_20bit(word)?);
        let celsius = centi as f32 / 100.0;
        self.t_fine = Some(t_fine);
        self.temperature_c = Some(celsius);
        Ok(celsius)
    }

    /// Compensate a completed pressure read (hPa)
    ///
    /// Needs a temperature read first for `t_fine`.
    pub fn on_pressure(&mut self, word: u32) -> Result<f32, SensorError> {
        let cal = self.calibration.ok_or(SensorError::NotCalibrated)?;
        let t_fine = self.t_fine.ok_or(SensorError::NotCalibrated)?;
        let q24_8 = cal
            .compensate_pressure(raw_20bit(word)?, t_fine)
            .ok_or(SensorError::InvalidCalibration)?;
        let pa = q24_8 as f32 / 256.0;
        self.pressure_pa = Some(pa);
        Ok(pa / 100.0)
    }

    /// Last temperature (°C)
    pub fn temperature_c(&self) -> Option<f32> {
        self.temperature_c
    }

    /// Last pressure (hPa)
    pub fn pressure_hpa(&self) -> Option<f32> {
        self.pressure_pa.map(|pa| pa / 100.0)
    }

    /// Altitude estimate (m) from the last pressure and temperature
    pub fn altitude_m(&self, sea_level_pa: u32) -> Option<f32> {
        let pa = self.pressure_pa?;
        let celsius = self.temperature_c?;
        if pa <= 0.0 {
            return None;
        }
        Some(altitude_m(sea_level_pa as f32, pa, celsius))
    }
}

impl Default for Bmp280 {
    fn default() -> Self {
        Self::new(ADDRESS)
    }
}

/// Check a chip ID register value
pub fn verify_chip_id(word: u32) -> Result<(), SensorError> {
    match u8::try_from(word) {
        Ok(CHIP_ID) => Ok(()),
        Ok(other) => Err(SensorError::UnexpectedId(other)),
        Err(_) => Err(SensorError::WordOverflow(word)),
    }
}
