//! Configuration type definitions
//!
//! Board-level constants that the event core is parameterised over. The
//! defaults describe the reference hardware: a 12-LED arm, 16 character
//! cells across a 135° display arc, and a Li-ion cell read through a 5 V
//! referenced 12-bit ADC.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use whirl_hal::EnergyMode;

/// Angular layout of one rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryConfig {
    /// Degrees in one rotation
    pub degrees_per_rotation: u32,
    /// Dark arc between the rotation-phase edge and the first column
    pub dead_zone_degrees: u32,
    /// Arc covered by the display columns
    pub display_zone_degrees: u32,
    /// One column's arc, as a fraction (numerator)
    pub pixel_degrees_num: u32,
    /// One column's arc, as a fraction (denominator)
    pub pixel_degrees_den: u32,
}

impl GeometryConfig {
    /// 100° dead zone, 135° display, 1.40625° per column
    pub const DEFAULT: Self = Self {
        degrees_per_rotation: 360,
        dead_zone_degrees: 100,
        display_zone_degrees: 135,
        pixel_degrees_num: 45,
        pixel_degrees_den: 32,
    };
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Battery measurement parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BatteryConfig {
    /// Seconds between polls
    pub poll_period_s: u16,
    /// Full-scale ADC count
    pub adc_full_scale: u16,
    /// ADC reference voltage (mV)
    pub reference_mv: u16,
    /// Readings below this count as low (mV)
    pub low_threshold_mv: u16,
    /// Consecutive low readings tolerated before the battery is low
    pub low_count_threshold: u8,
    /// Voltage reported as 100% (mV)
    pub full_mv: u16,
    /// Voltage reported as 0% (mV)
    pub empty_mv: u16,
}

impl BatteryConfig {
    /// Single Li-ion cell on a 5 V referenced 12-bit ADC
    pub const DEFAULT: Self = Self {
        poll_period_s: 5,
        adc_full_scale: 4095,
        reference_mv: 5000,
        low_threshold_mv: 3200,
        low_count_threshold: 5,
        full_mv: 4200,
        empty_mv: 3000,
    };

    /// Convert a voltage to the ADC count it would read as
    pub const fn mv_to_counts(&self, mv: u16) -> u32 {
        (mv as u32 * self.adc_full_scale as u32) / self.reference_mv as u32
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sleep-depth requirement of each asynchronous peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PowerConfig {
    /// Held by an I2C engine for the length of a transaction
    pub i2c_block: EnergyMode,
    /// Held while the rotation timers run
    pub timer_block: EnergyMode,
    /// Held for the length of an ADC conversion
    pub adc_block: EnergyMode,
    /// Held from boot, never released
    pub system_floor: EnergyMode,
}

impl PowerConfig {
    pub const DEFAULT: Self = Self {
        i2c_block: EnergyMode::Em1,
        timer_block: EnergyMode::Em3,
        adc_block: EnergyMode::Em2,
        system_floor: EnergyMode::Em3,
    };
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Environmental sensor parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorConfig {
    /// Humidity/temperature sensor address (bus 0)
    pub humidity_address: u8,
    /// Pressure/temperature sensor address (bus 1)
    pub pressure_address: u8,
    /// Reference pressure for the altitude estimate (Pa)
    pub sea_level_pa: u32,
}

impl SensorConfig {
    pub const DEFAULT: Self = Self {
        humidity_address: 0x40,
        pressure_address: 0x77,
        sea_level_pa: 101_325,
    };
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete board configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WhirlConfig {
    pub geometry: GeometryConfig,
    pub battery: BatteryConfig,
    pub power: PowerConfig,
    pub sensors: SensorConfig,
}

impl WhirlConfig {
    pub const DEFAULT: Self = Self {
        geometry: GeometryConfig::DEFAULT,
        battery: BatteryConfig::DEFAULT,
        power: PowerConfig::DEFAULT,
        sensors: SensorConfig::DEFAULT,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_geometry_matches_column_count() {
        let geo = GeometryConfig::DEFAULT;
        // 96 columns of 45/32° fill the display arc exactly
        assert_eq!(96 * geo.pixel_degrees_num, geo.display_zone_degrees * geo.pixel_degrees_den);
    }

    #[test]
    fn test_battery_threshold_counts() {
        let battery = BatteryConfig::DEFAULT;
        assert_eq!(battery.mv_to_counts(5000), 4095);
        assert_eq!(battery.mv_to_counts(3200), 2620);
    }

    #[test]
    fn test_default_is_const_default() {
        assert_eq!(WhirlConfig::default(), WhirlConfig::DEFAULT);
    }
}
