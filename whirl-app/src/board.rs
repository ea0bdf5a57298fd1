//! Board abstraction
//!
//! A board names the concrete peripheral types and hands one of each to
//! [`App::new`](crate::App::new). The firmware binary implements this for
//! its chip; the host simulator implements it with simulated devices.

use whirl_hal::{AdcChannel, I2cController, IntervalTimer, LedStrip, LowPowerWait, TickTimer};

/// Peripheral types of one board
pub trait Board {
    /// I2C controller wired to the humidity sensor
    type Bus0: I2cController;
    /// I2C controller wired to the pressure sensor
    type Bus1: I2cController;
    /// Display phase timer
    type Tick: TickTimer;
    /// Hall interval timer; its overflow is the stall timeout
    type Measure: IntervalTimer;
    /// Periodic battery poll timer
    type BatteryTimer: IntervalTimer;
    type Leds: LedStrip;
    /// Battery voltage channel
    type Adc: AdcChannel;
    type Sleep: LowPowerWait;
}

/// One instance of every peripheral a board provides
pub struct Peripherals<B: Board> {
    pub bus0: B::Bus0,
    pub bus1: B::Bus1,
    pub tick: B::Tick,
    pub measure: B::Measure,
    pub battery_timer: B::BatteryTimer,
    pub leds: B::Leds,
    pub adc: B::Adc,
    pub sleep: B::Sleep,
}

/// Front-panel buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Button 0: previous mode
    Previous,
    /// Button 1: next mode
    Next,
}
