//! Application: interrupt entry points and the event dispatcher
//!
//! The board glue calls the `on_*` methods from its interrupt handlers and
//! runs the main loop:
//!
//! ```text
//! loop {
//!     app.run_scheduled_events();
//!     app.idle();
//! }
//! ```
//!
//! Interrupt entry points do the time-critical part (timer bookkeeping,
//! column output, I2C state advance) and post events; everything slower
//! (sensor conversion, mode changes, menu output) runs from the dispatcher.
//! The board is expected to keep `App` in a critical-section mutex so the
//! two contexts never overlap.

use whirl_core::config::WhirlConfig;
use whirl_core::display::{menu_column, rasterize, Column, Composer, DataSource, DisplayMode, PixelBuffer, Readings};
use whirl_core::events::{Event, EventScheduler};
use whirl_core::i2c::{BusId, I2cEngine};
use whirl_core::power::PowerArbiter;
use whirl_core::rotation::{RotationEngine, TickAction};
use whirl_core::EnergyMode;
use whirl_drivers::battery::BatteryMonitor;
use whirl_drivers::sensor::{Bmp280, SetupState, Si7021};
use whirl_hal::{IntervalTimer, LedStrip};

use crate::board::{Board, Button, Peripherals};
use crate::fault::Fault;

/// The whole application
pub struct App<B: Board> {
    config: WhirlConfig,
    pub(crate) power: PowerArbiter,
    pub(crate) events: EventScheduler,
    pub(crate) humidity_bus: I2cEngine<B::Bus0>,
    pub(crate) pressure_bus: I2cEngine<B::Bus1>,
    pub(crate) humidity: Si7021,
    pub(crate) pressure: Bmp280,
    battery: BatteryMonitor<B::Adc>,
    rotation: RotationEngine,
    tick: B::Tick,
    measure: B::Measure,
    battery_timer: B::BatteryTimer,
    leds: B::Leds,
    sleep: B::Sleep,
    composer: Composer,
    pixels: PixelBuffer,
    mode: DisplayMode,
    readings: Readings,
    fault: Option<Fault>,
}

impl<B: Board> App<B> {
    /// Take ownership of the peripherals
    ///
    /// Nothing runs until [`boot`](Self::boot).
    pub fn new(peripherals: Peripherals<B>, config: WhirlConfig) -> Self {
        let i2c_block = config.power.i2c_block;
        Self {
            config,
            power: PowerArbiter::new(),
            events: EventScheduler::new(),
            humidity_bus: I2cEngine::new(BusId::Bus0, peripherals.bus0, i2c_block),
            pressure_bus: I2cEngine::new(BusId::Bus1, peripherals.bus1, i2c_block),
            humidity: Si7021::new(config.sensors.humidity_address),
            pressure: Bmp280::new(config.sensors.pressure_address),
            battery: BatteryMonitor::new(peripherals.adc, config.battery, config.power.adc_block),
            rotation: RotationEngine::new(config.geometry),
            tick: peripherals.tick,
            measure: peripherals.measure,
            battery_timer: peripherals.battery_timer,
            leds: peripherals.leds,
            sleep: peripherals.sleep,
            composer: Composer::new(),
            pixels: PixelBuffer::new(),
            mode: DisplayMode::default(),
            readings: Readings::default(),
            fault: None,
        }
    }

    /// Reset the core state, hold the system sleep floor and post
    /// [`Event::BootUp`]
    pub fn boot(&mut self) {
        self.power.reset();
        self.events.reset();
        self.fault = None;

        let result = self.boot_inner();
        self.check(result);
    }

    fn boot_inner(&mut self) -> Result<(), Fault> {
        self.power.block(self.config.power.system_floor)?;
        self.humidity_bus.reset(&self.power)?;
        self.pressure_bus.reset(&self.power)?;
        if self.leds.blank().is_err() {
            return Err(Fault::LedStrip);
        }
        info!("boot, mode {:?}", self.mode);
        self.events.post(Event::BootUp);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Interrupt entry points
    // ---------------------------------------------------------------------

    /// Hall sensor edge
    ///
    /// Also restarts the measure timer, which doubles as the stall timeout.
    pub fn on_hall_edge(&mut self) {
        if self.fault.is_some() {
            return;
        }
        let action = self.rotation.on_hall_edge(&mut self.measure, &mut self.tick);
        self.apply(action);
    }

    /// Tick timer overflow
    pub fn on_tick_overflow(&mut self) {
        if self.fault.is_some() {
            return;
        }
        let action = self.rotation.on_tick_overflow(&mut self.tick);
        self.apply(action);
    }

    /// Tick timer compare match
    pub fn on_tick_compare(&mut self) {
        if self.fault.is_some() {
            return;
        }
        let action = self.rotation.on_tick_compare(&mut self.tick);
        self.apply(action);
    }

    /// Measure timer overflow: no hall edge for the whole timeout
    pub fn on_stall_timeout(&mut self) {
        if self.fault.is_some() {
            return;
        }
        let action = self.rotation.on_stall_timeout(&mut self.tick);
        self.apply(action);
        self.measure.restart();
        self.events.post(Event::RotationStalled);
    }

    /// I2C controller interrupt
    pub fn on_i2c_interrupt(&mut self, bus: BusId) {
        if self.fault.is_some() {
            return;
        }
        let result = match bus {
            BusId::Bus0 => self.humidity_bus.service(&self.power, &self.events),
            BusId::Bus1 => self.pressure_bus.service(&self.power, &self.events),
        };
        self.check(result.map_err(Fault::from));
    }

    /// Button press
    pub fn on_button(&mut self, button: Button) {
        if self.fault.is_some() {
            return;
        }
        self.events.post(match button {
            Button::Previous => Event::ButtonPrevious,
            Button::Next => Event::ButtonNext,
        });
    }

    /// Battery poll timer period elapsed
    pub fn on_battery_timer(&mut self) {
        if self.fault.is_some() {
            return;
        }
        self.events.post(Event::BatteryPoll);
    }

    /// Battery ADC conversion complete
    pub fn on_adc_complete(&mut self) {
        if self.fault.is_some() {
            return;
        }
        let result = self.battery.on_conversion_complete(&self.power);
        self.check(result.map_err(Fault::from));
    }

    fn apply(&mut self, action: TickAction) {
        match action {
            TickAction::None => {}
            TickAction::BeginFrame => {
                let frame = self.composer.render(self.mode, &self.readings);
                rasterize(&frame, &mut self.pixels);
                self.events.post(Event::FrameStarted);
            }
            TickAction::ShowColumn(index) => {
                let result = match self.pixels.column(index) {
                    Some(column) => self.leds.write(column),
                    None => Ok(()),
                };
                if result.is_err() {
                    self.latch(Fault::LedStrip);
                }
            }
            TickAction::Blank => {
                if self.leds.blank().is_err() {
                    self.latch(Fault::LedStrip);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Thread context
    // ---------------------------------------------------------------------

    /// Handle every event pending at the time of the call, in ascending
    /// order
    ///
    /// Each bit is cleared just before its handler runs, so a handler can
    /// post its own event again. Returns the number of handlers run.
    pub fn run_scheduled_events(&mut self) -> usize {
        let mut handled = 0;
        for event in self.events.pending().iter() {
            if self.fault.is_some() {
                break;
            }
            self.events.clear(event);
            trace!("event {:?}", event);
            let result = self.dispatch(event);
            self.check(result);
            handled += 1;
        }
        handled
    }

    /// Sleep as deep as the arbiter allows, if nothing is pending
    pub fn idle(&mut self) -> Option<EnergyMode> {
        if !self.events.is_idle() {
            return None;
        }
        self.power.enter(&mut self.sleep)
    }

    fn dispatch(&mut self, event: Event) -> Result<(), Fault> {
        match event {
            Event::BootUp => self.on_boot_up(),
            Event::ButtonPrevious => self.change_mode(self.mode.previous()),
            Event::ButtonNext => self.change_mode(self.mode.next()),
            Event::FrameStarted => self.on_frame_started(),
            Event::RotationStalled => self.show_menu(),
            Event::HumidityReady => {
                self.readings.humidity = self.humidity.on_humidity(self.humidity_bus.last_word())?;
                self.humidity.read_temperature(&mut self.humidity_bus, &self.power)?;
                Ok(())
            }
            Event::HumidityTemperatureReady => {
                self.readings.temperature_f =
                    self.humidity.on_temperature(self.humidity_bus.last_word())?;
                Ok(())
            }
            Event::PressureSetupStep => {
                let word = self.pressure_bus.last_word();
                let state = self.pressure.on_setup_step(&mut self.pressure_bus, &self.power, word)?;
                if state == SetupState::Ready {
                    info!("pressure sensor calibrated");
                }
                Ok(())
            }
            Event::PressureTemperatureReady => {
                self.pressure.on_temperature(self.pressure_bus.last_word())?;
                self.pressure.read_pressure(&mut self.pressure_bus, &self.power)?;
                Ok(())
            }
            Event::PressureReady => {
                self.readings.pressure_hpa = self.pressure.on_pressure(self.pressure_bus.last_word())?;
                if let Some(altitude) = self.pressure.altitude_m(self.config.sensors.sea_level_pa) {
                    self.readings.altitude_m = altitude;
                }
                Ok(())
            }
            Event::BatteryPoll => {
                self.battery.poll(&self.power)?;
                let was_low = self.readings.battery_low;
                self.readings.battery_low = self.battery.is_low();
                self.readings.battery_percent = self.battery.percent();
                if self.readings.battery_low && !was_low {
                    warn!("battery low");
                }
                Ok(())
            }
        }
    }

    fn on_boot_up(&mut self) -> Result<(), Fault> {
        self.power.block(self.config.power.timer_block)?;
        self.measure.start();
        self.battery_timer.start();
        self.pressure.begin_setup(&mut self.pressure_bus, &self.power)?;
        info!("timers started, pressure sensor setup begun");
        Ok(())
    }

    fn change_mode(&mut self, mode: DisplayMode) -> Result<(), Fault> {
        self.mode = mode;
        info!("mode {:?}", mode);
        if self.rotation.is_stalled() {
            self.show_menu()?;
        }
        Ok(())
    }

    /// Refresh whatever sensor the current mode shows
    fn on_frame_started(&mut self) -> Result<(), Fault> {
        match self.mode.data_source() {
            None => {}
            Some(DataSource::Humidity) => {
                if self.humidity_bus.is_busy() {
                    debug!("humidity bus busy, refresh skipped");
                } else {
                    self.humidity.read_humidity(&mut self.humidity_bus, &self.power)?;
                }
            }
            Some(DataSource::Pressure) => {
                if !self.pressure.is_ready() {
                    debug!("pressure sensor not calibrated yet, refresh skipped");
                } else if self.pressure_bus.is_busy() {
                    debug!("pressure bus busy, refresh skipped");
                } else {
                    self.pressure.read_temperature(&mut self.pressure_bus, &self.power)?;
                }
            }
        }
        Ok(())
    }

    fn show_menu(&mut self) -> Result<(), Fault> {
        let column: Column = menu_column(self.mode);
        self.leds.write(&column).map_err(|_| Fault::LedStrip)
    }

    fn check(&mut self, result: Result<(), Fault>) {
        if let Err(fault) = result {
            self.latch(fault);
        }
    }

    fn latch(&mut self, fault: Fault) {
        error!("fault latched: {:?}", fault);
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &WhirlConfig {
        &self.config
    }

    /// Latched fault, if any
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Cached sensor and battery values the composer draws from
    pub fn readings(&self) -> &Readings {
        &self.readings
    }

    pub fn power(&self) -> &PowerArbiter {
        &self.power
    }

    pub fn events(&self) -> &EventScheduler {
        &self.events
    }

    pub fn rotation(&self) -> &RotationEngine {
        &self.rotation
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn humidity_bus(&self) -> &I2cEngine<B::Bus0> {
        &self.humidity_bus
    }

    pub fn pressure_bus(&self) -> &I2cEngine<B::Bus1> {
        &self.pressure_bus
    }

    pub fn humidity_sensor(&self) -> &Si7021 {
        &self.humidity
    }

    pub fn pressure_sensor(&self) -> &Bmp280 {
        &self.pressure
    }

    pub fn battery(&self) -> &BatteryMonitor<B::Adc> {
        &self.battery
    }

    pub fn leds(&self) -> &B::Leds {
        &self.leds
    }

    pub fn sleep(&self) -> &B::Sleep {
        &self.sleep
    }
}
