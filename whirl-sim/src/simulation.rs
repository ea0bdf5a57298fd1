//! Discrete-event simulation of the spinning board
//!
//! Time advances from one peripheral deadline to the next. At each
//! deadline the matching interrupt entry point runs, then the I2C buses are
//! serviced and the event dispatcher drained until the system is quiet,
//! and finally the application is allowed to sleep. I2C traffic takes no
//! simulated time.

use whirl_app::{App, Board, Button, Peripherals};
use whirl_core::config::WhirlConfig;
use whirl_core::i2c::BusId;

use crate::bus::SimI2c;
use crate::devices::{SimBmp280, SimSi7021};
use crate::peripherals::{Clock, SimAdc, SimInterval, SimLeds, SimSleep, SimTick};

/// Peripheral types of the simulated board
pub struct SimBoard;

impl Board for SimBoard {
    type Bus0 = SimI2c<SimSi7021>;
    type Bus1 = SimI2c<SimBmp280>;
    type Tick = SimTick;
    type Measure = SimInterval;
    type BatteryTimer = SimInterval;
    type Leds = SimLeds;
    type Adc = SimAdc;
    type Sleep = SimSleep;
}

/// Timing of the simulated hardware, in timer ticks
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Hall interval across the short arc (the one before the display)
    pub short_interval: u32,
    /// Hall interval across the long arc (the one that holds the display)
    pub long_interval: u32,
    /// Measure timer period; no edge for this long is a stall
    pub stall_timeout: u32,
    /// Battery poll timer period
    pub battery_period: u32,
    /// ADC conversion time
    pub adc_latency: u32,
}

impl SimConfig {
    /// Magnets 110° apart, 100 ticks per degree
    pub const DEFAULT: Self = Self {
        short_interval: 11_000,
        long_interval: 25_000,
        stall_timeout: 100_000,
        battery_period: 50_000,
        adc_latency: 10,
    };
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Hall sensor on a rotor with two unevenly spaced magnets
#[derive(Debug, Clone, Copy)]
struct Rotor {
    spinning: bool,
    last_edge: u64,
    next_is_short: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    TickCompare,
    TickOverflow,
    HallEdge,
    Stall,
    BatteryTimer,
    AdcComplete,
}

/// Bound on bus/dispatch rounds after one interrupt
const MAX_SETTLE_ROUNDS: u32 = 1_000;

/// The simulated board running the application
pub struct Simulation {
    config: SimConfig,
    app: App<SimBoard>,
    clock: Clock,
    bus0: SimI2c<SimSi7021>,
    bus1: SimI2c<SimBmp280>,
    tick: SimTick,
    measure: SimInterval,
    battery_timer: SimInterval,
    leds: SimLeds,
    adc: SimAdc,
    sleep: SimSleep,
    rotor: Rotor,
}

impl Simulation {
    pub fn new(config: SimConfig, app_config: WhirlConfig) -> Self {
        Self::with_devices(config, app_config, SimSi7021::default(), SimBmp280::default())
    }

    pub fn with_devices(
        config: SimConfig,
        app_config: WhirlConfig,
        humidity: SimSi7021,
        pressure: SimBmp280,
    ) -> Self {
        let clock = Clock::default();
        let bus0 = SimI2c::new(humidity);
        let bus1 = SimI2c::new(pressure);
        let tick = SimTick::new(clock.clone());
        let measure = SimInterval::new(clock.clone(), u64::from(config.stall_timeout));
        let battery_timer = SimInterval::new(clock.clone(), u64::from(config.battery_period));
        let leds = SimLeds::default();
        let adc = SimAdc::new(clock.clone(), u64::from(config.adc_latency));
        let sleep = SimSleep::default();

        // Fully charged until a test says otherwise
        adc.set_counts(app_config.battery.adc_full_scale);

        let app = App::new(
            Peripherals {
                bus0: bus0.clone(),
                bus1: bus1.clone(),
                tick: tick.clone(),
                measure: measure.clone(),
                battery_timer: battery_timer.clone(),
                leds: leds.clone(),
                adc: adc.clone(),
                sleep: sleep.clone(),
            },
            app_config,
        );

        Self {
            config,
            app,
            clock,
            bus0,
            bus1,
            tick,
            measure,
            battery_timer,
            leds,
            adc,
            sleep,
            rotor: Rotor {
                spinning: false,
                last_edge: 0,
                next_is_short: false,
            },
        }
    }

    /// Boot the application and let it settle
    pub fn boot(&mut self) {
        self.app.boot();
        self.settle();
    }

    /// Start or stop the rotor
    ///
    /// A starting rotor's first interval is the long arc.
    pub fn set_spinning(&mut self, spinning: bool) {
        if spinning && !self.rotor.spinning {
            self.rotor.last_edge = self.clock.now();
            self.rotor.next_is_short = false;
        }
        self.rotor.spinning = spinning;
    }

    /// Press a button and let the application react
    pub fn press(&mut self, button: Button) {
        self.app.on_button(button);
        self.settle();
    }

    /// Run until `duration` ticks from now have elapsed
    pub fn run_for(&mut self, duration: u64) {
        let end = self.clock.now() + duration;
        while self.step(end) {}
        self.clock.set(end);
    }

    /// Run `count` full rotations
    pub fn run_rotations(&mut self, count: u64) {
        let period = u64::from(self.config.short_interval) + u64::from(self.config.long_interval);
        self.run_for(period * count);
    }

    /// Advance to the next deadline before `end` and deliver it
    ///
    /// Returns `false` once nothing is due before `end`.
    pub fn step(&mut self, end: u64) -> bool {
        let Some((at, deadline)) = self.next_deadline() else {
            return false;
        };
        if at > end {
            return false;
        }
        self.clock.set(at.max(self.clock.now()));
        self.deliver(deadline);
        self.settle();
        true
    }

    fn next_deadline(&self) -> Option<(u64, Deadline)> {
        let rotor = self.rotor.spinning.then(|| {
            let interval = if self.rotor.next_is_short {
                self.config.short_interval
            } else {
                self.config.long_interval
            };
            self.rotor.last_edge + u64::from(interval)
        });

        // Ties resolve in this order
        [
            (self.tick.next_compare(), Deadline::TickCompare),
            (self.tick.next_overflow(), Deadline::TickOverflow),
            (rotor, Deadline::HallEdge),
            (self.measure.next_overflow(), Deadline::Stall),
            (self.battery_timer.next_overflow(), Deadline::BatteryTimer),
            (self.adc.next_completion(), Deadline::AdcComplete),
        ]
        .into_iter()
        .filter_map(|(at, deadline)| at.map(|at| (at, deadline)))
        .min_by_key(|(at, _)| *at)
    }

    fn deliver(&mut self, deadline: Deadline) {
        match deadline {
            Deadline::TickCompare => {
                self.tick.fire_compare();
                self.app.on_tick_compare();
            }
            Deadline::TickOverflow => {
                self.tick.fire_overflow();
                self.app.on_tick_overflow();
            }
            Deadline::HallEdge => {
                self.rotor.last_edge = self.clock.now();
                self.rotor.next_is_short = !self.rotor.next_is_short;
                self.app.on_hall_edge();
            }
            Deadline::Stall => {
                self.measure.fire_overflow();
                self.app.on_stall_timeout();
            }
            Deadline::BatteryTimer => {
                self.battery_timer.fire_overflow();
                self.app.on_battery_timer();
            }
            Deadline::AdcComplete => {
                self.adc.fire_completion();
                self.app.on_adc_complete();
            }
        }
    }

    /// Service buses and drain events until quiet, then sleep
    ///
    /// Takes no simulated time.
    pub fn settle(&mut self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let mut busy = false;
            if self.bus0.has_pending() {
                self.app.on_i2c_interrupt(BusId::Bus0);
                busy = true;
            }
            if self.bus1.has_pending() {
                self.app.on_i2c_interrupt(BusId::Bus1);
                busy = true;
            }
            if self.app.run_scheduled_events() > 0 {
                busy = true;
            }
            if !busy || self.app.fault().is_some() {
                break;
            }
        }
        self.app.idle();
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn app(&self) -> &App<SimBoard> {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App<SimBoard> {
        &mut self.app
    }

    /// Humidity sensor bus (bus 0)
    pub fn bus0(&self) -> &SimI2c<SimSi7021> {
        &self.bus0
    }

    /// Pressure sensor bus (bus 1)
    pub fn bus1(&self) -> &SimI2c<SimBmp280> {
        &self.bus1
    }

    pub fn leds(&self) -> &SimLeds {
        &self.leds
    }

    pub fn adc(&self) -> &SimAdc {
        &self.adc
    }

    pub fn sleep(&self) -> &SimSleep {
        &self.sleep
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
