//! Simulated timers, LED strip, ADC and sleep
//!
//! Every peripheral is a cheap handle onto shared state, so the simulation
//! loop can keep a clone to inspect what the application did with the one
//! it owns.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use whirl_hal::{AdcChannel, Column, EnergyMode, IntervalTimer, LedStrip, LowPowerWait, TickTimer};

/// Simulated time in timer ticks
#[derive(Debug, Clone, Default)]
pub struct Clock(Rc<Cell<u64>>);

impl Clock {
    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn set(&self, now: u64) {
        self.0.set(now);
    }
}

#[derive(Debug, Default)]
struct TickState {
    started_at: u64,
    top: u32,
    compare: u32,
    compare_armed: bool,
    running: bool,
}

/// One-shot tick timer
#[derive(Debug, Clone, Default)]
pub struct SimTick {
    clock: Clock,
    state: Rc<RefCell<TickState>>,
}

impl SimTick {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            state: Rc::default(),
        }
    }

    /// Absolute time of the next compare match, if armed before the top
    pub fn next_compare(&self) -> Option<u64> {
        let s = self.state.borrow();
        (s.running && s.compare_armed && s.compare < s.top).then(|| s.started_at + u64::from(s.compare))
    }

    /// Absolute time the count reaches the top
    pub fn next_overflow(&self) -> Option<u64> {
        let s = self.state.borrow();
        s.running.then(|| s.started_at + u64::from(s.top))
    }

    /// Consume the compare match about to be delivered
    pub fn fire_compare(&self) {
        self.state.borrow_mut().compare_armed = false;
    }

    /// One-shot: the timer halts at the top
    pub fn fire_overflow(&self) {
        self.state.borrow_mut().running = false;
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().running
    }
}

impl TickTimer for SimTick {
    fn start(&mut self, top: u32, compare: u32) {
        let mut s = self.state.borrow_mut();
        s.started_at = self.clock.now();
        s.top = top;
        s.compare = compare;
        s.compare_armed = true;
        s.running = true;
    }

    fn set_compare(&mut self, compare: u32) {
        let mut s = self.state.borrow_mut();
        s.compare = compare;
        s.compare_armed = true;
    }

    fn compare(&self) -> u32 {
        self.state.borrow().compare
    }

    fn stop(&mut self) {
        self.state.borrow_mut().running = false;
    }
}

#[derive(Debug, Default)]
struct IntervalState {
    started_at: u64,
    running: bool,
}

/// Free-running timer with a fixed overflow period
///
/// Serves as the measure timer (period = stall timeout) and the battery
/// poll timer.
#[derive(Debug, Clone)]
pub struct SimInterval {
    clock: Clock,
    period: u64,
    state: Rc<RefCell<IntervalState>>,
}

impl SimInterval {
    pub fn new(clock: Clock, period: u64) -> Self {
        Self {
            clock,
            period,
            state: Rc::default(),
        }
    }

    /// Absolute time of the next overflow
    pub fn next_overflow(&self) -> Option<u64> {
        let s = self.state.borrow();
        s.running.then(|| s.started_at + self.period)
    }

    /// Overflow wraps the count to zero and keeps running
    pub fn fire_overflow(&self) {
        self.state.borrow_mut().started_at = self.clock.now();
    }
}

impl IntervalTimer for SimInterval {
    fn start(&mut self) {
        let mut s = self.state.borrow_mut();
        s.started_at = self.clock.now();
        s.running = true;
    }

    fn stop(&mut self) {
        self.state.borrow_mut().running = false;
    }

    fn restart(&mut self) -> u32 {
        let now = self.clock.now();
        let mut s = self.state.borrow_mut();
        let elapsed = now.saturating_sub(s.started_at);
        s.started_at = now;
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }
}

/// LED strip that records every column written
#[derive(Debug, Clone, Default)]
pub struct SimLeds {
    writes: Rc<RefCell<Vec<Column>>>,
}

impl SimLeds {
    pub fn writes(&self) -> Vec<Column> {
        self.writes.borrow().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn last(&self) -> Option<Column> {
        self.writes.borrow().last().copied()
    }

    pub fn clear(&self) {
        self.writes.borrow_mut().clear();
    }
}

impl LedStrip for SimLeds {
    type Error = core::convert::Infallible;

    fn write(&mut self, column: &Column) -> Result<(), Self::Error> {
        self.writes.borrow_mut().push(*column);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct AdcState {
    counts: u16,
    latched: u16,
    converting_since: Option<u64>,
}

/// Battery ADC channel with a fixed conversion latency
#[derive(Debug, Clone)]
pub struct SimAdc {
    clock: Clock,
    latency: u64,
    state: Rc<RefCell<AdcState>>,
}

impl SimAdc {
    pub fn new(clock: Clock, latency: u64) -> Self {
        Self {
            clock,
            latency,
            state: Rc::default(),
        }
    }

    /// Set the voltage the next conversion will see, as raw counts
    pub fn set_counts(&self, counts: u16) {
        self.state.borrow_mut().counts = counts;
    }

    pub fn next_completion(&self) -> Option<u64> {
        self.state
            .borrow()
            .converting_since
            .map(|since| since + self.latency)
    }

    /// Latch the conversion result
    pub fn fire_completion(&self) {
        let mut s = self.state.borrow_mut();
        s.latched = s.counts;
        s.converting_since = None;
    }
}

impl AdcChannel for SimAdc {
    fn start_conversion(&mut self) {
        self.state.borrow_mut().converting_since = Some(self.clock.now());
    }

    fn last_reading(&self) -> u16 {
        self.state.borrow().latched
    }
}

/// Records the energy mode of every sleep
#[derive(Debug, Clone, Default)]
pub struct SimSleep {
    entries: Rc<RefCell<[u64; EnergyMode::COUNT]>>,
}

impl SimSleep {
    /// Number of sleeps taken in `mode`
    pub fn count(&self, mode: EnergyMode) -> u64 {
        self.entries.borrow()[mode.index()]
    }

    pub fn total(&self) -> u64 {
        self.entries.borrow().iter().sum()
    }
}

impl LowPowerWait for SimSleep {
    fn wait(&mut self, mode: EnergyMode) {
        self.entries.borrow_mut()[mode.index()] += 1;
    }
}
