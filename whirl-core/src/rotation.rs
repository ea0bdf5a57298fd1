//! Rotation timing engine
//!
//! A hall sensor fires twice per rotation. The measure timer captures the
//! interval between edges; comparing each interval with the previous one
//! tells which half of the rotation the arm is entering. On the shorter
//! half the tick timer walks the arm through a dark lead-in, the display
//! arc (one compare per column), and back to dark.
//!
//! Zone detection compares only the two most recent intervals with no
//! hysteresis, so a momentary deceleration can be read as a zone change.

use whirl_hal::{IntervalTimer, TickTimer};

use crate::config::GeometryConfig;
use crate::display::COLUMNS;

/// Angular zone of the current rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Zone {
    /// Outbound half; nothing shown, waiting for the next edge
    Measuring,
    /// Dark lead-in before the first column
    TransitioningIn,
    /// Sweeping columns out on every compare
    Displaying,
    /// Display arc finished; dark until the next edge
    TransitioningOut,
}

/// What the caller must do after a timing interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickAction {
    /// Nothing to do
    None,
    /// Render the next frame into the pixel buffer; column 0 follows shortly
    BeginFrame,
    /// Write this pixel-buffer column to the LEDs
    ShowColumn(usize),
    /// Turn every LED off
    Blank,
}

/// Ticks per degree from two consecutive half-rotation intervals
///
/// Integer division, truncating toward zero: 359 + 361 ticks gives 2.
pub fn ticks_per_degree(first: u32, second: u32, degrees_per_rotation: u32) -> u32 {
    let sum = u64::from(first) + u64::from(second);
    let tpd = sum / u64::from(degrees_per_rotation.max(1));
    u32::try_from(tpd).unwrap_or(u32::MAX)
}

/// Rotation-phase state
#[derive(Debug, Clone)]
pub struct RotationEngine {
    geometry: GeometryConfig,
    zone: Zone,
    /// Ping-pong buffer of the last two intervals
    intervals: [u32; 2],
    /// Slot the next interval is written to
    slot: usize,
    ticks_per_degree: u32,
    /// Next pixel-buffer column to show
    cursor: usize,
    /// No edge within the stall timeout
    stalled: bool,
    /// Completed display sweeps
    frames: u32,
}

impl RotationEngine {
    /// Create an engine waiting for its first edges
    pub fn new(geometry: GeometryConfig) -> Self {
        Self {
            geometry,
            zone: Zone::Measuring,
            intervals: [0; 2],
            slot: 0,
            ticks_per_degree: 0,
            cursor: 0,
            stalled: false,
            frames: 0,
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn ticks_per_degree(&self) -> u32 {
        self.ticks_per_degree
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Last two intervals, in slot order
    pub fn intervals(&self) -> [u32; 2] {
        self.intervals
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Number of display sweeps completed
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Length of the dark lead-in
    pub fn dead_zone_ticks(&self) -> u32 {
        self.ticks_per_degree
            .saturating_mul(self.geometry.dead_zone_degrees)
    }

    /// Length of the display arc
    pub fn display_zone_ticks(&self) -> u32 {
        self.ticks_per_degree
            .saturating_mul(self.geometry.display_zone_degrees)
    }

    /// Ticks between column compares
    pub fn pixel_step_ticks(&self) -> u32 {
        let step = u64::from(self.ticks_per_degree) * u64::from(self.geometry.pixel_degrees_num)
            / u64::from(self.geometry.pixel_degrees_den.max(1));
        u32::try_from(step).unwrap_or(u32::MAX)
    }

    /// Hall-sensor edge
    ///
    /// Captures and restarts the measure timer. A longer interval than the
    /// previous one starts the outbound half; a shorter or equal one starts
    /// the dark lead-in and arms the tick timer for it.
    ///
    /// Returns [`TickAction::Blank`] if the edge cut a display sweep short.
    pub fn on_hall_edge<M: IntervalTimer, T: TickTimer>(
        &mut self,
        measure: &mut M,
        tick: &mut T,
    ) -> TickAction {
        let interval = measure.restart();
        let previous = self.intervals[self.slot ^ 1];
        self.intervals[self.slot] = interval;
        self.slot ^= 1;
        self.stalled = false;

        let cut_short = self.zone == Zone::Displaying;

        if interval > previous {
            self.zone = Zone::Measuring;
            if cut_short {
                tick.stop();
            }
        } else {
            self.ticks_per_degree =
                ticks_per_degree(interval, previous, self.geometry.degrees_per_rotation);
            self.zone = Zone::TransitioningIn;
            tick.start(self.dead_zone_ticks(), u32::MAX);
        }

        if cut_short {
            TickAction::Blank
        } else {
            TickAction::None
        }
    }

    /// Tick timer reached its top
    pub fn on_tick_overflow<T: TickTimer>(&mut self, tick: &mut T) -> TickAction {
        match self.zone {
            Zone::TransitioningIn => {
                self.cursor = 0;
                self.zone = Zone::Displaying;
                tick.start(self.display_zone_ticks(), self.pixel_step_ticks());
                TickAction::BeginFrame
            }
            Zone::Displaying => {
                tick.stop();
                self.zone = Zone::TransitioningOut;
                self.frames = self.frames.wrapping_add(1);
                TickAction::Blank
            }
            Zone::Measuring | Zone::TransitioningOut => {
                tick.stop();
                TickAction::None
            }
        }
    }

    /// Tick timer matched its compare value
    pub fn on_tick_compare<T: TickTimer>(&mut self, tick: &mut T) -> TickAction {
        if self.zone != Zone::Displaying || self.cursor >= COLUMNS {
            return TickAction::None;
        }
        let column = self.cursor;
        self.cursor += 1;
        let next = tick.compare().saturating_add(self.pixel_step_ticks());
        tick.set_compare(next);
        TickAction::ShowColumn(column)
    }

    /// No edge arrived within the stall timeout
    ///
    /// Stops the display timing. The next edge resumes measuring.
    pub fn on_stall_timeout<T: TickTimer>(&mut self, tick: &mut T) -> TickAction {
        tick.stop();
        let was_lit = self.zone == Zone::Displaying;
        self.stalled = true;
        self.zone = Zone::Measuring;
        self.intervals = [0; 2];
        if was_lit {
            TickAction::Blank
        } else {
            TickAction::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct MockTick {
        top: u32,
        compare: u32,
        running: bool,
        starts: u32,
    }

    impl TickTimer for MockTick {
        fn start(&mut self, top: u32, compare: u32) {
            self.top = top;
            self.compare = compare;
            self.running = true;
            self.starts += 1;
        }

        fn set_compare(&mut self, compare: u32) {
            self.compare = compare;
        }

        fn compare(&self) -> u32 {
            self.compare
        }

        fn stop(&mut self) {
            self.running = false;
        }
    }

    /// Measure timer that returns a preloaded count
    #[derive(Default)]
    struct MockMeasure {
        next: u32,
    }

    impl IntervalTimer for MockMeasure {
        fn start(&mut self) {}

        fn stop(&mut self) {}

        fn restart(&mut self) -> u32 {
            self.next
        }
    }

    fn make_engine() -> RotationEngine {
        RotationEngine::new(GeometryConfig::DEFAULT)
    }

    fn edge(engine: &mut RotationEngine, tick: &mut MockTick, interval: u32) -> TickAction {
        let mut measure = MockMeasure { next: interval };
        engine.on_hall_edge(&mut measure, tick)
    }

    #[test]
    fn test_truncation_boundary() {
        assert_eq!(ticks_per_degree(359, 361, 360), 2);
        assert_eq!(ticks_per_degree(359, 360, 360), 1);
        assert_eq!(ticks_per_degree(0, 0, 360), 0);
        assert_eq!(ticks_per_degree(u32::MAX, u32::MAX, 1), u32::MAX);
    }

    #[test]
    fn test_longer_interval_means_measuring() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();

        edge(&mut engine, &mut tick, 1000);
        assert_eq!(engine.zone(), Zone::Measuring);
        assert_eq!(tick.starts, 0);
    }

    #[test]
    fn test_shorter_interval_arms_dead_zone() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();

        edge(&mut engine, &mut tick, 361);
        edge(&mut engine, &mut tick, 359);

        assert_eq!(engine.zone(), Zone::TransitioningIn);
        assert_eq!(engine.ticks_per_degree(), 2);
        assert_eq!(tick.top, 200);
        assert_eq!(tick.compare, u32::MAX);
    }

    #[test]
    fn test_full_sweep() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();

        edge(&mut engine, &mut tick, 40_000);
        edge(&mut engine, &mut tick, 32_000);
        // (40000 + 32000) / 360
        assert_eq!(engine.ticks_per_degree(), 200);

        assert_eq!(engine.on_tick_overflow(&mut tick), TickAction::BeginFrame);
        assert_eq!(engine.zone(), Zone::Displaying);
        assert_eq!(tick.top, 27_000);
        assert_eq!(tick.compare, 281);

        for expected in 0..COLUMNS {
            assert_eq!(
                engine.on_tick_compare(&mut tick),
                TickAction::ShowColumn(expected)
            );
        }
        assert_eq!(tick.compare, 281 * (COLUMNS as u32 + 1));
        // Past the last column nothing more is shown
        assert_eq!(engine.on_tick_compare(&mut tick), TickAction::None);

        assert_eq!(engine.on_tick_overflow(&mut tick), TickAction::Blank);
        assert_eq!(engine.zone(), Zone::TransitioningOut);
        assert!(!tick.running);
        assert_eq!(engine.frames(), 1);
    }

    #[test]
    fn test_compare_ignored_outside_display() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();
        assert_eq!(engine.on_tick_compare(&mut tick), TickAction::None);
        assert_eq!(engine.cursor(), 0);
    }

    #[test]
    fn test_ping_pong_slots_alternate() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();

        edge(&mut engine, &mut tick, 10);
        edge(&mut engine, &mut tick, 20);
        assert_eq!(engine.intervals(), [10, 20]);
        edge(&mut engine, &mut tick, 30);
        assert_eq!(engine.intervals(), [30, 20]);
    }

    #[test]
    fn test_edge_during_display_blanks() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();

        edge(&mut engine, &mut tick, 2000);
        edge(&mut engine, &mut tick, 1000);
        engine.on_tick_overflow(&mut tick);
        assert_eq!(engine.zone(), Zone::Displaying);

        assert_eq!(edge(&mut engine, &mut tick, 5000), TickAction::Blank);
        assert_eq!(engine.zone(), Zone::Measuring);
        assert!(!tick.running);
    }

    #[test]
    fn test_stall_and_resume() {
        let mut engine = make_engine();
        let mut tick = MockTick::default();

        edge(&mut engine, &mut tick, 2000);
        edge(&mut engine, &mut tick, 1000);
        engine.on_stall_timeout(&mut tick);
        assert!(engine.is_stalled());
        assert_eq!(engine.zone(), Zone::Measuring);
        assert!(!tick.running);

        edge(&mut engine, &mut tick, 3000);
        assert!(!engine.is_stalled());
    }

    proptest! {
        #[test]
        fn test_ticks_per_degree_matches_sum(first in 0u32..10_000_000, second in 0u32..10_000_000) {
            let mut engine = make_engine();
            let mut tick = MockTick::default();

            edge(&mut engine, &mut tick, second);
            // Equal or shorter interval always enters the lead-in
            let shorter = first.min(second);
            edge(&mut engine, &mut tick, shorter);

            prop_assert_eq!(engine.zone(), Zone::TransitioningIn);
            prop_assert_eq!(engine.ticks_per_degree(), (shorter + second) / 360);
        }
    }
}
