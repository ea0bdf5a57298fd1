//! Event scheduler
//!
//! Interrupt handlers never run application logic directly. They post an
//! event bit here and return; the main loop drains the pending set and runs
//! the matching handlers in thread context.

use core::cell::Cell;

use critical_section::Mutex;

/// Deferred work identifiers
///
/// The discriminant is the bit index in the pending mask. Handlers run in
/// ascending discriminant order within one drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Event {
    /// System initialised, start timers and sensor setup
    BootUp = 0,
    /// Mode-select button 0 pressed
    ButtonPrevious = 1,
    /// Mode-select button 1 pressed
    ButtonNext = 2,
    /// A display sweep began; refresh the sensors the current mode shows
    FrameStarted = 3,
    /// No hall-sensor edge within the stall timeout
    RotationStalled = 4,
    /// Humidity conversion read back
    HumidityReady = 5,
    /// Humidity sensor's temperature read back
    HumidityTemperatureReady = 6,
    /// One step of the pressure sensor setup sequence finished
    PressureSetupStep = 7,
    /// Pressure sensor's temperature read back
    PressureTemperatureReady = 8,
    /// Pressure read back
    PressureReady = 9,
    /// Battery poll period elapsed
    BatteryPoll = 10,
}

impl Event {
    /// Every event in scan order
    pub const ALL: [Event; 11] = [
        Event::BootUp,
        Event::ButtonPrevious,
        Event::ButtonNext,
        Event::FrameStarted,
        Event::RotationStalled,
        Event::HumidityReady,
        Event::HumidityTemperatureReady,
        Event::PressureSetupStep,
        Event::PressureTemperatureReady,
        Event::PressureReady,
        Event::BatteryPoll,
    ];

    /// Bit in the pending mask
    pub const fn mask(self) -> u32 {
        1 << (self as u8)
    }
}

/// A set of events, iterated in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventSet(u32);

impl EventSet {
    pub const EMPTY: Self = Self(0);

    /// Raw bitmask
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, event: Event) -> bool {
        self.0 & event.mask() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, event: Event) {
        self.0 |= event.mask();
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Events in the set, lowest bit first
    pub fn iter(self) -> impl Iterator<Item = Event> {
        Event::ALL.into_iter().filter(move |e| self.contains(*e))
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        let mut set = EventSet::EMPTY;
        for event in iter {
            set.insert(event);
        }
        set
    }
}

/// Pending-event bitmask shared between interrupt and thread context
///
/// Every read-modify-write happens inside a critical section.
pub struct EventScheduler {
    pending: Mutex<Cell<u32>>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    /// Create a scheduler with nothing pending
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(0)),
        }
    }

    /// Drop everything pending
    pub fn reset(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(0));
    }

    /// Mark an event pending; posting twice before a drain runs it once
    pub fn post(&self, event: Event) {
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            cell.set(cell.get() | event.mask());
        });
    }

    /// Remove one event from the pending set
    ///
    /// The dispatcher calls this right before the handler runs, so a post
    /// arriving while the handler executes schedules another run.
    pub fn clear(&self, event: Event) {
        critical_section::with(|cs| {
            let cell = self.pending.borrow(cs);
            cell.set(cell.get() & !event.mask());
        });
    }

    /// Snapshot of the pending set
    pub fn pending(&self) -> EventSet {
        critical_section::with(|cs| EventSet(self.pending.borrow(cs).get()))
    }

    /// Atomically take and clear the whole pending set
    pub fn drain(&self) -> EventSet {
        critical_section::with(|cs| EventSet(self.pending.borrow(cs).replace(0)))
    }

    /// True when nothing is pending
    pub fn is_idle(&self) -> bool {
        self.pending().is_empty()
    }
}
