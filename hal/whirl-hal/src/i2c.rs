//! I2C controller abstractions
//!
//! The transaction engine does not use blocking read/write calls. It issues
//! one bus command at a time and reacts to the controller's interrupt flags,
//! so the trait exposes exactly those primitives.

/// A single command written to the controller's command register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusCommand {
    /// (Repeated) START condition
    Start,
    /// Load a byte into the transmit buffer
    Transmit(u8),
    /// Acknowledge the byte just received
    Ack,
    /// Not-acknowledge the byte just received
    Nack,
    /// STOP condition
    Stop,
}

/// Interrupt classes raised by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptKind {
    /// Target acknowledged the last byte
    Ack,
    /// Target did not acknowledge the last byte
    Nack,
    /// Receive buffer holds a byte
    RxDataValid,
    /// STOP condition has completed
    Stop,
}

impl InterruptKind {
    /// Servicing order when several flags are pending at once
    pub const ORDER: [InterruptKind; 4] = [
        InterruptKind::Ack,
        InterruptKind::Nack,
        InterruptKind::RxDataValid,
        InterruptKind::Stop,
    ];

    const fn mask(self) -> u8 {
        match self {
            InterruptKind::Ack => 1 << 0,
            InterruptKind::Nack => 1 << 1,
            InterruptKind::RxDataValid => 1 << 2,
            InterruptKind::Stop => 1 << 3,
        }
    }
}

/// Snapshot of pending interrupt flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusInterrupts(u8);

impl BusInterrupts {
    /// No flags pending
    pub const NONE: Self = Self(0);

    /// Build a set holding a single flag
    pub const fn only(kind: InterruptKind) -> Self {
        Self(kind.mask())
    }

    /// Add a flag
    pub fn insert(&mut self, kind: InterruptKind) {
        self.0 |= kind.mask();
    }

    /// Check whether a flag is pending
    pub const fn contains(self, kind: InterruptKind) -> bool {
        self.0 & kind.mask() != 0
    }

    /// True when no flag is pending
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Pending flags in servicing order
    pub fn iter(self) -> impl Iterator<Item = InterruptKind> {
        InterruptKind::ORDER
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

/// Interrupt-driven I2C controller
///
/// Implementations map these calls onto the controller's command and
/// data registers. None of them may block.
pub trait I2cController {
    /// Write a command to the controller
    fn issue(&mut self, command: BusCommand);

    /// Read the receive buffer, clearing its data-valid flag
    fn read_data(&mut self) -> u8;

    /// Read and clear the pending interrupt flags
    fn take_interrupts(&mut self) -> BusInterrupts;

    /// Abort whatever is on the wire and return the bus to idle
    fn reset_bus(&mut self);
}
