//! Addressable LED abstractions

/// LEDs on the spinning arm
pub const LEDS_PER_COLUMN: usize = 12;

/// One LED colour in the strip's native channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Grb {
    pub g: u8,
    pub r: u8,
    pub b: u8,
}

impl Grb {
    /// All channels off
    pub const OFF: Self = Self::new(0, 0, 0);

    pub const fn new(g: u8, r: u8, b: u8) -> Self {
        Self { g, r, b }
    }

    /// Gate every channel on a single glyph bit
    pub const fn gated(self, on: bool) -> Self {
        if on {
            self
        } else {
            Self::OFF
        }
    }

    pub const fn is_off(&self) -> bool {
        self.g == 0 && self.r == 0 && self.b == 0
    }
}

/// One angular column: a colour per LED, index 0 nearest the hub
pub type Column = [Grb; LEDS_PER_COLUMN];

/// LED strip output
///
/// `write` returns once the column has been handed to the transmitter.
pub trait LedStrip {
    /// Error type for the underlying transport
    type Error;

    /// Show one column
    fn write(&mut self, column: &Column) -> Result<(), Self::Error>;

    /// Turn every LED off
    fn blank(&mut self) -> Result<(), Self::Error> {
        self.write(&[Grb::OFF; LEDS_PER_COLUMN])
    }
}
