//! WS2812 column driver over SPI
//!
//! Each WS2812 bit is stretched into one SPI byte clocked at roughly
//! 6.4 MHz, so the high time of the pulse is set by how many leading ones
//! the byte carries:
//!
//! | Data bit | SPI byte | High time |
//! |----------|----------|-----------|
//! | 1        | `0xFC`   | 6/8 bit   |
//! | 0        | `0xC0`   | 2/8 bit   |
//!
//! Colours go out green, red, blue, most significant bit first.

use embedded_hal::spi::SpiBus;
use whirl_hal::{Column, Grb, LedStrip, LEDS_PER_COLUMN};

/// SPI byte for a one bit
pub const ONE: u8 = 0xFC;
/// SPI byte for a zero bit
pub const ZERO: u8 = 0xC0;

pub const BYTES_PER_LED: usize = 24;
pub const BYTES_PER_COLUMN: usize = BYTES_PER_LED * LEDS_PER_COLUMN;

fn encode_channel(value: u8, out: &mut [u8]) {
    for (bit, byte) in out.iter_mut().enumerate() {
        *byte = if value & (0x80 >> bit) != 0 { ONE } else { ZERO };
    }
}

fn encode_led(led: Grb, out: &mut [u8]) {
    let (g, rest) = out.split_at_mut(8);
    let (r, b) = rest.split_at_mut(8);
    encode_channel(led.g, g);
    encode_channel(led.r, r);
    encode_channel(led.b, b);
}

/// Expand a column into its SPI byte stream
pub fn encode_column(column: &Column, out: &mut [u8; BYTES_PER_COLUMN]) {
    for (led, chunk) in column.iter().zip(out.chunks_exact_mut(BYTES_PER_LED)) {
        encode_led(*led, chunk);
    }
}

/// WS2812 strip on an SPI bus (MOSI only)
pub struct Ws2812<SPI> {
    spi: SPI,
    buffer: [u8; BYTES_PER_COLUMN],
}

impl<SPI: SpiBus<u8>> Ws2812<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            buffer: [ZERO; BYTES_PER_COLUMN],
        }
    }

    /// Release the SPI bus
    pub fn free(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiBus<u8>> LedStrip for Ws2812<SPI> {
    type Error = SPI::Error;

    fn write(&mut self, column: &Column) -> Result<(), Self::Error> {
        encode_column(column, &mut self.buffer);
        self.spi.write(&self.buffer)?;
        self.spi.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::spi::ErrorType;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockSpi {
        written: Vec<u8>,
        flushes: u32,
    }

    impl ErrorType for MockSpi {
        type Error = Infallible;
    }

    impl SpiBus<u8> for MockSpi {
        fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            words.fill(0);
            Ok(())
        }

        fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
            self.written.extend_from_slice(words);
            Ok(())
        }

        fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
            self.written.extend_from_slice(write);
            read.fill(0);
            Ok(())
        }

        fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
            self.written.extend_from_slice(words);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_channel_msb_first() {
        let mut out = [0u8; 8];
        encode_channel(0b1000_0001, &mut out);
        assert_eq!(out, [ONE, ZERO, ZERO, ZERO, ZERO, ZERO, ZERO, ONE]);
    }

    #[test]
    fn test_led_is_green_red_blue() {
        let mut out = [0u8; BYTES_PER_LED];
        encode_led(Grb::new(0xFF, 0x00, 0x80), &mut out);
        assert!(out[..8].iter().all(|b| *b == ONE));
        assert!(out[8..16].iter().all(|b| *b == ZERO));
        assert_eq!(out[16], ONE);
        assert!(out[17..].iter().all(|b| *b == ZERO));
    }

    #[test]
    fn test_dark_column_is_all_zero_bits() {
        let mut out = [0u8; BYTES_PER_COLUMN];
        encode_column(&[Grb::OFF; LEDS_PER_COLUMN], &mut out);
        assert!(out.iter().all(|b| *b == ZERO));
    }

    #[test]
    fn test_write_sends_whole_column_and_flushes() {
        let mut strip = Ws2812::new(MockSpi::default());
        let mut column = [Grb::OFF; LEDS_PER_COLUMN];
        column[11] = Grb::new(0, 0, 1);

        strip.write(&column).unwrap();

        let spi = strip.free();
        assert_eq!(spi.written.len(), BYTES_PER_COLUMN);
        assert_eq!(spi.flushes, 1);
        assert_eq!(spi.written[BYTES_PER_COLUMN - 1], ONE);
        assert_eq!(spi.written[BYTES_PER_COLUMN - 2], ZERO);
    }

    #[test]
    fn test_blank_writes_dark_column() {
        let mut strip = Ws2812::new(MockSpi::default());
        strip.blank().unwrap();
        let spi = strip.free();
        assert_eq!(spi.written.len(), BYTES_PER_COLUMN);
        assert!(spi.written.iter().all(|b| *b == ZERO));
    }
}
