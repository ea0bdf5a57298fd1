//! Interrupt-driven I2C transaction engine
//!
//! One [`I2cEngine`] per physical bus. A transaction is started from thread
//! context, then advanced one step per controller interrupt until the STOP
//! condition completes, at which point the engine releases its power block
//! and posts the caller's completion event.
//!
//! The protocol logic lives in [`transaction::transition`], a pure function
//! from (descriptor, interrupt) to (descriptor, bus commands). The engine
//! only applies those commands to the controller.

mod engine;
mod transaction;

pub use engine::I2cEngine;
pub use transaction::{
    transition, BusInterrupt, ByteOrder, Completion, Direction, Effects, Phase, ProtocolViolation,
    Transaction, TransferRequest, MAX_TRANSFER_BYTES,
};

use crate::power::PowerError;

/// Physical I2C controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    Bus0,
    Bus1,
}

/// I2C engine errors
///
/// Every variant is a programming error rather than a runtime condition;
/// the device-busy NACK is retried internally and never surfaces here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    /// A transaction is already in flight on this bus
    Busy(BusId),
    /// Byte count outside 1..=4
    InvalidByteCount(u8),
    /// Interrupt not valid in the current phase
    Protocol(ProtocolViolation),
    /// Power arbiter rejected the block/unblock
    Power(PowerError),
}

impl From<PowerError> for I2cError {
    fn from(err: PowerError) -> Self {
        I2cError::Power(err)
    }
}

impl From<ProtocolViolation> for I2cError {
    fn from(err: ProtocolViolation) -> Self {
        I2cError::Protocol(err)
    }
}

/// Reinterpret a two-byte result word as a two's-complement `i16`
///
/// Bit 15 is the sign bit. Returns `None` if the word carries more than
/// 16 significant bits, which means it came from a wider read.
pub fn word_to_i16(word: u32) -> Option<i16> {
    let narrow = u16::try_from(word).ok()?;
    Some(i16::from_ne_bytes(narrow.to_ne_bytes()))
}

/// Narrow a two-byte result word to `u16`
pub fn word_to_u16(word: u32) -> Option<u16> {
    u16::try_from(word).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_to_i16_sign_extension() {
        assert_eq!(word_to_i16(0x0000), Some(0));
        assert_eq!(word_to_i16(0x7FFF), Some(i16::MAX));
        assert_eq!(word_to_i16(0x8000), Some(i16::MIN));
        assert_eq!(word_to_i16(0xFFFF), Some(-1));
        assert_eq!(word_to_i16(0xD6D0), Some(-10544));
    }

    #[test]
    fn test_word_to_i16_rejects_wide_words() {
        assert_eq!(word_to_i16(0x1_0000), None);
        assert_eq!(word_to_u16(0x1_0000), None);
        assert_eq!(word_to_u16(0x6E9E), Some(0x6E9E));
    }
}
