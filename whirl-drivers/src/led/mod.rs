//! LED strip drivers

pub mod ws2812;

pub use ws2812::{encode_column, Ws2812, BYTES_PER_COLUMN, BYTES_PER_LED};
