//! Display composer
//!
//! Turns the current display mode and the latest sensor readings into a
//! [`Frame`] of two text rows, then rasterises that frame into the
//! [`PixelBuffer`] the rotation engine sweeps out column by column.
//!
//! ```text
//! DisplayMode + Readings ──render──▶ Frame ──rasterize──▶ PixelBuffer
//!                                                     (96 columns × 12 LEDs)
//! ```

mod composer;
pub mod font;
mod frame;
mod mode;
mod raster;

pub use composer::{hsv_to_grb, render, Composer, HUE_STEP};
pub use frame::{Frame, Readings};
pub use mode::{DataSource, DisplayMode};
pub use raster::{menu_column, rasterize, PixelBuffer};
pub use whirl_hal::{Column, Grb, LEDS_PER_COLUMN};

/// Character cells per text row
pub const CELLS: usize = 16;

/// Glyph width in columns
pub const GLYPH_WIDTH: usize = 5;

/// Glyph height in LEDs
pub const GLYPH_HEIGHT: usize = 6;

/// Columns per cell: the glyph plus one blank spacer
pub const CELL_WIDTH: usize = GLYPH_WIDTH + 1;

/// Angular columns across the display arc
pub const COLUMNS: usize = CELLS * CELL_WIDTH;
