//! Frame rasterisation

use whirl_hal::{Column, Grb, LEDS_PER_COLUMN};

use super::font::{glyph, pixel};
use super::frame::Frame;
use super::mode::DisplayMode;
use super::{CELLS, CELL_WIDTH, COLUMNS, GLYPH_HEIGHT, GLYPH_WIDTH};

const MENU_COLOR: Grb = Grb::new(8, 0, 0);

/// Angular pixel buffer: one [`Column`] per display column
///
/// LEDs `0..6` carry the bottom text row, `6..12` the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    columns: [Column; COLUMNS],
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PixelBuffer {
    /// All LEDs dark
    pub const fn new() -> Self {
        Self {
            columns: [[Grb::OFF; LEDS_PER_COLUMN]; COLUMNS],
        }
    }

    /// Rasterise a frame into a fresh buffer
    pub fn from_frame(frame: &Frame) -> Self {
        let mut buffer = Self::new();
        rasterize(frame, &mut buffer);
        buffer
    }

    /// Column at an angular position, if in range
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[Column; COLUMNS] {
        &self.columns
    }

    pub fn clear(&mut self) {
        self.columns = [[Grb::OFF; LEDS_PER_COLUMN]; COLUMNS];
    }
}

/// Draw a frame into the pixel buffer
///
/// Every column is overwritten, including the spacer after each glyph.
pub fn rasterize(frame: &Frame, buffer: &mut PixelBuffer) {
    buffer.clear();
    draw_row(buffer, frame.bottom(), frame.bottom_colors(), 0);
    draw_row(buffer, frame.top(), frame.top_colors(), GLYPH_HEIGHT);
}

fn draw_row(buffer: &mut PixelBuffer, text: &str, colors: &[Grb; CELLS], led_offset: usize) {
    for (cell, (c, color)) in text.chars().zip(colors.iter()).take(CELLS).enumerate() {
        let bits = glyph(c);
        for x in 0..GLYPH_WIDTH {
            let column = &mut buffer.columns[cell * CELL_WIDTH + x];
            for y in 0..GLYPH_HEIGHT {
                column[led_offset + y] = color.gated(pixel(bits, x, y));
            }
        }
    }
}

/// Column shown while the rotor is stopped: one LED marks the mode
pub fn menu_column(mode: DisplayMode) -> Column {
    let mut column = [Grb::OFF; LEDS_PER_COLUMN];
    column[mode.index() % LEDS_PER_COLUMN] = MENU_COLOR;
    column
}
