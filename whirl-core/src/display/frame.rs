//! Display frame: two rows of text with a colour per cell

use heapless::String;
use whirl_hal::Grb;

use super::CELLS;

/// Latest cached sensor values the composer draws from
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Readings {
    /// Relative humidity (%)
    pub humidity: f32,
    /// Temperature from the humidity sensor (°F)
    pub temperature_f: f32,
    /// Barometric pressure (hPa)
    pub pressure_hpa: f32,
    /// Altitude estimate (m)
    pub altitude_m: f32,
    /// Battery charge estimate (%)
    pub battery_percent: f32,
    /// Too many consecutive low battery readings
    pub battery_low: bool,
}

/// One rendered frame
///
/// Both rows are exactly [`CELLS`] characters: shorter text is padded with
/// spaces and longer text is cut off.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    top: String<CELLS>,
    bottom: String<CELLS>,
    top_colors: [Grb; CELLS],
    bottom_colors: [Grb; CELLS],
}

impl Default for Frame {
    fn default() -> Self {
        Self::blank()
    }
}

impl Frame {
    /// Both rows blank and dark
    pub fn blank() -> Self {
        let mut frame = Self {
            top: String::new(),
            bottom: String::new(),
            top_colors: [Grb::OFF; CELLS],
            bottom_colors: [Grb::OFF; CELLS],
        };
        frame.set_top("");
        frame.set_bottom("");
        frame
    }

    /// Frame with each row in a single colour
    pub fn uniform(top: &str, top_color: Grb, bottom: &str, bottom_color: Grb) -> Self {
        let mut frame = Self::blank();
        frame.set_top(top);
        frame.set_bottom(bottom);
        frame.top_colors = [top_color; CELLS];
        frame.bottom_colors = [bottom_color; CELLS];
        frame
    }

    pub fn top(&self) -> &str {
        &self.top
    }

    pub fn bottom(&self) -> &str {
        &self.bottom
    }

    pub fn top_colors(&self) -> &[Grb; CELLS] {
        &self.top_colors
    }

    pub fn bottom_colors(&self) -> &[Grb; CELLS] {
        &self.bottom_colors
    }

    pub fn set_top(&mut self, text: &str) {
        fill_row(&mut self.top, text);
    }

    pub fn set_bottom(&mut self, text: &str) {
        fill_row(&mut self.bottom, text);
    }

    /// Colour cells `start..end` of the top row
    pub fn paint_top(&mut self, start: usize, end: usize, color: Grb) {
        paint(&mut self.top_colors, start, end, color);
    }

    /// Colour cells `start..end` of the bottom row
    pub fn paint_bottom(&mut self, start: usize, end: usize, color: Grb) {
        paint(&mut self.bottom_colors, start, end, color);
    }
}

fn fill_row(row: &mut String<CELLS>, text: &str) {
    row.clear();
    for c in text.chars() {
        if row.push(c).is_err() {
            break;
        }
    }
    while row.push(' ').is_ok() {}
}

fn paint(colors: &mut [Grb; CELLS], start: usize, end: usize, color: Grb) {
    let end = end.min(CELLS);
    if let Some(cells) = colors.get_mut(start..end) {
        cells.fill(color);
    }
}
