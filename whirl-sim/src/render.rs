//! ASCII rendering of what the arm shows

use whirl_core::display::{Column, PixelBuffer, LEDS_PER_COLUMN};

/// Draw the pixel buffer as text, outermost LED on the first line
///
/// Lit LEDs are `#`, dark ones `.`.
pub fn ascii_art(pixels: &PixelBuffer) -> String {
    let mut out = String::new();
    for led in (0..LEDS_PER_COLUMN).rev() {
        for column in pixels.columns() {
            out.push(if column[led].is_off() { '.' } else { '#' });
        }
        out.push('\n');
    }
    out
}

/// Draw one column as a vertical strip, outermost LED first
pub fn column_art(column: &Column) -> String {
    column
        .iter()
        .rev()
        .map(|led| if led.is_off() { '.' } else { '#' })
        .collect()
}
