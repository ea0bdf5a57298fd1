//! Frame rendering for each display mode

use core::fmt::Write;

use heapless::String;
use whirl_hal::Grb;

use super::frame::{Frame, Readings};
use super::mode::DisplayMode;

/// Hue advance per greeting frame
pub const HUE_STEP: u8 = 5;

const GREETING_SATURATION: u8 = 255;
const GREETING_VALUE: u8 = 16;

const LABEL_TOP: Grb = Grb::new(2, 2, 4);
const VALUE_TOP: Grb = Grb::new(1, 1, 6);
const LABEL_BOTTOM: Grb = Grb::new(2, 4, 2);
const VALUE_BOTTOM: Grb = Grb::new(1, 6, 1);

const CREDITS_TOP: Grb = Grb::new(6, 6, 6);
const CREDITS_BOTTOM: Grb = Grb::new(10, 8, 0);
const BATTERY_COLOR: Grb = Grb::new(0, 8, 0);
const FILLER_COLOR: Grb = Grb::new(6, 6, 6);
const WARNING_TOP: Grb = Grb::new(0, 63, 0);
const WARNING_BOTTOM: Grb = Grb::new(31, 0, 31);

/// Scratch buffer for formatted rows; longer than a row so the frame
/// does the truncation
type Line = String<32>;

/// Render the frame for a mode
///
/// Pure: the same inputs always give the same frame. `hue` only affects
/// the greeting. A low battery replaces whatever the mode would show.
pub fn render(mode: DisplayMode, readings: &Readings, hue: u8) -> Frame {
    let frame = match mode {
        DisplayMode::HelloWorld => greeting(hue),
        DisplayMode::TempHumidity => temp_humidity(readings),
        DisplayMode::Credits => Frame::uniform(
            "  Keith Graham  ",
            CREDITS_TOP,
            "   Peter Magro  ",
            CREDITS_BOTTOM,
        ),
        DisplayMode::BatteryLevel => battery_level(readings),
        DisplayMode::PressureAltitude => pressure_altitude(readings),
        _ => Frame::uniform(
            "     Filler     ",
            FILLER_COLOR,
            "     Filler     ",
            FILLER_COLOR,
        ),
    };

    if readings.battery_low {
        low_battery()
    } else {
        frame
    }
}

/// Stateful wrapper that advances the greeting hue on every render
#[derive(Debug, Clone, Default)]
pub struct Composer {
    hue: u8,
}

impl Composer {
    pub const fn new() -> Self {
        Self { hue: 0 }
    }

    pub fn hue(&self) -> u8 {
        self.hue
    }

    /// Render the next frame for `mode`
    pub fn render(&mut self, mode: DisplayMode, readings: &Readings) -> Frame {
        if mode == DisplayMode::HelloWorld {
            self.hue = self.hue.wrapping_add(HUE_STEP);
        }
        render(mode, readings, self.hue)
    }
}

fn greeting(hue: u8) -> Frame {
    Frame::uniform(
        "      HELLO     ",
        hsv_to_grb(hue, GREETING_SATURATION, GREETING_VALUE),
        "      WORLD     ",
        hsv_to_grb(hue.wrapping_add(128), GREETING_SATURATION, GREETING_VALUE),
    )
}

fn temp_humidity(readings: &Readings) -> Frame {
    let mut top = Line::new();
    let mut bottom = Line::new();
    // Line is longer than any of these; a failed write only truncates
    let _ = write!(top, "Humidity: {:.2}%", readings.humidity);
    let _ = write!(bottom, "Temp: {:.1}F", readings.temperature_f);

    labelled(&top, 9, &bottom, 5)
}

fn pressure_altitude(readings: &Readings) -> Frame {
    let mut top = Line::new();
    let mut bottom = Line::new();
    let _ = write!(top, "Pressure: {:.0}hPa", readings.pressure_hpa);
    let _ = write!(bottom, "Altitude: {:.1}m", readings.altitude_m);

    labelled(&top, 9, &bottom, 9)
}

fn battery_level(readings: &Readings) -> Frame {
    let mut bottom = Line::new();
    let _ = write!(bottom, "      {:.2}", readings.battery_percent);

    Frame::uniform("    Battery:    ", BATTERY_COLOR, &bottom, BATTERY_COLOR)
}

/// Rows split into a label part and a value part at the given cells
fn labelled(top: &str, top_split: usize, bottom: &str, bottom_split: usize) -> Frame {
    let mut frame = Frame::uniform(top, VALUE_TOP, bottom, VALUE_BOTTOM);
    frame.paint_top(0, top_split, LABEL_TOP);
    frame.paint_bottom(0, bottom_split, LABEL_BOTTOM);
    frame
}

fn low_battery() -> Frame {
    Frame::uniform(
        "   Low Battery  ",
        WARNING_TOP,
        "  Recharge Soon ",
        WARNING_BOTTOM,
    )
}

/// Convert hue/saturation/value (each 0-255) to an LED colour
///
/// Hue 0-255 spans the full colour wheel.
pub fn hsv_to_grb(hue: u8, saturation: u8, value: u8) -> Grb {
    let h = f32::from(hue) * 360.0 / 255.0;
    let s = f32::from(saturation) / 255.0;
    let v = f32::from(value) / 255.0;

    let c = s * v;
    let sector = h / 60.0;
    let offset = sector % 2.0 - 1.0;
    let x = c * (1.0 - if offset < 0.0 { -offset } else { offset });
    let m = v - c;

    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Grb::new(to_channel(g + m), to_channel(r + m), to_channel(b + m))
}

fn to_channel(level: f32) -> u8 {
    (level * 255.0 + 0.5) as u8
}
