//! Application wiring for the POV display firmware
//!
//! Ties the whirl-core engines and whirl-drivers devices to a concrete
//! [`Board`]:
//!
//! - Interrupt entry points (`App::on_*`)
//! - Event dispatcher and sensor refresh chains
//! - Boot sequencing and the fatal-fault latch
//! - Bounded-polling bring-up self-tests ([`harness`])
//!
//! # Interrupt wiring
//!
//! | Interrupt              | Entry point                |
//! |------------------------|----------------------------|
//! | Hall sensor edge       | `on_hall_edge`             |
//! | Tick timer overflow    | `on_tick_overflow`         |
//! | Tick timer compare     | `on_tick_compare`          |
//! | Measure timer overflow | `on_stall_timeout`         |
//! | I2C bus 0 / bus 1      | `on_i2c_interrupt(bus)`    |
//! | Buttons 0 / 1          | `on_button(button)`        |
//! | Battery poll timer     | `on_battery_timer`         |
//! | ADC conversion done    | `on_adc_complete`          |

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the macros are visible to the other modules
#[macro_use]
mod fmt;

mod app;
mod board;
mod fault;
pub mod harness;

pub use app::App;
pub use board::{Board, Button, Peripherals};
pub use fault::Fault;
