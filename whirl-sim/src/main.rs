//! Host simulator for the Whirl POV display
//!
//! Boots the application on the simulated board, spins the rotor through
//! every display mode and prints what the arm drew for each, then stops
//! the rotor to show the menu column.
//!
//! Log level comes from `RUST_LOG` (default `info`).

use log::info;

use whirl_app::Button;
use whirl_core::config::WhirlConfig;
use whirl_core::display::DisplayMode;
use whirl_sim::render::{ascii_art, column_art};
use whirl_sim::{SimConfig, Simulation};

/// Rotations per mode; the first lets the sensor chain catch up
const ROTATIONS_PER_MODE: u64 = 3;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting whirl simulator");

    let config = SimConfig::DEFAULT;
    let mut sim = Simulation::new(config, WhirlConfig::DEFAULT);
    sim.boot();
    sim.set_spinning(true);

    for _ in 0..DisplayMode::COUNT {
        sim.run_rotations(ROTATIONS_PER_MODE);

        let app = sim.app();
        info!(
            "{:?} after {} frames, {} ticks/degree",
            app.mode(),
            app.rotation().frames(),
            app.rotation().ticks_per_degree()
        );
        info!("readings: {:?}", app.readings());
        println!("{}", ascii_art(app.pixels()));

        sim.press(Button::Next);
    }

    sim.set_spinning(false);
    sim.run_for(u64::from(config.stall_timeout) * 2);
    if let Some(menu) = sim.leds().last() {
        info!("stalled, menu column {}", column_art(&menu));
    }

    if let Some(fault) = sim.app().fault() {
        log::error!("fault latched: {:?}", fault);
        std::process::exit(1);
    }
    info!("Simulator exiting after {} ticks", sim.now());
}
