//! Bounded-polling bring-up harness
//!
//! The production path never waits on a bus. Bring-up code sometimes wants
//! to, so this module provides a polling loop with an explicit budget and
//! two self-tests built on it. Both must run after [`App::boot`] and before
//! the first [`App::run_scheduled_events`], while the buses are otherwise
//! idle; each consumes the completion event it waits for.

use whirl_core::events::Event;
use whirl_drivers::sensor::bmp280;
use whirl_drivers::sensor::{Resolution, SensorError};

use crate::app::App;
use crate::board::Board;

/// The poll budget ran out before the condition held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeout {
    pub polls: u32,
}

/// Self-test failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelfTestError {
    Timeout(Timeout),
    Sensor(SensorError),
    /// Humidity sensor user register held neither documented value
    UnexpectedUserRegister(u32),
}

impl From<Timeout> for SelfTestError {
    fn from(err: Timeout) -> Self {
        SelfTestError::Timeout(err)
    }
}

impl From<SensorError> for SelfTestError {
    fn from(err: SensorError) -> Self {
        SelfTestError::Sensor(err)
    }
}

/// Call `pump` until `done` holds, at most `max_polls` times
///
/// `done` is checked before every poll, so a condition that already holds
/// costs nothing. Returns the number of polls used.
pub fn run_until<S, P, F>(state: &mut S, mut pump: P, mut done: F, max_polls: u32) -> Result<u32, Timeout>
where
    P: FnMut(&mut S),
    F: FnMut(&S) -> bool,
{
    for polls in 0..max_polls {
        if done(state) {
            return Ok(polls);
        }
        pump(state);
    }
    if done(state) {
        Ok(max_polls)
    } else {
        Err(Timeout { polls: max_polls })
    }
}

fn wait_for<B, P>(app: &mut App<B>, pump: P, event: Event, max_polls: u32) -> Result<(), Timeout>
where
    B: Board,
    P: FnMut(&mut App<B>),
{
    run_until(app, pump, |app| app.events().pending().contains(event), max_polls)?;
    app.events.clear(event);
    Ok(())
}

/// Read back the humidity sensor's user register
///
/// `pump` must service the bus 0 interrupt.
pub fn humidity_self_test<B, P>(app: &mut App<B>, pump: P, max_polls: u32) -> Result<Resolution, SelfTestError>
where
    B: Board,
    P: FnMut(&mut App<B>),
{
    app.humidity
        .read_user_register(&mut app.humidity_bus, &app.power, Event::HumidityReady)?;
    wait_for(app, pump, Event::HumidityReady, max_polls)?;

    let word = app.humidity_bus.last_word();
    u8::try_from(word)
        .ok()
        .and_then(Resolution::from_register)
        .ok_or(SelfTestError::UnexpectedUserRegister(word))
}

/// Read the pressure sensor's chip ID
///
/// `pump` must service the bus 1 interrupt.
pub fn pressure_self_test<B, P>(app: &mut App<B>, pump: P, max_polls: u32) -> Result<(), SelfTestError>
where
    B: Board,
    P: FnMut(&mut App<B>),
{
    app.pressure
        .read_chip_id(&mut app.pressure_bus, &app.power, Event::PressureReady)?;
    wait_for(app, pump, Event::PressureReady, max_polls)?;

    bmp280::verify_chip_id(app.pressure_bus.last_word())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_until_counts_polls() {
        let mut count = 0u32;
        let used = run_until(&mut count, |c| *c += 1, |c| *c == 3, 10);
        assert_eq!(used, Ok(3));
        assert_eq!(count, 3);
    }

    #[test]
    fn test_run_until_already_done() {
        let mut count = 0u32;
        assert_eq!(run_until(&mut count, |c| *c += 1, |_| true, 10), Ok(0));
        assert_eq!(count, 0);
    }

    #[test]
    fn test_run_until_times_out() {
        let mut count = 0u32;
        assert_eq!(
            run_until(&mut count, |c| *c += 1, |_| false, 5),
            Err(Timeout { polls: 5 })
        );
        assert_eq!(count, 5);
    }

    #[test]
    fn test_run_until_last_poll_counts() {
        let mut count = 0u32;
        assert_eq!(run_until(&mut count, |c| *c += 1, |c| *c == 5, 5), Ok(5));
    }
}
