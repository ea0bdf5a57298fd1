//! Timer abstractions

/// One-shot phase timer with a single compare channel
///
/// Counts up from zero. Raises an overflow interrupt when the count reaches
/// `top` and a compare interrupt when it equals the compare value.
pub trait TickTimer {
    /// Reset the count and run towards `top`
    fn start(&mut self, top: u32, compare: u32);

    /// Move the compare target
    fn set_compare(&mut self, compare: u32);

    /// Current compare target
    fn compare(&self) -> u32;

    /// Halt and clear pending interrupts
    fn stop(&mut self);
}

/// Free-running interval timer
///
/// Used for the rotation measure timer, the stall timeout, and the battery
/// poll period.
pub trait IntervalTimer {
    /// Start counting from zero
    fn start(&mut self);

    /// Halt the timer
    fn stop(&mut self);

    /// Read the elapsed count and restart from zero
    fn restart(&mut self) -> u32;
}
