//! ADC abstractions

/// Single-channel ADC with an interrupt on conversion complete
pub trait AdcChannel {
    /// Begin one conversion
    fn start_conversion(&mut self);

    /// Most recent completed conversion (12-bit, 0-4095)
    fn last_reading(&self) -> u16;
}
