//! Battery voltage monitor
//!
//! Polled from the `BatteryPoll` event. Each poll classifies the previous
//! conversion and starts the next one, so the reading it judges is always
//! one period old. A single low reading is ignored; the battery only counts
//! as low after more than `low_count_threshold` in a row.

use whirl_core::config::BatteryConfig;
use whirl_core::power::{PowerArbiter, PowerError};
use whirl_core::EnergyMode;
use whirl_hal::AdcChannel;

/// ADC-polled low-voltage detector
pub struct BatteryMonitor<A> {
    adc: A,
    config: BatteryConfig,
    /// Held while a conversion is running
    block_mode: EnergyMode,
    converting: bool,
    /// Set once the first conversion has finished
    has_reading: bool,
    low_reads: u8,
}

impl<A: AdcChannel> BatteryMonitor<A> {
    pub fn new(adc: A, config: BatteryConfig, block_mode: EnergyMode) -> Self {
        Self {
            adc,
            config,
            block_mode,
            converting: false,
            has_reading: false,
            low_reads: 0,
        }
    }

    /// Classify the last reading and start a new conversion
    ///
    /// A poll that lands while the previous conversion is still running
    /// leaves it alone.
    pub fn poll(&mut self, power: &PowerArbiter) -> Result<(), PowerError> {
        if self.has_reading {
            self.classify(self.adc.last_reading());
        }
        if !self.converting {
            power.block(self.block_mode)?;
            self.converting = true;
            self.adc.start_conversion();
        }
        Ok(())
    }

    /// Conversion-complete interrupt
    pub fn on_conversion_complete(&mut self, power: &PowerArbiter) -> Result<(), PowerError> {
        if self.converting {
            self.converting = false;
            self.has_reading = true;
            power.unblock(self.block_mode)?;
        }
        Ok(())
    }

    fn classify(&mut self, reading: u16) {
        let scaled = u32::from(reading) * u32::from(self.config.reference_mv);
        let threshold =
            u32::from(self.config.low_threshold_mv) * u32::from(self.config.adc_full_scale);
        if scaled < threshold {
            self.low_reads = self.low_reads.saturating_add(1);
        } else {
            self.low_reads = 0;
        }
    }

    /// More than `low_count_threshold` consecutive low readings
    pub fn is_low(&self) -> bool {
        self.low_reads > self.config.low_count_threshold
    }

    pub fn consecutive_low_reads(&self) -> u8 {
        self.low_reads
    }

    pub fn is_converting(&self) -> bool {
        self.converting
    }

    /// Charge estimate, linear between empty and full, clamped to 0..=100
    pub fn percent(&self) -> f32 {
        let reading = self.adc.last_reading() as f32;
        let empty = self.config.mv_to_counts(self.config.empty_mv) as f32;
        let full = self.config.mv_to_counts(self.config.full_mv) as f32;
        if full <= empty {
            return 0.0;
        }
        (100.0 * (reading - empty) / (full - empty)).clamp(0.0, 100.0)
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }

    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockAdc {
        reading: u16,
        starts: u32,
    }

    impl MockAdc {
        fn new(reading: u16) -> Self {
            Self { reading, starts: 0 }
        }
    }

    impl AdcChannel for MockAdc {
        fn start_conversion(&mut self) {
            self.starts += 1;
        }

        fn last_reading(&self) -> u16 {
            self.reading
        }
    }

    const CONFIG: BatteryConfig = BatteryConfig::DEFAULT;

    fn monitor(reading: u16) -> BatteryMonitor<MockAdc> {
        BatteryMonitor::new(MockAdc::new(reading), CONFIG, EnergyMode::Em2)
    }

    fn cycle(mon: &mut BatteryMonitor<MockAdc>, power: &PowerArbiter) {
        mon.poll(power).unwrap();
        mon.on_conversion_complete(power).unwrap();
    }

    #[test]
    fn test_poll_blocks_until_conversion_completes() {
        let power = PowerArbiter::new();
        let mut mon = monitor(3000);

        mon.poll(&power).unwrap();
        assert!(mon.is_converting());
        assert_eq!(power.block_count(EnergyMode::Em2), 1);
        assert_eq!(mon.adc().starts, 1);

        // Overlapping poll does not restart or double-block
        mon.poll(&power).unwrap();
        assert_eq!(power.block_count(EnergyMode::Em2), 1);
        assert_eq!(mon.adc().starts, 1);

        mon.on_conversion_complete(&power).unwrap();
        assert_eq!(power.block_count(EnergyMode::Em2), 0);
    }

    #[test]
    fn test_spurious_completion_is_ignored() {
        let power = PowerArbiter::new();
        let mut mon = monitor(3000);
        mon.on_conversion_complete(&power).unwrap();
        assert_eq!(power.block_count(EnergyMode::Em2), 0);
    }

    #[test]
    fn test_first_poll_does_not_classify() {
        let power = PowerArbiter::new();
        let mut mon = monitor(0);
        mon.poll(&power).unwrap();
        assert_eq!(mon.consecutive_low_reads(), 0);
    }

    #[test]
    fn test_low_after_more_than_threshold_reads() {
        let power = PowerArbiter::new();
        // 3.0 V on a 5 V / 4095 scale
        let mut mon = monitor(CONFIG.mv_to_counts(3000) as u16);

        // First cycle produces the reading; the next ones classify it
        cycle(&mut mon, &power);
        for _ in 0..CONFIG.low_count_threshold {
            cycle(&mut mon, &power);
            assert!(!mon.is_low());
        }
        cycle(&mut mon, &power);
        assert!(mon.is_low());
    }

    #[test]
    fn test_good_reading_resets_count() {
        let power = PowerArbiter::new();
        let mut mon = monitor(CONFIG.mv_to_counts(3000) as u16);

        for _ in 0..4 {
            cycle(&mut mon, &power);
        }
        assert_eq!(mon.consecutive_low_reads(), 3);

        mon.adc_mut().reading = CONFIG.mv_to_counts(3700) as u16;
        cycle(&mut mon, &power);
        assert_eq!(mon.consecutive_low_reads(), 0);
    }

    #[test]
    fn test_percent_is_linear_and_clamped() {
        let mut mon = monitor(CONFIG.mv_to_counts(4200) as u16);
        assert!((mon.percent() - 100.0).abs() < 0.5);

        mon.adc_mut().reading = CONFIG.mv_to_counts(3600) as u16;
        assert!((mon.percent() - 50.0).abs() < 0.5);

        mon.adc_mut().reading = 4095;
        assert_eq!(mon.percent(), 100.0);

        mon.adc_mut().reading = 0;
        assert_eq!(mon.percent(), 0.0);
    }
}
