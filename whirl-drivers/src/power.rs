//! Energy-mode sleep
//!
//! Maps the arbiter's energy modes onto the Cortex-M sleep instructions.
//! Only built with the `cortex-m` feature; host builds use a simulated
//! [`LowPowerWait`](whirl_hal::LowPowerWait) instead.

#[cfg(feature = "cortex-m")]
pub use self::cortex::CortexMSleep;

#[cfg(feature = "cortex-m")]
mod cortex {
    use cortex_m::peripheral::SCB;
    use whirl_hal::{EnergyMode, LowPowerWait};

    /// WFI-based sleep
    ///
    /// | Mode | SLEEPDEEP | Instruction |
    /// |------|-----------|-------------|
    /// | Em0  | -         | none        |
    /// | Em1  | clear     | WFI         |
    /// | Em2+ | set       | WFI         |
    ///
    /// Call with interrupts masked (the arbiter does); WFI still wakes on a
    /// pending interrupt and the handler runs once the mask is lifted.
    pub struct CortexMSleep {
        scb: SCB,
    }

    impl CortexMSleep {
        pub fn new(scb: SCB) -> Self {
            Self { scb }
        }

        pub fn free(self) -> SCB {
            self.scb
        }
    }

    impl LowPowerWait for CortexMSleep {
        fn wait(&mut self, mode: EnergyMode) {
            match mode {
                EnergyMode::Em0 => {}
                EnergyMode::Em1 => {
                    self.scb.clear_sleepdeep();
                    cortex_m::asm::wfi();
                }
                EnergyMode::Em2 | EnergyMode::Em3 | EnergyMode::Em4 => {
                    self.scb.set_sleepdeep();
                    cortex_m::asm::wfi();
                }
            }
        }
    }
}
