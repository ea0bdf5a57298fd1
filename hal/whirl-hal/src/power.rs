//! Processor energy modes

/// Processor low-power state, ordered from fully awake to deepest sleep
///
/// Blocking a mode prevents the system from entering that mode or any
/// deeper one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum EnergyMode {
    /// Run mode, everything clocked
    Em0 = 0,
    /// Sleep: core halted, high-frequency peripherals running
    Em1 = 1,
    /// Deep sleep: low-frequency peripherals running
    Em2 = 2,
    /// Stop: only asynchronous wake sources
    Em3 = 3,
    /// Shutoff: wake requires a reset
    Em4 = 4,
}

impl EnergyMode {
    /// Number of modes
    pub const COUNT: usize = 5;

    /// All modes, shallowest first
    pub const ALL: [EnergyMode; Self::COUNT] = [
        EnergyMode::Em0,
        EnergyMode::Em1,
        EnergyMode::Em2,
        EnergyMode::Em3,
        EnergyMode::Em4,
    ];

    /// Table index of this mode
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Deepest mode
    pub const fn deepest() -> Self {
        EnergyMode::Em4
    }
}

/// Processor low-power wait primitive
///
/// Called with interrupts masked. Implementations must return once an
/// interrupt is pending even though it cannot be taken until the caller
/// unmasks.
pub trait LowPowerWait {
    /// Halt until the next interrupt in the given mode
    fn wait(&mut self, mode: EnergyMode);
}
