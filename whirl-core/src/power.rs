//! Power-mode arbiter
//!
//! Every component with an outstanding asynchronous operation holds a block
//! on the shallowest energy mode that still keeps its peripheral clocked.
//! The main loop's idle point asks the arbiter how deep it may sleep.

use core::cell::Cell;

use critical_section::Mutex;
use whirl_hal::{EnergyMode, LowPowerWait};

/// Outstanding blocks allowed per mode
///
/// Any more than this means a block/unblock pair is missing somewhere.
pub const MAX_BLOCKS_PER_MODE: u8 = 4;

/// Arbiter contract violations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerError {
    /// Block count for the mode would exceed [`MAX_BLOCKS_PER_MODE`]
    BlockOverflow(EnergyMode),
    /// Unblock without a matching block
    BlockUnderflow(EnergyMode),
}

/// Reference-counted sleep-depth blocking
///
/// All methods take `&self` and run inside a critical section, so a single
/// instance can be shared between interrupt handlers and the main loop.
pub struct PowerArbiter {
    blocks: Mutex<Cell<[u8; EnergyMode::COUNT]>>,
}

impl Default for PowerArbiter {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerArbiter {
    /// Create an arbiter with nothing blocked
    pub const fn new() -> Self {
        Self {
            blocks: Mutex::new(Cell::new([0; EnergyMode::COUNT])),
        }
    }

    /// Clear every block count
    pub fn reset(&self) {
        critical_section::with(|cs| self.blocks.borrow(cs).set([0; EnergyMode::COUNT]));
    }

    /// Prevent the system from entering `mode` or anything deeper
    pub fn block(&self, mode: EnergyMode) -> Result<(), PowerError> {
        critical_section::with(|cs| {
            let cell = self.blocks.borrow(cs);
            let mut counts = cell.get();
            let slot = &mut counts[mode.index()];
            if *slot >= MAX_BLOCKS_PER_MODE {
                return Err(PowerError::BlockOverflow(mode));
            }
            *slot += 1;
            cell.set(counts);
            Ok(())
        })
    }

    /// Release one block previously taken with [`block`](Self::block)
    pub fn unblock(&self, mode: EnergyMode) -> Result<(), PowerError> {
        critical_section::with(|cs| {
            let cell = self.blocks.borrow(cs);
            let mut counts = cell.get();
            let slot = &mut counts[mode.index()];
            *slot = slot
                .checked_sub(1)
                .ok_or(PowerError::BlockUnderflow(mode))?;
            cell.set(counts);
            Ok(())
        })
    }

    /// Current block count for a mode
    pub fn block_count(&self, mode: EnergyMode) -> u8 {
        critical_section::with(|cs| self.blocks.borrow(cs).get()[mode.index()])
    }

    /// Shallowest blocked mode, or the deepest mode if nothing is blocked
    pub fn resolve_deepest_allowed(&self) -> EnergyMode {
        critical_section::with(|cs| resolve(&self.blocks.borrow(cs).get()))
    }

    /// Sleep as deeply as the current blocks allow
    ///
    /// Returns the mode actually entered, or `None` when EM0 or EM1 is
    /// blocked and the core must stay awake. The deepest mode needs a reset
    /// to leave, so the arbiter never enters it and stops one short.
    ///
    /// The wait happens with interrupts masked. A pending interrupt still
    /// wakes the core and is serviced once the section ends.
    pub fn enter<W: LowPowerWait>(&self, waiter: &mut W) -> Option<EnergyMode> {
        critical_section::with(|cs| {
            let target = sleep_target(resolve(&self.blocks.borrow(cs).get()))?;
            waiter.wait(target);
            Some(target)
        })
    }
}

fn resolve(counts: &[u8; EnergyMode::COUNT]) -> EnergyMode {
    EnergyMode::ALL
        .into_iter()
        .find(|mode| counts[mode.index()] != 0)
        .unwrap_or(EnergyMode::deepest())
}

/// Mode to sleep in when `blocked` is the shallowest blocked mode
const fn sleep_target(blocked: EnergyMode) -> Option<EnergyMode> {
    match blocked {
        EnergyMode::Em0 | EnergyMode::Em1 => None,
        EnergyMode::Em2 => Some(EnergyMode::Em1),
        EnergyMode::Em3 => Some(EnergyMode::Em2),
        EnergyMode::Em4 => Some(EnergyMode::Em3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Records every wait request
    #[derive(Default)]
    struct MockWait {
        entered: Option<EnergyMode>,
        calls: u32,
    }

    impl LowPowerWait for MockWait {
        fn wait(&mut self, mode: EnergyMode) {
            self.entered = Some(mode);
            self.calls += 1;
        }
    }

    #[test]
    fn test_nothing_blocked_resolves_deepest() {
        let arbiter = PowerArbiter::new();
        assert_eq!(arbiter.resolve_deepest_allowed(), EnergyMode::Em4);
    }

    #[test]
    fn test_resolve_picks_shallowest_block() {
        let arbiter = PowerArbiter::new();
        arbiter.block(EnergyMode::Em3).unwrap();
        arbiter.block(EnergyMode::Em2).unwrap();
        assert_eq!(arbiter.resolve_deepest_allowed(), EnergyMode::Em2);

        arbiter.unblock(EnergyMode::Em2).unwrap();
        assert_eq!(arbiter.resolve_deepest_allowed(), EnergyMode::Em3);
    }

    #[test]
    fn test_block_ceiling() {
        let arbiter = PowerArbiter::new();
        for _ in 0..MAX_BLOCKS_PER_MODE {
            arbiter.block(EnergyMode::Em1).unwrap();
        }
        assert_eq!(
            arbiter.block(EnergyMode::Em1),
            Err(PowerError::BlockOverflow(EnergyMode::Em1))
        );
        assert_eq!(arbiter.block_count(EnergyMode::Em1), MAX_BLOCKS_PER_MODE);
    }

    #[test]
    fn test_unblock_underflow() {
        let arbiter = PowerArbiter::new();
        assert_eq!(
            arbiter.unblock(EnergyMode::Em2),
            Err(PowerError::BlockUnderflow(EnergyMode::Em2))
        );
        assert_eq!(arbiter.block_count(EnergyMode::Em2), 0);
    }

    #[test]
    fn test_enter_stays_awake_when_em0_or_em1_blocked() {
        for mode in [EnergyMode::Em0, EnergyMode::Em1] {
            let arbiter = PowerArbiter::new();
            let mut wait = MockWait::default();
            arbiter.block(mode).unwrap();

            assert_eq!(arbiter.enter(&mut wait), None);
            assert_eq!(wait.calls, 0);
        }
    }

    #[test]
    fn test_enter_sleeps_one_above_block() {
        let cases = [
            (EnergyMode::Em2, EnergyMode::Em1),
            (EnergyMode::Em3, EnergyMode::Em2),
            (EnergyMode::Em4, EnergyMode::Em3),
        ];

        for (blocked, expected) in cases {
            let arbiter = PowerArbiter::new();
            let mut wait = MockWait::default();
            arbiter.block(blocked).unwrap();

            assert_eq!(arbiter.enter(&mut wait), Some(expected));
            assert_eq!(wait.entered, Some(expected));
        }
    }

    #[test]
    fn test_enter_never_reaches_em4() {
        let arbiter = PowerArbiter::new();
        let mut wait = MockWait::default();
        assert_eq!(arbiter.enter(&mut wait), Some(EnergyMode::Em3));
    }

    #[test]
    fn test_reset_clears_counts() {
        let arbiter = PowerArbiter::new();
        arbiter.block(EnergyMode::Em2).unwrap();
        arbiter.reset();
        assert_eq!(arbiter.block_count(EnergyMode::Em2), 0);
    }

    fn mode_strategy() -> impl Strategy<Value = EnergyMode> {
        (0usize..EnergyMode::COUNT).prop_map(|i| EnergyMode::ALL[i])
    }

    proptest! {
        #[test]
        fn test_balanced_sequences_restore_resolution(
            base in proptest::collection::vec(mode_strategy(), 0..4),
            ops in proptest::collection::vec(mode_strategy(), 0..16),
        ) {
            let arbiter = PowerArbiter::new();
            for mode in &base {
                arbiter.block(*mode).unwrap();
            }
            let before = arbiter.resolve_deepest_allowed();

            // Nest the blocks so no slot exceeds the ceiling on top of `base`
            let mut held = std::vec::Vec::new();
            for mode in &ops {
                if arbiter.block(*mode).is_ok() {
                    held.push(*mode);
                }
            }
            for mode in held.iter().rev() {
                arbiter.unblock(*mode).unwrap();
            }

            prop_assert_eq!(arbiter.resolve_deepest_allowed(), before);
        }

        #[test]
        fn test_resolution_never_deeper_than_a_block(
            ops in proptest::collection::vec(mode_strategy(), 1..12),
        ) {
            let arbiter = PowerArbiter::new();
            for mode in &ops {
                let _ = arbiter.block(*mode);
            }

            let shallowest = ops.iter().copied().min().unwrap();
            prop_assert!(arbiter.resolve_deepest_allowed() <= shallowest);
        }
    }
}
