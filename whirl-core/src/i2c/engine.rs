//! Per-bus engine applying transitions to a controller

use whirl_hal::{BusCommand, EnergyMode, I2cController, InterruptKind};

use super::transaction::{transition, BusInterrupt, Phase, Transaction, TransferRequest};
use super::{BusId, I2cError};
use crate::events::EventScheduler;
use crate::power::PowerArbiter;

/// Asynchronous I2C master for one bus
///
/// [`start`](Self::start) is called from thread context and returns as soon
/// as the START condition is issued. Everything after that happens in
/// [`service`](Self::service), called from the bus interrupt handler.
pub struct I2cEngine<C> {
    bus: BusId,
    controller: C,
    /// Deepest mode that still clocks this controller is blocked while busy
    block_mode: EnergyMode,
    txn: Transaction,
    /// Result word of the last completed transaction
    last_word: u32,
    /// Read-command NACKs seen since creation
    nack_retries: u32,
}

impl<C: I2cController> I2cEngine<C> {
    /// Create an idle engine
    pub fn new(bus: BusId, controller: C, block_mode: EnergyMode) -> Self {
        Self {
            bus,
            controller,
            block_mode,
            txn: Transaction::idle(),
            last_word: 0,
            nack_retries: 0,
        }
    }

    pub fn bus(&self) -> BusId {
        self.bus
    }

    /// True while a transaction is in flight
    pub fn is_busy(&self) -> bool {
        self.txn.is_busy()
    }

    pub fn phase(&self) -> Phase {
        self.txn.phase()
    }

    /// Current descriptor
    pub fn transaction(&self) -> &Transaction {
        &self.txn
    }

    /// Result word of the most recently completed transaction
    ///
    /// Valid from the moment its completion event is posted until the next
    /// transaction on this bus completes.
    pub fn last_word(&self) -> u32 {
        self.last_word
    }

    pub fn nack_retries(&self) -> u32 {
        self.nack_retries
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Begin a transaction
    ///
    /// Fails without touching the in-flight descriptor if the bus is busy.
    pub fn start(&mut self, power: &PowerArbiter, request: TransferRequest) -> Result<(), I2cError> {
        if self.txn.is_busy() {
            return Err(I2cError::Busy(self.bus));
        }
        if !request.is_valid() {
            return Err(I2cError::InvalidByteCount(request.byte_count));
        }

        power.block(self.block_mode)?;
        self.txn = Transaction::begin(request);
        self.controller.issue(BusCommand::Start);
        self.controller
            .issue(BusCommand::Transmit(request.write_address()));
        Ok(())
    }

    /// Service every pending controller interrupt
    ///
    /// Called from the bus interrupt handler. Flags are handled in the
    /// controller's servicing order (ACK, NACK, RXDATAV, MSTOP).
    pub fn service(&mut self, power: &PowerArbiter, events: &EventScheduler) -> Result<(), I2cError> {
        let pending = self.controller.take_interrupts();
        for kind in pending.iter() {
            let irq = match kind {
                InterruptKind::Ack => BusInterrupt::Ack,
                InterruptKind::Nack => BusInterrupt::Nack,
                InterruptKind::RxDataValid => BusInterrupt::RxDataValid(self.controller.read_data()),
                InterruptKind::Stop => BusInterrupt::Stop,
            };
            self.on_interrupt(irq, power, events)?;
        }
        Ok(())
    }

    /// Advance the state machine by one interrupt
    ///
    /// On a protocol violation the descriptor is left as it was, so the
    /// caller can report the phase it stopped in.
    pub fn on_interrupt(
        &mut self,
        irq: BusInterrupt,
        power: &PowerArbiter,
        events: &EventScheduler,
    ) -> Result<(), I2cError> {
        let (next, effects) = transition(self.txn, irq)?;
        self.txn = next;

        for command in &effects.commands {
            self.controller.issue(*command);
        }
        if effects.retried {
            self.nack_retries = self.nack_retries.wrapping_add(1);
        }
        if let Some(done) = effects.completion {
            self.last_word = done.word;
            power.unblock(self.block_mode)?;
            events.post(done.event);
        }
        Ok(())
    }

    /// Return the bus to idle regardless of what is in flight
    ///
    /// Only meant for initialisation. Releases the power block of an
    /// abandoned transaction; its completion event is never posted.
    pub fn reset(&mut self, power: &PowerArbiter) -> Result<(), I2cError> {
        self.controller.reset_bus();
        if self.txn.is_busy() {
            self.txn = Transaction::idle();
            power.unblock(self.block_mode)?;
        }
        Ok(())
    }
}
