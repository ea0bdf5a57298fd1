//! Simulated I2C controller
//!
//! Models the controller plus one attached device at the byte level. Every
//! command the engine issues is answered immediately by raising the flag
//! the real controller would raise once the bus operation finished; the
//! simulation loop then delivers the interrupt.

use std::cell::RefCell;
use std::rc::Rc;

use whirl_hal::{BusCommand, BusInterrupts, I2cController, InterruptKind};

/// Register-level model of an I2C target
pub trait SimDevice {
    /// 7-bit address
    fn address(&self) -> u8;

    /// First byte after a write address: register pointer or command
    fn select(&mut self, register: u8);

    /// Further bytes of a write
    fn write_byte(&mut self, value: u8);

    /// Next byte of a read
    fn read_byte(&mut self) -> u8;

    /// Whether to NACK this read address (conversion still running)
    fn nack_read(&mut self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Idle,
    Address,
    Register,
    WriteData,
    Reading,
}

struct BusState<D> {
    device: D,
    expect: Expect,
    pending: BusInterrupts,
    rx: u8,
    commands: u64,
}

/// Controller handle; clones share the same bus
pub struct SimI2c<D> {
    state: Rc<RefCell<BusState<D>>>,
}

impl<D> Clone for SimI2c<D> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<D: SimDevice> SimI2c<D> {
    pub fn new(device: D) -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                device,
                expect: Expect::Idle,
                pending: BusInterrupts::NONE,
                rx: 0,
                commands: 0,
            })),
        }
    }

    /// An interrupt is waiting to be serviced
    pub fn has_pending(&self) -> bool {
        !self.state.borrow().pending.is_empty()
    }

    /// Commands issued since creation
    pub fn commands(&self) -> u64 {
        self.state.borrow().commands
    }

    /// Inspect or reconfigure the attached device
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.state.borrow_mut().device)
    }
}

impl<D: SimDevice> I2cController for SimI2c<D> {
    fn issue(&mut self, command: BusCommand) {
        let mut bus = self.state.borrow_mut();
        bus.commands += 1;
        match (command, bus.expect) {
            (BusCommand::Start, _) => bus.expect = Expect::Address,
            (BusCommand::Transmit(byte), Expect::Address) => {
                let read = byte & 1 == 1;
                if byte >> 1 != bus.device.address() {
                    bus.pending.insert(InterruptKind::Nack);
                    bus.expect = Expect::Idle;
                } else if read && bus.device.nack_read() {
                    bus.pending.insert(InterruptKind::Nack);
                    bus.expect = Expect::Idle;
                } else if read {
                    bus.rx = bus.device.read_byte();
                    bus.pending.insert(InterruptKind::Ack);
                    bus.pending.insert(InterruptKind::RxDataValid);
                    bus.expect = Expect::Reading;
                } else {
                    bus.pending.insert(InterruptKind::Ack);
                    bus.expect = Expect::Register;
                }
            }
            (BusCommand::Transmit(byte), Expect::Register) => {
                bus.device.select(byte);
                bus.pending.insert(InterruptKind::Ack);
                bus.expect = Expect::WriteData;
            }
            (BusCommand::Transmit(byte), Expect::WriteData) => {
                bus.device.write_byte(byte);
                bus.pending.insert(InterruptKind::Ack);
            }
            (BusCommand::Ack, Expect::Reading) => {
                bus.rx = bus.device.read_byte();
                bus.pending.insert(InterruptKind::RxDataValid);
            }
            (BusCommand::Nack, Expect::Reading) => bus.expect = Expect::Idle,
            (BusCommand::Stop, _) => {
                bus.pending.insert(InterruptKind::Stop);
                bus.expect = Expect::Idle;
            }
            (command, expect) => {
                log::warn!("sim i2c: {:?} while expecting {:?}", command, expect);
            }
        }
    }

    fn read_data(&mut self) -> u8 {
        self.state.borrow().rx
    }

    fn take_interrupts(&mut self) -> BusInterrupts {
        core::mem::take(&mut self.state.borrow_mut().pending)
    }

    fn reset_bus(&mut self) {
        let mut bus = self.state.borrow_mut();
        bus.pending = BusInterrupts::NONE;
        bus.expect = Expect::Idle;
    }
}
