//! Transaction descriptor and the pure protocol transition

use heapless::Vec;
use whirl_hal::{BusCommand, InterruptKind};

use crate::events::Event;

/// Largest result word the engine assembles, in bytes
pub const MAX_TRANSFER_BYTES: u8 = 4;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Read,
    Write,
}

/// Order in which received bytes are packed into the result word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ByteOrder {
    /// First byte received is the most significant
    MsbFirst,
    /// First byte received is the least significant
    LsbFirst,
}

/// What the caller wants done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferRequest {
    /// 7-bit device address
    pub address: u8,
    /// Register (or command code) written before the data phase
    pub register: u8,
    pub direction: Direction,
    pub byte_order: ByteOrder,
    /// Bytes to receive (reads) or send (writes)
    pub byte_count: u8,
    /// Byte sent in the data phase of a write
    pub payload: u8,
    /// Posted once the STOP condition completes
    pub completion: Event,
}

impl TransferRequest {
    /// Register read of `byte_count` bytes
    pub const fn read(
        address: u8,
        register: u8,
        byte_count: u8,
        byte_order: ByteOrder,
        completion: Event,
    ) -> Self {
        Self {
            address,
            register,
            direction: Direction::Read,
            byte_order,
            byte_count,
            payload: 0,
            completion,
        }
    }

    /// Single-byte register write
    pub const fn write(address: u8, register: u8, payload: u8, completion: Event) -> Self {
        Self {
            address,
            register,
            direction: Direction::Write,
            byte_order: ByteOrder::MsbFirst,
            byte_count: 1,
            payload,
            completion,
        }
    }

    /// Address byte with the R/W bit clear
    pub const fn write_address(&self) -> u8 {
        self.address << 1
    }

    /// Address byte with the R/W bit set
    pub const fn read_address(&self) -> u8 {
        (self.address << 1) | 1
    }

    /// Byte count is within what the engine can assemble
    pub const fn is_valid(&self) -> bool {
        match self.direction {
            Direction::Read => self.byte_count >= 1 && self.byte_count <= MAX_TRANSFER_BYTES,
            Direction::Write => self.byte_count == 1,
        }
    }
}

/// Protocol phase of a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No transaction in flight
    Idle,
    /// START + address(W) sent, waiting for the device to ACK
    Address,
    /// Register pointer sent, waiting for ACK
    Register,
    /// Repeated START + address(R) sent; NACK means the device is still busy
    ReadCommand,
    /// Receiving data bytes
    Receiving,
    /// Payload byte sent, waiting for ACK
    Writing,
    /// All bytes moved, waiting for the STOP condition to finish
    Complete,
}

/// One interrupt class plus the data it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusInterrupt {
    Ack,
    Nack,
    /// Received byte, already read from the data register
    RxDataValid(u8),
    Stop,
}

impl BusInterrupt {
    pub const fn kind(self) -> InterruptKind {
        match self {
            BusInterrupt::Ack => InterruptKind::Ack,
            BusInterrupt::Nack => InterruptKind::Nack,
            BusInterrupt::RxDataValid(_) => InterruptKind::RxDataValid,
            BusInterrupt::Stop => InterruptKind::Stop,
        }
    }
}

/// An interrupt arrived that the current phase has no transition for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProtocolViolation {
    pub phase: Phase,
    pub interrupt: InterruptKind,
}

/// A finished transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub event: Event,
    /// Assembled result (zero for writes)
    pub word: u32,
}

/// Side effects of one transition
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Effects {
    /// Commands to issue, in order
    pub commands: Vec<BusCommand, 2>,
    /// Set when the STOP condition closed the transaction
    pub completion: Option<Completion>,
    /// Set when the device NACKed the read command and it was re-sent
    pub retried: bool,
}

impl Effects {
    fn none() -> Self {
        Self::default()
    }

    fn issue(commands: &[BusCommand]) -> Self {
        let mut effects = Self::default();
        for command in commands {
            // At most two commands per transition
            let _ = effects.commands.push(*command);
        }
        effects
    }
}

/// Per-bus transaction descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transaction {
    request: Option<TransferRequest>,
    phase: Phase,
    /// Bytes transferred in the data phase so far
    cursor: u8,
    word: u32,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::idle()
    }
}

impl Transaction {
    /// Descriptor with nothing in flight
    pub const fn idle() -> Self {
        Self {
            request: None,
            phase: Phase::Idle,
            cursor: 0,
            word: 0,
        }
    }

    /// Descriptor for a freshly started request (START already issued)
    pub const fn begin(request: TransferRequest) -> Self {
        Self {
            request: Some(request),
            phase: Phase::Address,
            cursor: 0,
            word: 0,
        }
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    pub const fn request(&self) -> Option<&TransferRequest> {
        self.request.as_ref()
    }

    pub const fn cursor(&self) -> u8 {
        self.cursor
    }

    /// Partially assembled result word
    pub const fn word(&self) -> u32 {
        self.word
    }

    fn with_phase(self, phase: Phase) -> Self {
        Self { phase, ..self }
    }

    /// Fold one received byte into the result word
    fn accumulate(self, request: &TransferRequest, byte: u8) -> Self {
        let cursor = self.cursor + 1;
        let shift = match request.byte_order {
            ByteOrder::MsbFirst => 8 * u32::from(request.byte_count - cursor),
            ByteOrder::LsbFirst => 8 * u32::from(self.cursor),
        };
        Self {
            cursor,
            word: self.word | (u32::from(byte) << shift),
            ..self
        }
    }
}

/// Advance a descriptor by one interrupt
///
/// Pure: the caller applies the returned commands to the controller. The
/// only tolerated error condition is a NACK to the read command, which
/// re-sends the repeated START and read address without limit.
pub fn transition(
    txn: Transaction,
    irq: BusInterrupt,
) -> Result<(Transaction, Effects), ProtocolViolation> {
    let violation = ProtocolViolation {
        phase: txn.phase,
        interrupt: irq.kind(),
    };
    let Some(request) = txn.request else {
        return Err(violation);
    };

    match (txn.phase, irq) {
        (Phase::Address, BusInterrupt::Ack) => Ok((
            txn.with_phase(Phase::Register),
            Effects::issue(&[BusCommand::Transmit(request.register)]),
        )),

        (Phase::Register, BusInterrupt::Ack) => match request.direction {
            Direction::Read => Ok((
                Transaction {
                    phase: Phase::ReadCommand,
                    cursor: 0,
                    word: 0,
                    ..txn
                },
                Effects::issue(&[
                    BusCommand::Start,
                    BusCommand::Transmit(request.read_address()),
                ]),
            )),
            Direction::Write => Ok((
                txn.with_phase(Phase::Writing),
                Effects::issue(&[BusCommand::Transmit(request.payload)]),
            )),
        },

        (Phase::ReadCommand, BusInterrupt::Ack) => {
            Ok((txn.with_phase(Phase::Receiving), Effects::none()))
        }
        (Phase::ReadCommand, BusInterrupt::Nack) => {
            let mut effects = Effects::issue(&[
                BusCommand::Start,
                BusCommand::Transmit(request.read_address()),
            ]);
            effects.retried = true;
            Ok((txn, effects))
        }

        // The controller's own ACK of a data byte raises the flag as well
        (Phase::Receiving, BusInterrupt::Ack) => Ok((txn, Effects::none())),
        (Phase::Receiving, BusInterrupt::RxDataValid(byte)) => {
            let next = txn.accumulate(&request, byte);
            if next.cursor < request.byte_count {
                Ok((next, Effects::issue(&[BusCommand::Ack])))
            } else {
                Ok((
                    next.with_phase(Phase::Complete),
                    Effects::issue(&[BusCommand::Nack, BusCommand::Stop]),
                ))
            }
        }

        (Phase::Writing, BusInterrupt::Ack) => Ok((
            Transaction {
                phase: Phase::Complete,
                cursor: request.byte_count,
                ..txn
            },
            Effects::issue(&[BusCommand::Stop]),
        )),

        (Phase::Complete, BusInterrupt::Stop) => {
            let mut effects = Effects::none();
            effects.completion = Some(Completion {
                event: request.completion,
                word: txn.word,
            });
            Ok((
                Transaction {
                    request: None,
                    phase: Phase::Idle,
                    ..txn
                },
                effects,
            ))
        }

        _ => Err(violation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ADDR: u8 = 0x40;

    fn make_read(count: u8, order: ByteOrder) -> Transaction {
        Transaction::begin(TransferRequest::read(
            ADDR,
            0xF5,
            count,
            order,
            Event::HumidityReady,
        ))
    }

    /// Step through address and register phases into Receiving
    fn to_receiving(txn: Transaction) -> Transaction {
        let (txn, _) = transition(txn, BusInterrupt::Ack).unwrap();
        let (txn, _) = transition(txn, BusInterrupt::Ack).unwrap();
        let (txn, _) = transition(txn, BusInterrupt::Ack).unwrap();
        assert_eq!(txn.phase(), Phase::Receiving);
        txn
    }

    fn receive_all(mut txn: Transaction, bytes: &[u8]) -> Completion {
        for byte in bytes {
            txn = transition(txn, BusInterrupt::RxDataValid(*byte)).unwrap().0;
        }
        assert_eq!(txn.phase(), Phase::Complete);
        let (txn, effects) = transition(txn, BusInterrupt::Stop).unwrap();
        assert!(!txn.is_busy());
        effects.completion.unwrap()
    }

    #[test]
    fn test_address_ack_sends_register() {
        let (txn, effects) = transition(make_read(2, ByteOrder::MsbFirst), BusInterrupt::Ack).unwrap();
        assert_eq!(txn.phase(), Phase::Register);
        assert_eq!(effects.commands.as_slice(), &[BusCommand::Transmit(0xF5)]);
    }

    #[test]
    fn test_register_ack_on_read_sends_repeated_start() {
        let (txn, _) = transition(make_read(2, ByteOrder::MsbFirst), BusInterrupt::Ack).unwrap();
        let (txn, effects) = transition(txn, BusInterrupt::Ack).unwrap();
        assert_eq!(txn.phase(), Phase::ReadCommand);
        assert_eq!(
            effects.commands.as_slice(),
            &[BusCommand::Start, BusCommand::Transmit(0x81)]
        );
    }

    #[test]
    fn test_read_command_nack_retries() {
        let (txn, _) = transition(make_read(2, ByteOrder::MsbFirst), BusInterrupt::Ack).unwrap();
        let (txn, _) = transition(txn, BusInterrupt::Ack).unwrap();

        let (txn, effects) = transition(txn, BusInterrupt::Nack).unwrap();
        assert_eq!(txn.phase(), Phase::ReadCommand);
        assert!(effects.retried);
        assert_eq!(
            effects.commands.as_slice(),
            &[BusCommand::Start, BusCommand::Transmit(0x81)]
        );
    }

    #[test]
    fn test_ack_between_bytes_then_nack_stop_on_last() {
        let txn = to_receiving(make_read(2, ByteOrder::MsbFirst));

        let (txn, effects) = transition(txn, BusInterrupt::RxDataValid(0x80)).unwrap();
        assert_eq!(effects.commands.as_slice(), &[BusCommand::Ack]);
        assert_eq!(txn.cursor(), 1);

        let (txn, effects) = transition(txn, BusInterrupt::RxDataValid(0x00)).unwrap();
        assert_eq!(
            effects.commands.as_slice(),
            &[BusCommand::Nack, BusCommand::Stop]
        );
        assert_eq!(txn.phase(), Phase::Complete);
        assert_eq!(txn.word(), 0x8000);
    }

    #[test]
    fn test_write_path() {
        let txn = Transaction::begin(TransferRequest::write(
            0x77,
            0xF4,
            0x3F,
            Event::PressureSetupStep,
        ));
        let (txn, _) = transition(txn, BusInterrupt::Ack).unwrap();
        let (txn, effects) = transition(txn, BusInterrupt::Ack).unwrap();
        assert_eq!(txn.phase(), Phase::Writing);
        assert_eq!(effects.commands.as_slice(), &[BusCommand::Transmit(0x3F)]);

        let (txn, effects) = transition(txn, BusInterrupt::Ack).unwrap();
        assert_eq!(txn.phase(), Phase::Complete);
        assert_eq!(effects.commands.as_slice(), &[BusCommand::Stop]);

        let (txn, effects) = transition(txn, BusInterrupt::Stop).unwrap();
        assert_eq!(txn.phase(), Phase::Idle);
        assert_eq!(
            effects.completion,
            Some(Completion {
                event: Event::PressureSetupStep,
                word: 0
            })
        );
    }

    #[test]
    fn test_unexpected_interrupts_are_violations() {
        let txn = make_read(1, ByteOrder::MsbFirst);
        assert_eq!(
            transition(txn, BusInterrupt::Nack),
            Err(ProtocolViolation {
                phase: Phase::Address,
                interrupt: InterruptKind::Nack
            })
        );
        assert!(transition(txn, BusInterrupt::Stop).is_err());
        assert!(transition(txn, BusInterrupt::RxDataValid(0)).is_err());

        let receiving = to_receiving(txn);
        assert!(transition(receiving, BusInterrupt::Nack).is_err());
        assert!(transition(receiving, BusInterrupt::Stop).is_err());
    }

    #[test]
    fn test_idle_rejects_everything() {
        for irq in [
            BusInterrupt::Ack,
            BusInterrupt::Nack,
            BusInterrupt::RxDataValid(1),
            BusInterrupt::Stop,
        ] {
            let err = transition(Transaction::idle(), irq).unwrap_err();
            assert_eq!(err.phase, Phase::Idle);
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(TransferRequest::read(ADDR, 0, 4, ByteOrder::MsbFirst, Event::BootUp).is_valid());
        assert!(!TransferRequest::read(ADDR, 0, 0, ByteOrder::MsbFirst, Event::BootUp).is_valid());
        assert!(!TransferRequest::read(ADDR, 0, 5, ByteOrder::LsbFirst, Event::BootUp).is_valid());
        assert!(TransferRequest::write(ADDR, 0, 0, Event::BootUp).is_valid());
    }

    proptest! {
        #[test]
        fn test_msb_first_assembly(bytes in proptest::collection::vec(any::<u8>(), 1..=4)) {
            let txn = to_receiving(make_read(bytes.len() as u8, ByteOrder::MsbFirst));
            let done = receive_all(txn, &bytes);

            let expected = bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            prop_assert_eq!(done.word, expected);
        }

        #[test]
        fn test_lsb_first_assembly(bytes in proptest::collection::vec(any::<u8>(), 1..=4)) {
            let txn = to_receiving(make_read(bytes.len() as u8, ByteOrder::LsbFirst));
            let done = receive_all(txn, &bytes);

            let expected = bytes
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, b)| acc | (u32::from(*b) << (8 * i)));
            prop_assert_eq!(done.word, expected);
        }
    }
}
