//! Handling of messages/frames

pub mod tx;

use crate::reg::mb::{MbCs, MbId};
use core::cmp::min;
use embedded_can::{ExtendedId, Id, StandardId};

/// Data does not fit in the frame or the mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TooMuchData;

/// State of a mailbox, as encoded in the `CODE` field of its control/status
/// word
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MbCode {
    /// Receive mailbox, not active
    RxInactive,
    /// Receive mailbox holding a frame
    RxFull,
    /// Receive mailbox waiting for a frame
    RxEmpty,
    /// Receive mailbox overwritten before it was read
    RxOverrun,
    /// Receive mailbox being updated by the controller
    RxBusy,
    /// Receive mailbox that transmits a remote request and then waits for
    /// the answer
    RxRanswer,
    /// Transmit mailbox, not active
    TxInactive,
    /// Transmit mailbox aborted
    TxAbort,
    /// Transmit mailbox with a data or remote frame pending
    TxData,
    /// Transmit mailbox answering matching remote requests
    TxTanswer,
    /// Reserved encodings
    NotUsed,
}

impl MbCode {
    /// Decodes the 4-bit `CODE` field
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0xf {
            0x0 => MbCode::RxInactive,
            0x2 => MbCode::RxFull,
            0x4 => MbCode::RxEmpty,
            0x6 => MbCode::RxOverrun,
            0x1 | 0x3 | 0x5 | 0x7 => MbCode::RxBusy,
            0xA => MbCode::RxRanswer,
            0x8 => MbCode::TxInactive,
            0x9 => MbCode::TxAbort,
            0xC => MbCode::TxData,
            0xE => MbCode::TxTanswer,
            _ => MbCode::NotUsed,
        }
    }

    /// Value written to the `CODE` field
    pub fn bits(self) -> u8 {
        match self {
            MbCode::RxInactive => 0x0,
            MbCode::RxFull => 0x2,
            MbCode::RxEmpty => 0x4,
            MbCode::RxOverrun => 0x6,
            MbCode::RxBusy => 0x1,
            MbCode::RxRanswer => 0xA,
            MbCode::TxInactive => 0x8,
            MbCode::TxAbort => 0x9,
            MbCode::TxData => 0xC,
            MbCode::TxTanswer => 0xE,
            MbCode::NotUsed => 0xF,
        }
    }

    /// `true` if a transmission may be started on a mailbox in this state
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            MbCode::RxInactive | MbCode::TxInactive | MbCode::TxAbort
        )
    }
}

/// CAN frame in the representation of a mailbox: control/status word,
/// identifier word and up to 64 payload bytes.
///
/// Frames to transmit are built with [`tx::MessageBuilder`] or
/// [`embedded_can::Frame`]; received frames are returned by
/// [`Can::mb_receive`](crate::bus::Can::mb_receive) and
/// [`Can::fifo_receive`](crate::bus::Can::fifo_receive).
#[derive(Copy, Clone, Debug)]
pub struct Message {
    pub(crate) cs: MbCs,
    pub(crate) id: MbId,
    pub(crate) data: [u8; 64],
}

impl Message {
    /// Returns the CAN identifier of the message
    pub fn id(&self) -> Id {
        if self.is_extended() {
            // The field is 29 bits wide
            Id::Extended(ExtendedId::new(self.id.ext()).unwrap_or(ExtendedId::ZERO))
        } else {
            // The field is 11 bits wide
            Id::Standard(StandardId::new(self.id.std()).unwrap_or(StandardId::ZERO))
        }
    }

    /// Data length in bytes
    pub fn len(&self) -> usize {
        if self.fd_format() {
            compute_payload_size(self.dlc())
        } else {
            min(self.dlc() as usize, 8)
        }
    }

    /// `true` if the frame carries no payload
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Data length code
    pub fn dlc(&self) -> u8 {
        self.cs.dlc()
    }

    /// True if the header indicates that the frame uses the CAN FD format
    pub fn fd_format(&self) -> bool {
        self.cs.edl()
    }

    /// Remote Transmission Request
    pub fn is_remote_frame(&self) -> bool {
        self.cs.rtr()
    }

    /// Check if the frame uses and extended (29-bit) ID
    pub fn is_extended(&self) -> bool {
        self.cs.ide()
    }

    /// `true` if the sender of the message indicates that it is in "error
    /// passive" state.
    pub fn is_transmitter_error_passive(&self) -> bool {
        self.cs.esi()
    }

    /// `true` if bit rate switching is used
    pub fn bit_rate_switching(&self) -> bool {
        self.cs.brs()
    }

    /// Value of the free running timer captured when the frame was received
    /// or transmitted
    pub fn time_stamp(&self) -> u16 {
        self.cs.time_stamp()
    }

    /// Data field
    pub fn data(&self) -> &[u8] {
        if !self.is_remote_frame() {
            &self.data[..self.len()]
        } else {
            &[]
        }
    }
}

impl embedded_can::Frame for Message {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        tx::MessageBuilder {
            id: id.into(),
            frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Data(data)),
        }
        .build()
        .ok()
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        tx::MessageBuilder {
            id: id.into(),
            frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Remote { desired_len: dlc }),
        }
        .build()
        .ok()
    }

    fn is_extended(&self) -> bool {
        Message::is_extended(self)
    }

    fn is_remote_frame(&self) -> bool {
        Message::is_remote_frame(self)
    }

    fn id(&self) -> Id {
        Message::id(self)
    }

    fn dlc(&self) -> usize {
        Message::dlc(self).into()
    }

    fn data(&self) -> &[u8] {
        Message::data(self)
    }
}

/// Finds the smallest data length code that encodes at least `len` bytes.
/// Returns the code and the number of bytes it stands for.
pub fn compute_dlc_and_data_size(len: usize) -> Result<(u8, usize), TooMuchData> {
    let dlc = match len {
        0..=8 => len as u8,
        9..=12 => 9,
        13..=16 => 10,
        17..=20 => 11,
        21..=24 => 12,
        25..=32 => 13,
        33..=48 => 14,
        49..=64 => 15,
        _ => return Err(TooMuchData),
    };
    Ok((dlc, compute_payload_size(dlc)))
}

/// Converts a CAN FD data length code to a length in bytes
pub fn compute_payload_size(dlc: u8) -> usize {
    match dlc {
        0..=8 => dlc.into(),
        9 => 12,
        10 => 16,
        11 => 20,
        12 => 24,
        13 => 32,
        14 => 48,
        15.. => 64,
    }
}
