//! Messages to be sent on the bus

use super::*;

/// Selects the type of the Classic CAN frame.
pub enum ClassicFrameType<'a> {
    /// 0-8 byte message payload
    Data(&'a [u8]),
    /// Requests transmission of the identified frame
    Remote {
        /// Length, in bytes, of the requested frame
        desired_len: usize,
    },
}

/// Selects frame type along with the valid payload type and configuration
/// specific to the chosen format.
pub enum FrameType<'a> {
    /// Classic CAN
    Classic(ClassicFrameType<'a>),
    /// CAN FD frame. Note that the peripheral must be initialized with CAN FD
    /// enabled to support this format.
    FlexibleDatarate {
        /// 0-64 byte message payload. The length is rounded up to the next
        /// size a data length code can express.
        payload: &'a [u8],
        /// Parts of the frame are transmitted at a higher bit rate. Note that
        /// bit rate switching must be enabled in the peripheral configuration
        /// as well.
        bit_rate_switching: bool,
        /// If `true`, the error state indicator of the message will indicate
        /// 'error passive'. If `false`, the actual state of the
        /// peripheral will be indicated.
        force_error_state_indicator: bool,
        /// Byte filling the gap between the end of `payload` and the size
        /// selected by the data length code. Zero when `None`.
        padding: Option<u8>,
    },
}

/// Describes a CAN message/frame that is not yet converted to the
/// representation the peripheral understands.
pub struct MessageBuilder<'a> {
    /// CAN identifier for the frame
    pub id: Id,
    /// Message frame type with a payload
    pub frame_type: FrameType<'a>,
}

impl<'a> MessageBuilder<'a> {
    /// Create the message in the format required by the peripheral.
    pub fn build(self) -> Result<Message, TooMuchData> {
        let mut data = [0; 64];
        let mut cs = MbCs::default();
        let mut id = MbId::default();

        match self.id {
            Id::Standard(std) => id.set_std(std.as_raw()),
            Id::Extended(ext) => {
                id.set_ext(ext.as_raw());
                cs.set_ide(true);
                cs.set_srr(true);
            }
        }

        match self.frame_type {
            FrameType::Classic(ClassicFrameType::Data(payload)) => {
                if payload.len() > 8 {
                    return Err(TooMuchData);
                }
                data[..payload.len()].copy_from_slice(payload);
                cs.set_dlc(payload.len() as u8);
            }
            FrameType::Classic(ClassicFrameType::Remote { desired_len }) => {
                if desired_len > 8 {
                    return Err(TooMuchData);
                }
                cs.set_rtr(true);
                cs.set_dlc(desired_len as u8);
            }
            FrameType::FlexibleDatarate {
                payload,
                bit_rate_switching,
                force_error_state_indicator,
                padding,
            } => {
                let (dlc, size) = compute_dlc_and_data_size(payload.len())?;
                data[..payload.len()].copy_from_slice(payload);
                if let Some(padding) = padding {
                    data[payload.len()..size].fill(padding);
                }
                cs.set_edl(true);
                cs.set_brs(bit_rate_switching);
                cs.set_esi(force_error_state_indicator);
                cs.set_dlc(dlc);
            }
        }

        Ok(Message { cs, id, data })
    }
}
