//! Mailbox header words
//!
//! Every mailbox starts with a control/status word followed by an
//! identifier word. The payload follows as big-endian words.
use bitfield::bitfield;

/// Byte offset of the control/status word inside a mailbox
pub const CS: usize = 0x0;
/// Byte offset of the identifier word inside a mailbox
pub const ID: usize = 0x4;
/// Byte offset of the payload inside a mailbox
pub const DATA: usize = 0x8;

bitfield! {
    /// Control and status word
    #[derive(Copy, Clone, PartialEq, Eq, Default)]
    pub struct MbCs(u32);
    impl Debug;
    /// Extended Data Length (FD frame)
    pub edl, set_edl: 31;
    /// Bit Rate Switch
    pub brs, set_brs: 30;
    /// Error State Indicator
    pub esi, set_esi: 29;
    /// Mailbox code
    pub u8, code, set_code: 27, 24;
    /// Substitute Remote Request
    pub srr, set_srr: 22;
    /// ID Extended
    pub ide, set_ide: 21;
    /// Remote Transmission Request
    pub rtr, set_rtr: 20;
    /// Data Length Code
    pub u8, dlc, set_dlc: 19, 16;
    /// Free running timer value captured on the frame
    pub u16, time_stamp, _: 15, 0;
}

super::register_value!(MbCs);

bitfield! {
    /// Identifier word
    #[derive(Copy, Clone, PartialEq, Eq, Default)]
    pub struct MbId(u32);
    impl Debug;
    /// Local priority
    pub u8, prio, set_prio: 31, 29;
    /// Standard identifier
    pub u16, std, set_std: 28, 18;
    /// Extended identifier
    pub u32, ext, set_ext: 28, 0;
}

super::register_value!(MbId);
