//! Error and Status 2 Register
use bitfield::bitfield;

bitfield! {
    /// ESR2 value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Esr2(u32);
    impl Debug;
    /// Lowest Priority Tx Mailbox
    pub u8, lptm, _: 22, 16;
    /// Valid Priority Status
    pub vps, _: 14;
    /// Inactive Mailbox
    pub imb, _: 13;
}

super::register_value!(Esr2);
