//! Error Counter
use bitfield::bitfield;

bitfield! {
    /// ECR value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Ecr(u32);
    impl Debug;
    /// Receive Error Counter for the data phase of FD frames
    pub u8, rxerrcnt_fast, _: 31, 24;
    /// Transmit Error Counter for the data phase of FD frames
    pub u8, txerrcnt_fast, _: 23, 16;
    /// Receive Error Counter
    pub u8, rxerrcnt, _: 15, 8;
    /// Transmit Error Counter
    pub u8, txerrcnt, _: 7, 0;
}

super::register_value!(Ecr);
