//! CAN Bit Timing Register
use bitfield::bitfield;

bitfield! {
    /// CBT value. Every field holds its value minus one.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Cbt(u32);
    impl Debug;
    /// Bit Timing Format (use this register instead of CTRL1 timing)
    pub btf, set_btf: 31;
    /// Extended Prescaler Division Factor
    pub u16, epresdiv, set_epresdiv: 30, 21;
    /// Extended Resync Jump Width
    pub u8, erjw, set_erjw: 20, 16;
    /// Extended Propagation Segment
    pub u8, epropseg, set_epropseg: 15, 10;
    /// Extended Phase Segment 1
    pub u8, epseg1, set_epseg1: 9, 5;
    /// Extended Phase Segment 2
    pub u8, epseg2, set_epseg2: 4, 0;
}

super::register_value!(Cbt);
