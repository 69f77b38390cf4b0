//! CAN FD Bit Timing Register
use bitfield::bitfield;

bitfield! {
    /// FDCBT value. The propagation segment is stored as is, the other
    /// fields hold their value minus one.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Fdcbt(u32);
    impl Debug;
    /// Fast Prescaler Division Factor
    pub u16, fpresdiv, set_fpresdiv: 29, 20;
    /// Fast Resync Jump Width
    pub u8, frjw, set_frjw: 18, 16;
    /// Fast Propagation Segment
    pub u8, fpropseg, set_fpropseg: 14, 10;
    /// Fast Phase Segment 1
    pub u8, fpseg1, set_fpseg1: 7, 5;
    /// Fast Phase Segment 2
    pub u8, fpseg2, set_fpseg2: 2, 0;
}

super::register_value!(Fdcbt);
