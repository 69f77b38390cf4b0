//! Control 1 Register
use bitfield::bitfield;

bitfield! {
    /// CTRL1 value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Ctrl1(u32);
    impl Debug;
    /// Prescaler Division Factor (classic timing, unused with CBT.BTF)
    pub u8, presdiv, set_presdiv: 31, 24;
    /// Resync Jump Width
    pub u8, rjw, set_rjw: 23, 22;
    /// Phase Segment 1
    pub u8, pseg1, set_pseg1: 21, 19;
    /// Phase Segment 2
    pub u8, pseg2, set_pseg2: 18, 16;
    /// Bus Off Interrupt Mask
    pub boffmsk, set_boffmsk: 15;
    /// Error Interrupt Mask
    pub errmsk, set_errmsk: 14;
    /// Clock Source (peripheral clock when set)
    pub clksrc, set_clksrc: 13;
    /// Loop Back Mode
    pub lpb, set_lpb: 12;
    /// Tx Warning Interrupt Mask
    pub twrnmsk, set_twrnmsk: 11;
    /// Rx Warning Interrupt Mask
    pub rwrnmsk, set_rwrnmsk: 10;
    /// CAN Bit Sampling
    pub smp, set_smp: 7;
    /// Bus Off Recovery (automatic recovery disabled when set)
    pub boffrec, set_boffrec: 6;
    /// Timer Sync
    pub tsyn, set_tsyn: 5;
    /// Lowest Buffer Transmitted First
    pub lbuf, set_lbuf: 4;
    /// Listen-Only Mode
    pub lom, set_lom: 3;
    /// Propagation Segment
    pub u8, propseg, set_propseg: 2, 0;
}

super::register_value!(Ctrl1);
