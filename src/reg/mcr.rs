//! Module Configuration Register
use bitfield::bitfield;

bitfield! {
    /// MCR value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Mcr(u32);
    impl Debug;
    /// Module Disable
    pub mdis, set_mdis: 31;
    /// Freeze Enable
    pub frz, set_frz: 30;
    /// Legacy Rx FIFO Enable
    pub rfen, set_rfen: 29;
    /// Halt
    pub halt, set_halt: 28;
    /// Not Ready
    pub notrdy, _: 27;
    /// Wake Up Interrupt Mask
    pub wakmsk, set_wakmsk: 26;
    /// Soft Reset
    pub softrst, set_softrst: 25;
    /// Freeze Mode Acknowledge
    pub frzack, _: 24;
    /// Supervisor Mode
    pub supv, set_supv: 23;
    /// Self Wake Up
    pub slfwak, set_slfwak: 22;
    /// Warning Interrupt Enable
    pub wrnen, set_wrnen: 21;
    /// Low-Power Mode Acknowledge
    pub lpmack, _: 20;
    /// Wake Up Source (filtered when set)
    pub waksrc, set_waksrc: 19;
    /// Doze Mode Enable
    pub doze, set_doze: 18;
    /// Self Reception Disable
    pub srxdis, set_srxdis: 17;
    /// Individual Rx Masking And Queue Enable
    pub irmq, set_irmq: 16;
    /// Local Priority Enable
    pub lprioen, set_lprioen: 13;
    /// Abort Enable
    pub aen, set_aen: 12;
    /// CAN FD operation enable
    pub fden, set_fden: 11;
    /// ID Acceptance Mode of the Rx FIFO filter table
    pub u8, idam, set_idam: 9, 8;
    /// Number Of The Last Message Buffer
    pub u8, maxmb, set_maxmb: 6, 0;
}

super::register_value!(Mcr);
