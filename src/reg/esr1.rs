//! Error and Status 1 Register
//!
//! The interrupt flags (`*INT*`) are write 1 to clear. The error bits are
//! sticky and cleared by the hardware when the register is read.
use bitfield::bitfield;

bitfield! {
    /// ESR1 value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Esr1(u32);
    impl Debug;
    /// Bit1 Error in the data phase of FD frames
    pub bit1err_fast, _: 31;
    /// Bit0 Error in the data phase of FD frames
    pub bit0err_fast, _: 30;
    /// CRC Error in the data phase of FD frames
    pub crcerr_fast, _: 28;
    /// Form Error in the data phase of FD frames
    pub frmerr_fast, _: 27;
    /// Stuffing Error in the data phase of FD frames
    pub stferr_fast, _: 26;
    /// Error Overrun
    pub errovr, set_errovr: 21;
    /// Error Interrupt for errors detected in the data phase of FD frames
    pub errint_fast, set_errint_fast: 20;
    /// Bus Off Done Interrupt
    pub boffdoneint, set_boffdoneint: 19;
    /// CAN Synchronization Status
    pub synch, _: 18;
    /// Tx Warning Interrupt Flag
    pub twrnint, set_twrnint: 17;
    /// Rx Warning Interrupt Flag
    pub rwrnint, set_rwrnint: 16;
    /// Bit1 Error
    pub bit1err, _: 15;
    /// Bit0 Error
    pub bit0err, _: 14;
    /// Acknowledge Error
    pub ackerr, _: 13;
    /// Cyclic Redundancy Check Error
    pub crcerr, _: 12;
    /// Form Error
    pub frmerr, _: 11;
    /// Stuffing Error
    pub stferr, _: 10;
    /// Tx Error Warning
    pub txwrn, _: 9;
    /// Rx Error Warning
    pub rxwrn, _: 8;
    /// Idle
    pub idle, _: 7;
    /// Transmitting
    pub tx, _: 6;
    /// Fault Confinement State
    pub u8, fltconf, _: 5, 4;
    /// Receiving
    pub rx, _: 3;
    /// Bus Off Interrupt
    pub boffint, set_boffint: 2;
    /// Error Interrupt
    pub errint, set_errint: 1;
    /// Wake-Up Interrupt
    pub wakint, set_wakint: 0;
}

super::register_value!(Esr1);
