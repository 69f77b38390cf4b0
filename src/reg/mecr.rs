//! Memory Error Control Register
//!
//! Writable only while `CTRL2.ECRWRE` is set and `ECRWRDIS` is clear.
use bitfield::bitfield;

bitfield! {
    /// MECR value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Mecr(u32);
    impl Debug;
    /// Error Configuration Register Write Disable
    pub ecrwrdis, set_ecrwrdis: 31;
    /// Host Access With Non-Correctable Errors Interrupt Mask
    pub hancei_msk, set_hancei_msk: 19;
    /// CAN Engine Access With Non-Correctable Errors Interrupt Mask
    pub fancei_msk, set_fancei_msk: 18;
    /// Correctable Errors Interrupt Mask
    pub cei_msk, set_cei_msk: 16;
    /// Host Access Error Injection Enable
    pub haerrie, set_haerrie: 15;
    /// CAN Engine Access Error Injection Enable
    pub faerrie, set_faerrie: 14;
    /// Extended Error Injection Enable
    pub exterrie, set_exterrie: 13;
    /// Error Report Disable
    pub rerrdis, set_rerrdis: 9;
    /// Error Correction Disable
    pub eccdis, set_eccdis: 8;
    /// Non-Correctable Errors In CAN Engine Access Put Device In Freeze Mode
    pub ncefafrz, set_ncefafrz: 7;
}

super::register_value!(Mecr);
