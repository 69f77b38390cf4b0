//! Control 2 Register
use bitfield::bitfield;

bitfield! {
    /// CTRL2 value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Ctrl2(u32);
    impl Debug;
    /// Error Interrupt Mask for errors detected in the data phase
    pub errmsk_fast, set_errmsk_fast: 31;
    /// Bus Off Done Interrupt Mask
    pub boffdonemsk, set_boffdonemsk: 30;
    /// Error-correction Configuration Register Write Enable
    pub ecrwre, set_ecrwre: 29;
    /// Write-Access To Memory In Freeze Mode
    pub wrmfrz, set_wrmfrz: 28;
    /// Number Of Legacy Rx FIFO Filters
    pub u8, rffn, set_rffn: 27, 24;
    /// Tx Arbitration Start Delay
    pub u8, tasd, set_tasd: 23, 19;
    /// Mailboxes Reception Priority
    pub mrp, set_mrp: 18;
    /// Remote Request Storing
    pub rrs, set_rrs: 17;
    /// Entire Frame Arbitration Field Comparison Enable
    pub eacen, set_eacen: 16;
    /// Timer Source
    pub timer_src, set_timer_src: 15;
    /// Protocol Exception Enable
    pub prexcen, set_prexcen: 14;
    /// ISO CAN FD Enable
    pub isocanfden, set_isocanfden: 12;
    /// Edge Filter Disable
    pub edfltdis, set_edfltdis: 11;
}

super::register_value!(Ctrl2);
