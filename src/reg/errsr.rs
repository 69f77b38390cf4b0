//! Error Status Register
use bitfield::bitfield;

bitfield! {
    /// ERRSR value. All flags are write 1 to clear.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Errsr(u32);
    impl Debug;
    /// Host Access With Non-Correctable Error Interrupt Flag
    pub hanceif, set_hanceif: 19;
    /// CAN Engine Access With Non-Correctable Error Interrupt Flag
    pub fanceif, set_fanceif: 18;
    /// Correctable Error Interrupt Flag
    pub ceif, set_ceif: 16;
    /// Host Access With Non-Correctable Error Interrupt Overrun Flag
    pub hanceiof, set_hanceiof: 3;
    /// CAN Engine Access With Non-Correctable Error Interrupt Overrun Flag
    pub fanceiof, set_fanceiof: 2;
    /// Correctable Error Interrupt Overrun Flag
    pub ceiof, set_ceiof: 0;
}

super::register_value!(Errsr);
