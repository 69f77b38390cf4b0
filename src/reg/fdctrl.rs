//! CAN FD Control Register
use bitfield::bitfield;

bitfield! {
    /// FDCTRL value
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Fdctrl(u32);
    impl Debug;
    /// Bit Rate Switch Enable
    pub fdrate, set_fdrate: 31;
    /// Message Buffer Data Size for Region 3
    pub u8, mbdsr3, set_mbdsr3: 26, 25;
    /// Message Buffer Data Size for Region 2
    pub u8, mbdsr2, set_mbdsr2: 23, 22;
    /// Message Buffer Data Size for Region 1
    pub u8, mbdsr1, set_mbdsr1: 20, 19;
    /// Message Buffer Data Size for Region 0
    pub u8, mbdsr0, set_mbdsr0: 17, 16;
    /// Transceiver Delay Compensation Enable
    pub tdcen, set_tdcen: 15;
    /// Transceiver Delay Compensation Fail (write 1 to clear)
    pub tdcfail, set_tdcfail: 14;
    /// Transceiver Delay Compensation Offset
    pub u8, tdcoff, set_tdcoff: 12, 8;
    /// Transceiver Delay Compensation Value
    pub u8, tdcval, _: 5, 0;
}

super::register_value!(Fdctrl);

impl Fdctrl {
    /// Data size selector of mailbox RAM `region`
    pub fn mbdsr(&self, region: usize) -> u8 {
        match region {
            0 => self.mbdsr0(),
            1 => self.mbdsr1(),
            2 => self.mbdsr2(),
            _ => self.mbdsr3(),
        }
    }

    /// Sets the data size selector of mailbox RAM `region`
    pub fn set_mbdsr(&mut self, region: usize, value: u8) {
        match region {
            0 => self.set_mbdsr0(value),
            1 => self.set_mbdsr1(value),
            2 => self.set_mbdsr2(value),
            _ => self.set_mbdsr3(value),
        }
    }
}
