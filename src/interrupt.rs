//! Interrupt sources, callbacks and dispatch
//!
//! Every instance raises a handful of hardware interrupt lines ([`IrqLine`]).
//! A line may carry several sources ([`Interrupt`]). [`Can::handle`] checks
//! the enabled and flagged sources of a line, clears their flags and calls
//! the callback installed for the source. Sources without a callback are
//! masked so they cannot fire again.

use crate::bus::Can;
use crate::reg::{self, RegisterAccess};
use crate::rx_fifo;
use bitfield::bitfield;

/// Function called for a flagged interrupt source
pub type Callback<A> = fn(&mut Can<A>, Event);

/// What a [`Callback`] is called for
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// A non-mailbox source
    Interrupt(Interrupt),
    /// Mailbox completed a transmission or reception. Its flag is already
    /// cleared.
    Mailbox(usize),
}

bitfield! {
    /// A set of CAN interrupts.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct InterruptSet(u32);

    /// Entered bus off
    pub bus_off, set_bus_off: 0;
    /// Bus off recovery completed
    pub bus_off_done, set_bus_off_done: 1;
    /// Transmit error counter crossed 96
    pub tx_warning, set_tx_warning: 2;
    /// Receive error counter crossed 96
    pub rx_warning, set_rx_warning: 3;
    /// Bus error
    pub error, set_error: 4;
    /// Bus error in the data phase of a bit rate switched frame
    pub error_fast, set_error_fast: 5;
    /// Woken up by bus activity
    pub self_wakeup, set_self_wakeup: 6;
    /// Non-correctable memory error on a host access
    pub host_memory_error, set_host_memory_error: 7;
    /// Non-correctable memory error on a controller access
    pub can_memory_error, set_can_memory_error: 8;
    /// Corrected memory error
    pub correctable_memory_error, set_correctable_memory_error: 9;
    /// Frame available in the Rx FIFO
    pub rx_fifo_frame_available, set_rx_fifo_frame_available: 10;
    /// Rx FIFO almost full
    pub rx_fifo_warning, set_rx_fifo_warning: 11;
    /// Rx FIFO lost a frame
    pub rx_fifo_overflow, set_rx_fifo_overflow: 12;
    /// Mailbox of group 0
    pub mailbox_group_0, set_mailbox_group_0: 13;
    /// Mailbox of group 1
    pub mailbox_group_1, set_mailbox_group_1: 14;
    /// Mailbox of group 2
    pub mailbox_group_2, set_mailbox_group_2: 15;
    /// Mailbox of group 3
    pub mailbox_group_3, set_mailbox_group_3: 16;
}

impl FromIterator<Interrupt> for InterruptSet {
    fn from_iter<T: IntoIterator<Item = Interrupt>>(iter: T) -> Self {
        let mut set = 0_u32;
        for int in iter.into_iter() {
            set |= u32::from(int);
        }
        InterruptSet(set)
    }
}

impl From<Interrupt> for InterruptSet {
    fn from(int: Interrupt) -> Self {
        InterruptSet(u32::from(int))
    }
}

impl core::fmt::Debug for InterruptSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "InterruptSet {{ ")?;
        for int in self.iter() {
            write!(f, "{:?} ", int)?;
        }
        write!(f, "}}")
    }
}

/// A single interrupt source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    /// ESR1.BOFFINT
    BusOff = 0,
    /// ESR1.BOFFDONEINT
    BusOffDone = 1,
    /// ESR1.TWRNINT
    TxWarning = 2,
    /// ESR1.RWRNINT
    RxWarning = 3,
    /// ESR1.ERRINT
    Error = 4,
    /// ESR1.ERRINT_FAST
    ErrorFast = 5,
    /// ESR1.WAKINT
    SelfWakeup = 6,
    /// ERRSR.HANCEIF
    HostMemoryError = 7,
    /// ERRSR.FANCEIF
    CanMemoryError = 8,
    /// ERRSR.CEIF
    CorrectableMemoryError = 9,
    /// IFLAG1.BUF5I with the Rx FIFO enabled
    RxFifoFrameAvailable = 10,
    /// IFLAG1.BUF6I with the Rx FIFO enabled
    RxFifoWarning = 11,
    /// IFLAG1.BUF7I with the Rx FIFO enabled
    RxFifoOverflow = 12,
    /// Mailbox flags of group 0
    MailboxGroup0 = 13,
    /// Mailbox flags of group 1
    MailboxGroup1 = 14,
    /// Mailbox flags of group 2
    MailboxGroup2 = 15,
    /// Mailbox flags of group 3
    MailboxGroup3 = 16,
}

impl Interrupt {
    /// Number of interrupt sources
    pub const COUNT: usize = 17;

    /// Mailbox group of the `MailboxGroup*` sources
    pub fn mailbox_group(self) -> Option<usize> {
        match self {
            Interrupt::MailboxGroup0 => Some(0),
            Interrupt::MailboxGroup1 => Some(1),
            Interrupt::MailboxGroup2 => Some(2),
            Interrupt::MailboxGroup3 => Some(3),
            _ => None,
        }
    }
}

impl From<Interrupt> for u32 {
    fn from(x: Interrupt) -> Self {
        1 << x as u32
    }
}

/// The number does not name an interrupt source
#[derive(Debug)]
pub struct InvalidInterruptNumber;

impl TryFrom<u8> for Interrupt {
    type Error = InvalidInterruptNumber;

    fn try_from(value: u8) -> Result<Self, InvalidInterruptNumber> {
        use Interrupt::*;
        let ret = match value {
            0 => BusOff,
            1 => BusOffDone,
            2 => TxWarning,
            3 => RxWarning,
            4 => Error,
            5 => ErrorFast,
            6 => SelfWakeup,
            7 => HostMemoryError,
            8 => CanMemoryError,
            9 => CorrectableMemoryError,
            10 => RxFifoFrameAvailable,
            11 => RxFifoWarning,
            12 => RxFifoOverflow,
            13 => MailboxGroup0,
            14 => MailboxGroup1,
            15 => MailboxGroup2,
            16 => MailboxGroup3,
            17.. => Err(InvalidInterruptNumber)?,
        };
        Ok(ret)
    }
}

impl InterruptSet {
    /// An iterator visiting all elements in arbitrary order.
    pub fn iter(&self) -> Iter {
        Iter {
            flags: *self,
            index: 0,
        }
    }

    /// `true` if `int` is in the set
    pub fn contains(&self, int: Interrupt) -> bool {
        self.0 & u32::from(int) != 0
    }
}

/// An iterator over the items of an [`InterruptSet`].
///
/// This `struct` is created by [`InterruptSet::iter`].
pub struct Iter {
    flags: InterruptSet,
    index: u8,
}

impl Iterator for Iter {
    type Item = Interrupt;

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.index;
        self.index = self.index.saturating_add(1);
        // Since there are no gaps in the interrupt flags, this will be `Some` until all
        // interrupts have been checked.
        let int = i.try_into().ok()?;
        if self.flags.0 & (1 << i) != 0 {
            Some(int)
        } else {
            self.next()
        }
    }
}

/// Hardware interrupt lines of an instance
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqLine {
    /// Bus off
    BusOff,
    /// Bus off recovery done
    BusOffDone,
    /// Transmit warning
    TxWarning,
    /// Receive warning
    RxWarning,
    /// Bus error
    Error,
    /// Bus error in the fast data phase
    ErrorFast,
    /// Self wake up
    SelfWakeup,
    /// Memory errors
    Ecc,
    /// Mailboxes 0-15, or 0-31 on 128-mailbox instances. Carries the Rx FIFO
    /// flags when the FIFO is enabled.
    Mailboxes0,
    /// Mailboxes 16-31, or 32-63 on 128-mailbox instances
    Mailboxes1,
    /// Mailboxes 32-47, or 64-95 on 128-mailbox instances
    Mailboxes2,
    /// Mailboxes 48-63, or 96-127 on 128-mailbox instances
    Mailboxes3,
}

impl IrqLine {
    /// All lines of an instance
    pub const ALL: [IrqLine; 12] = [
        IrqLine::BusOff,
        IrqLine::BusOffDone,
        IrqLine::TxWarning,
        IrqLine::RxWarning,
        IrqLine::Error,
        IrqLine::ErrorFast,
        IrqLine::SelfWakeup,
        IrqLine::Ecc,
        IrqLine::Mailboxes0,
        IrqLine::Mailboxes1,
        IrqLine::Mailboxes2,
        IrqLine::Mailboxes3,
    ];

    /// Sources signalled on this line
    pub fn interrupts(self) -> &'static [Interrupt] {
        match self {
            IrqLine::BusOff => &[Interrupt::BusOff],
            IrqLine::BusOffDone => &[Interrupt::BusOffDone],
            IrqLine::TxWarning => &[Interrupt::TxWarning],
            IrqLine::RxWarning => &[Interrupt::RxWarning],
            IrqLine::Error => &[Interrupt::Error],
            IrqLine::ErrorFast => &[Interrupt::ErrorFast],
            IrqLine::SelfWakeup => &[Interrupt::SelfWakeup],
            IrqLine::Ecc => &[
                Interrupt::HostMemoryError,
                Interrupt::CanMemoryError,
                Interrupt::CorrectableMemoryError,
            ],
            IrqLine::Mailboxes0 => &[
                Interrupt::RxFifoFrameAvailable,
                Interrupt::RxFifoWarning,
                Interrupt::RxFifoOverflow,
                Interrupt::MailboxGroup0,
            ],
            IrqLine::Mailboxes1 => &[Interrupt::MailboxGroup1],
            IrqLine::Mailboxes2 => &[Interrupt::MailboxGroup2],
            IrqLine::Mailboxes3 => &[Interrupt::MailboxGroup3],
        }
    }
}

/// ESR1 flag of the status interrupts
fn esr1_flag(int: Interrupt) -> Option<u32> {
    let bit = match int {
        Interrupt::BusOff => 2,
        Interrupt::BusOffDone => 19,
        Interrupt::TxWarning => 17,
        Interrupt::RxWarning => 16,
        Interrupt::Error => 1,
        Interrupt::ErrorFast => 20,
        Interrupt::SelfWakeup => 0,
        _ => return None,
    };
    Some(1 << bit)
}

/// ERRSR flag of the memory error interrupts
fn errsr_flag(int: Interrupt) -> Option<u32> {
    let bit = match int {
        Interrupt::HostMemoryError => 19,
        Interrupt::CanMemoryError => 18,
        Interrupt::CorrectableMemoryError => 16,
        _ => return None,
    };
    Some(1 << bit)
}

/// IFLAG1/IMASK1 bit of the Rx FIFO interrupts
fn fifo_flag(int: Interrupt) -> Option<u32> {
    match int {
        Interrupt::RxFifoFrameAvailable => Some(rx_fifo::FRAME_AVAILABLE),
        Interrupt::RxFifoWarning => Some(rx_fifo::WARNING),
        Interrupt::RxFifoOverflow => Some(rx_fifo::OVERFLOW),
        _ => None,
    }
}

impl<A: RegisterAccess> Can<A> {
    /// Installs `callback` for `int`, replacing the previous one
    pub fn install_callback(&mut self, int: Interrupt, callback: Callback<A>) {
        self.callbacks[int as usize] = Some(callback);
    }

    /// Removes the callback of `int`. The source masks itself the next time
    /// it fires.
    pub fn remove_callback(&mut self, int: Interrupt) -> Option<Callback<A>> {
        self.callbacks[int as usize].take()
    }

    /// Number of mailboxes signalled on one mailbox interrupt line
    pub fn mailbox_group_size(&self) -> usize {
        if self.id().mailbox_count() > 64 {
            32
        } else {
            16
        }
    }

    /// IFLAG/IMASK bank and bits of the usable mailboxes of `group`
    fn mailbox_group_bits(&self, group: usize) -> (usize, u32) {
        let size = self.mailbox_group_size();
        let first = group * size;
        let bank = first / 32;

        let reserved = if self.rx_fifo_enabled() {
            self.rx_fifo_filters().reserved_mailboxes()
        } else {
            0
        };
        let start = first.max(reserved);
        let end = (first + size).min(self.mailbox_count());
        let bits = (start..end).fold(0, |bits, mb| bits | 1 << (mb % 32));
        (bank, bits)
    }

    /// `true` if `int` is unmasked
    pub fn interrupt_enabled(&self, int: Interrupt) -> bool {
        let ctrl1 = self.regs.ctrl1().read();
        let ctrl2 = self.regs.ctrl2().read();
        let mecr = self.regs.mecr().read();
        match int {
            Interrupt::BusOff => ctrl1.boffmsk(),
            Interrupt::BusOffDone => ctrl2.boffdonemsk(),
            Interrupt::TxWarning => ctrl1.twrnmsk(),
            Interrupt::RxWarning => ctrl1.rwrnmsk(),
            Interrupt::Error => ctrl1.errmsk(),
            Interrupt::ErrorFast => ctrl2.errmsk_fast(),
            Interrupt::SelfWakeup => self.regs.mcr().read().wakmsk(),
            Interrupt::HostMemoryError => mecr.hancei_msk(),
            Interrupt::CanMemoryError => mecr.fancei_msk(),
            Interrupt::CorrectableMemoryError => mecr.cei_msk(),
            Interrupt::RxFifoFrameAvailable | Interrupt::RxFifoWarning | Interrupt::RxFifoOverflow => {
                let bit = fifo_flag(int).unwrap_or(0);
                self.rx_fifo_enabled() && self.regs.imask(0).read() & bit != 0
            }
            Interrupt::MailboxGroup0
            | Interrupt::MailboxGroup1
            | Interrupt::MailboxGroup2
            | Interrupt::MailboxGroup3 => {
                let group = int.mailbox_group().unwrap_or(0);
                let (bank, bits) = self.mailbox_group_bits(group);
                self.regs.imask(bank).read() & bits != 0
            }
        }
    }

    /// Unmasks or masks `int`. For the mailbox groups this affects every
    /// usable mailbox of the group.
    pub fn set_interrupt(&mut self, int: Interrupt, enable: bool) {
        match int {
            Interrupt::BusOff => self.regs.ctrl1().modify(|r| r.set_boffmsk(enable)),
            Interrupt::BusOffDone => self.regs.ctrl2().modify(|r| r.set_boffdonemsk(enable)),
            Interrupt::TxWarning => self.regs.ctrl1().modify(|r| r.set_twrnmsk(enable)),
            Interrupt::RxWarning => self.regs.ctrl1().modify(|r| r.set_rwrnmsk(enable)),
            Interrupt::Error => self.regs.ctrl1().modify(|r| r.set_errmsk(enable)),
            Interrupt::ErrorFast => self.regs.ctrl2().modify(|r| r.set_errmsk_fast(enable)),
            Interrupt::SelfWakeup => self.regs.mcr().modify(|r| r.set_wakmsk(enable)),
            Interrupt::HostMemoryError => self.modify_mecr(|r| r.set_hancei_msk(enable)),
            Interrupt::CanMemoryError => self.modify_mecr(|r| r.set_fancei_msk(enable)),
            Interrupt::CorrectableMemoryError => self.modify_mecr(|r| r.set_cei_msk(enable)),
            Interrupt::RxFifoFrameAvailable | Interrupt::RxFifoWarning | Interrupt::RxFifoOverflow => {
                let bit = fifo_flag(int).unwrap_or(0);
                self.modify_imask(0, bit, enable);
            }
            Interrupt::MailboxGroup0
            | Interrupt::MailboxGroup1
            | Interrupt::MailboxGroup2
            | Interrupt::MailboxGroup3 => {
                let group = int.mailbox_group().unwrap_or(0);
                let (bank, bits) = self.mailbox_group_bits(group);
                self.modify_imask(bank, bits, enable);
            }
        }
    }

    fn modify_imask(&self, bank: usize, bits: u32, enable: bool) {
        self.regs.imask(bank).modify(|r| {
            if enable {
                *r |= bits
            } else {
                *r &= !bits
            }
        });
    }

    /// Unmasks every source in `interrupts`
    pub fn enable_interrupts(&mut self, interrupts: InterruptSet) {
        for int in interrupts.iter() {
            self.set_interrupt(int, true);
        }
    }

    /// Masks every source in `interrupts`
    pub fn disable_interrupts(&mut self, interrupts: InterruptSet) {
        for int in interrupts.iter() {
            self.set_interrupt(int, false);
        }
    }

    /// Sources currently unmasked
    pub fn enabled_interrupts(&self) -> InterruptSet {
        InterruptSet(0x1_ffff)
            .iter()
            .filter(|int| self.interrupt_enabled(*int))
            .collect()
    }

    /// Masks every source, mailboxes included
    pub fn disable_all_interrupts(&mut self) {
        self.regs.ctrl1().modify(|r| {
            r.set_boffmsk(false);
            r.set_errmsk(false);
            r.set_twrnmsk(false);
            r.set_rwrnmsk(false);
        });
        self.regs.ctrl2().modify(|r| {
            r.set_errmsk_fast(false);
            r.set_boffdonemsk(false);
        });
        self.regs.mcr().modify(|r| r.set_wakmsk(false));
        self.modify_mecr(|r| {
            r.set_hancei_msk(false);
            r.set_fancei_msk(false);
            r.set_cei_msk(false);
        });
        for bank in 0..self.id().mailbox_count() / 32 {
            self.regs.imask(bank).write(0);
        }
    }

    /// `true` if the flag of `int` is set, whether the source is masked or
    /// not. For the ESR1 sources this reads ESR1, which clears its error
    /// bits.
    pub fn interrupt_flagged(&self, int: Interrupt) -> bool {
        if let Some(bit) = esr1_flag(int) {
            self.regs.word(reg::ESR1).read() & bit != 0
        } else if let Some(bit) = errsr_flag(int) {
            self.regs.word(reg::ERRSR).read() & bit != 0
        } else if let Some(bit) = fifo_flag(int) {
            self.rx_fifo_enabled() && self.regs.iflag(0).read() & bit != 0
        } else {
            let group = int.mailbox_group().unwrap_or(0);
            let (bank, bits) = self.mailbox_group_bits(group);
            self.regs.iflag(bank).read() & bits != 0
        }
    }

    /// Sources with their flag set
    pub fn flagged_interrupts(&self) -> InterruptSet {
        InterruptSet(0x1_ffff)
            .iter()
            .filter(|int| self.interrupt_flagged(*int))
            .collect()
    }

    /// Clears the flag of `int`. For the mailbox groups this clears the
    /// flags of every usable mailbox of the group.
    pub fn clear_interrupt_flag(&mut self, int: Interrupt) {
        if let Some(bit) = esr1_flag(int) {
            self.regs.word(reg::ESR1).write(bit);
        } else if let Some(bit) = errsr_flag(int) {
            self.regs.word(reg::ERRSR).write(bit);
        } else if let Some(bit) = fifo_flag(int) {
            if self.rx_fifo_enabled() {
                self.regs.iflag(0).write(bit);
            }
        } else {
            let group = int.mailbox_group().unwrap_or(0);
            let (bank, bits) = self.mailbox_group_bits(group);
            self.regs.iflag(bank).write(bits);
        }
    }

    /// Handles hardware interrupt `line` of this instance. To be called from
    /// the interrupt handler of the line.
    pub fn handle(&mut self, line: IrqLine) {
        for &int in line.interrupts() {
            match int.mailbox_group() {
                Some(group) => self.handle_mailboxes(int, group),
                None => self.handle_interrupt(int),
            }
        }
    }

    fn handle_interrupt(&mut self, int: Interrupt) {
        if !self.interrupt_enabled(int) {
            return;
        }
        // Reading ESR1 clears the error bits, so the error sources test their
        // flag on the snapshot instead of reading again
        let snapshot = matches!(int, Interrupt::Error | Interrupt::ErrorFast);
        let flagged = if snapshot {
            self.esr1_buf = self.regs.word(reg::ESR1).read();
            esr1_flag(int).map_or(false, |bit| self.esr1_buf & bit != 0)
        } else {
            self.interrupt_flagged(int)
        };
        if !flagged {
            self.esr1_buf = 0;
            return;
        }
        // The frame available flag pops the FIFO; the callback does that
        // through `fifo_receive`
        if int != Interrupt::RxFifoFrameAvailable {
            self.clear_interrupt_flag(int);
        }
        let callback = self.callbacks[int as usize];
        match callback {
            Some(callback) => callback(self, Event::Interrupt(int)),
            None => {
                self.set_interrupt(int, false);
                #[cfg(feature = "defmt")]
                defmt::warn!("{}: no callback for {}, masked", self.id(), int);
            }
        }
        if snapshot {
            self.esr1_buf = 0;
        }
    }

    fn handle_mailboxes(&mut self, int: Interrupt, group: usize) {
        let (bank, bits) = self.mailbox_group_bits(group);
        let mut pending = self.regs.iflag(bank).read() & self.regs.imask(bank).read() & bits;
        while pending != 0 {
            let bit = pending.trailing_zeros() as usize;
            pending &= pending - 1;
            let mb = 32 * bank + bit;

            self.regs.iflag(bank).write(1 << bit);
            let callback = self.callbacks[int as usize];
            match callback {
                Some(callback) => callback(self, Event::Mailbox(mb)),
                None => {
                    self.modify_imask(bank, 1 << bit, false);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("{}: no callback for mailbox {}, masked", self.id(), mb);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::test::{config, running};
    use crate::config::{CanConfig, RxFifoConfig, RxFifoFilters};
    use crate::instance::InstanceId;
    use crate::sim::Sim;
    use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    #[test]
    fn iter_preserves_length() {
        assert_eq!(InterruptSet(0).iter().count(), 0);
        assert_eq!(InterruptSet(1).iter().count(), 1);
        assert_eq!(InterruptSet(0x1_5555).iter().count(), 9);
        assert_eq!(InterruptSet(0x0_aaaa).iter().count(), 8);
        assert_eq!(InterruptSet(0x1_ffff).iter().count(), 17);
        assert_eq!(InterruptSet(0xffff_ffff).iter().count(), 17);
    }

    fn iter_collect(int: u32) -> u32 {
        InterruptSet::from_iter(InterruptSet(int).iter()).0
    }

    #[test]
    fn iter_collect_preserves_interrupts() {
        assert_eq!(iter_collect(0), 0);
        assert_eq!(iter_collect(1), 1);
        assert_eq!(iter_collect(0x1_5555), 0x1_5555);
        assert_eq!(iter_collect(0x0_aaaa), 0x0_aaaa);
    }

    #[test]
    fn iter_collect_drops_reserved_bits() {
        assert_eq!(iter_collect(0xffff_ffff), 0x1_ffff);
    }

    #[test]
    fn numbers_name_interrupts() {
        assert!(matches!(Interrupt::try_from(5), Ok(Interrupt::ErrorFast)));
        assert!(matches!(Interrupt::try_from(16), Ok(Interrupt::MailboxGroup3)));
        assert!(matches!(Interrupt::try_from(17), Err(InvalidInterruptNumber)));
    }

    #[test]
    fn enable_maps_to_mask_bits() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        // Memory error masks come out of reset set
        assert!(can.interrupt_enabled(Interrupt::CanMemoryError));
        can.disable_all_interrupts();
        assert_eq!(can.enabled_interrupts(), InterruptSet(0));

        let set: InterruptSet = [
            Interrupt::BusOff,
            Interrupt::ErrorFast,
            Interrupt::SelfWakeup,
            Interrupt::HostMemoryError,
        ]
        .into_iter()
        .collect();
        can.enable_interrupts(set);
        assert!(can.regs.ctrl1().read().boffmsk());
        assert!(can.regs.ctrl2().read().errmsk_fast());
        assert!(can.regs.mcr().read().wakmsk());
        let mecr = can.regs.mecr().read();
        assert!(mecr.hancei_msk() && mecr.ecrwrdis());
        assert!(!can.regs.ctrl2().read().ecrwre());
        assert_eq!(can.enabled_interrupts(), set);

        can.disable_interrupts(set);
        assert_eq!(can.enabled_interrupts(), InterruptSet(0));
    }

    #[test]
    fn mailbox_group_masks_cover_configured_mailboxes() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(20));
        can.set_interrupt(Interrupt::MailboxGroup1, true);
        assert_eq!(sim.get(reg::IMASK1), 0x000f_0000);
        can.set_interrupt(Interrupt::MailboxGroup0, true);
        assert_eq!(sim.get(reg::IMASK1), 0x000f_ffff);

        let mut can = running(&sim, InstanceId::Can0, &config(128));
        assert_eq!(can.mailbox_group_size(), 32);
        can.set_interrupt(Interrupt::MailboxGroup3, true);
        assert_eq!(sim.get(reg::IMASK4), 0xffff_ffff);
        assert_eq!(sim.get(reg::IMASK3), 0);
    }

    static BUS_OFF_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn on_bus_off(can: &mut Can<&Sim>, event: Event) {
        assert_eq!(event, Event::Interrupt(Interrupt::BusOff));
        assert!(!can.interrupt_flagged(Interrupt::BusOff));
        BUS_OFF_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn flagged_source_calls_callback() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        can.install_callback(Interrupt::BusOff, on_bus_off);
        can.set_interrupt(Interrupt::BusOff, true);

        can.handle(IrqLine::BusOff);
        assert_eq!(BUS_OFF_CALLS.load(Ordering::SeqCst), 0);

        sim.raise(reg::ESR1, 1 << 2);
        can.handle(IrqLine::BusOff);
        assert_eq!(BUS_OFF_CALLS.load(Ordering::SeqCst), 1);
        assert!(can.interrupt_enabled(Interrupt::BusOff));
    }

    #[test]
    fn masked_source_is_not_dispatched() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        sim.raise(reg::ESR1, 1 << 17);
        can.handle(IrqLine::TxWarning);
        assert!(can.interrupt_flagged(Interrupt::TxWarning));
    }

    #[test]
    fn source_without_callback_masks_itself() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        can.set_interrupt(Interrupt::RxWarning, true);
        can.set_interrupt(Interrupt::CanMemoryError, true);
        sim.raise(reg::ESR1, 1 << 16);
        sim.raise(reg::ERRSR, 1 << 18);
        can.handle(IrqLine::RxWarning);
        can.handle(IrqLine::Ecc);
        assert!(!can.interrupt_enabled(Interrupt::RxWarning));
        assert!(!can.interrupt_flagged(Interrupt::RxWarning));
        assert!(!can.interrupt_enabled(Interrupt::CanMemoryError));
        assert_eq!(sim.get(reg::ERRSR), 0);
    }

    static ESR1_SEEN: AtomicU32 = AtomicU32::new(0);

    fn on_error(can: &mut Can<&Sim>, _: Event) {
        ESR1_SEEN.store(can.esr1_buffer(), Ordering::SeqCst);
        assert!(can.status_from_esr1_buffer(crate::bus::Status::AckError));
    }

    #[test]
    fn error_callback_reads_esr1_snapshot() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        can.install_callback(Interrupt::Error, on_error);
        can.set_interrupt(Interrupt::Error, true);
        sim.raise(reg::ESR1, (1 << 13) | (1 << 1));
        can.handle(IrqLine::Error);
        assert_eq!(ESR1_SEEN.load(Ordering::SeqCst), (1 << 13) | (1 << 1));
        assert_eq!(can.esr1_buffer(), 0);
        // ESR1 was read once: the acknowledge error went into the snapshot
        // and the flag was cleared afterwards
        assert_eq!(sim.get(reg::ESR1), 0);
    }

    #[test]
    fn masked_error_source_does_not_touch_esr1() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        can.install_callback(Interrupt::Error, on_error);
        sim.raise(reg::ESR1, (1 << 13) | (1 << 1));
        can.handle(IrqLine::Error);
        assert_eq!(sim.get(reg::ESR1), (1 << 13) | (1 << 1));
        assert_eq!(can.esr1_buffer(), 0);
    }

    static MAILBOXES_SEEN: AtomicU32 = AtomicU32::new(0);

    fn on_mailbox(can: &mut Can<&Sim>, event: Event) {
        if let Event::Mailbox(mb) = event {
            assert_eq!(can.mailbox_flag(mb), Ok(false));
            MAILBOXES_SEEN.fetch_or(1 << mb, Ordering::SeqCst);
        }
    }

    #[test]
    fn mailbox_lines_dispatch_their_group() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(32));
        can.install_callback(Interrupt::MailboxGroup0, on_mailbox);
        can.install_callback(Interrupt::MailboxGroup1, on_mailbox);
        for mb in [3, 9, 20] {
            can.set_mailbox_interrupt(mb, true).unwrap();
        }
        sim.raise(reg::IFLAG1, (1 << 3) | (1 << 9) | (1 << 20) | (1 << 4));

        can.handle(IrqLine::Mailboxes0);
        assert_eq!(MAILBOXES_SEEN.load(Ordering::SeqCst), (1 << 3) | (1 << 9));
        // Mailbox 4 is flagged but masked
        assert_eq!(sim.get(reg::IFLAG1), (1 << 20) | (1 << 4));

        can.handle(IrqLine::Mailboxes1);
        assert_eq!(
            MAILBOXES_SEEN.load(Ordering::SeqCst),
            (1 << 3) | (1 << 9) | (1 << 20)
        );
        assert_eq!(sim.get(reg::IFLAG1), 1 << 4);
    }

    #[test]
    fn mailbox_without_callback_masks_itself() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can0, &config(64));
        can.set_mailbox_interrupt(40, true).unwrap();
        can.set_mailbox_interrupt(41, true).unwrap();
        sim.raise(reg::IFLAG2, 1 << 8);
        can.handle(IrqLine::Mailboxes1);
        assert_eq!(sim.get(reg::IMASK2), 1 << 9);
        assert_eq!(sim.get(reg::IFLAG2), 0);
    }

    static FIFO_FRAMES: AtomicUsize = AtomicUsize::new(0);

    fn on_fifo(can: &mut Can<&Sim>, event: Event) {
        assert_eq!(event, Event::Interrupt(Interrupt::RxFifoFrameAvailable));
        if can.fifo_receive().is_ok() {
            FIFO_FRAMES.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fifo_frame_callback_pops_the_fifo() {
        let sim = Sim::new();
        let config = CanConfig {
            rx_fifo: Some(RxFifoConfig {
                filters: RxFifoFilters::MIN,
            }),
            ..config(16)
        };
        let mut can = running(&sim, InstanceId::Can2, &config);
        can.install_callback(Interrupt::RxFifoFrameAvailable, on_fifo);
        can.set_interrupt(Interrupt::RxFifoFrameAvailable, true);
        can.set_interrupt(Interrupt::MailboxGroup0, true);
        // Group 0 leaves out the FIFO window and filter table
        assert_eq!(sim.get(reg::IMASK1), 0xff00 | rx_fifo::FRAME_AVAILABLE);

        sim.raise(reg::IFLAG1, rx_fifo::FRAME_AVAILABLE);
        can.handle(IrqLine::Mailboxes0);
        assert_eq!(FIFO_FRAMES.load(Ordering::SeqCst), 1);
        assert_eq!(sim.get(reg::IFLAG1), 0);
    }
}
