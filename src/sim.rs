//! Register block simulator backing the unit tests
//!
//! Models the parts of the controller the driver waits on: the low-power and
//! freeze acknowledge bits, soft reset, the write-1-to-clear flag registers
//! and the ESR1 error bits that clear on read. Everything else behaves like plain memory.

use crate::reg::{self, RegisterAccess};
use core::cell::Cell;

const WORDS: usize = 0x1000 / 4;

const MDIS: u32 = 1 << 31;
const FRZ: u32 = 1 << 30;
const HALT: u32 = 1 << 28;
const NOTRDY: u32 = 1 << 27;
const SOFTRST: u32 = 1 << 25;
const FRZACK: u32 = 1 << 24;
const LPMACK: u32 = 1 << 20;
const MCR_RO: u32 = NOTRDY | FRZACK | LPMACK;

/// ESR1 bits that are write 1 to clear
const ESR1_W1C: u32 = 0x003B_0007;
/// ESR1 error bits, cleared when the register is read
const ESR1_ERRORS: u32 = 0xFC00_FC00;
/// ERRSR bits that are write 1 to clear
const ERRSR_W1C: u32 = 0x000D_000D;

pub struct Sim {
    words: [Cell<u32>; WORDS],
    freeze_stuck: Cell<bool>,
}

impl Sim {
    /// A controller straight out of reset: disabled, freeze requested
    pub fn new() -> Self {
        let sim = Self {
            words: core::array::from_fn(|_| Cell::new(0)),
            freeze_stuck: Cell::new(false),
        };
        sim.reset_block(MDIS);
        sim
    }

    /// Raw word at `offset`, bypassing the register side effects
    pub fn get(&self, offset: usize) -> u32 {
        self.words[offset / 4].get()
    }

    /// Stores `value` at `offset`, bypassing the register side effects. Used
    /// to play the hardware side.
    pub fn set(&self, offset: usize, value: u32) {
        self.words[offset / 4].set(value)
    }

    /// Sets `bits` in the word at `offset` the way the hardware raises flags
    pub fn raise(&self, offset: usize, bits: u32) {
        self.set(offset, self.get(offset) | bits)
    }

    /// Freeze requests are never acknowledged while stuck
    pub fn stick_freeze(&self, stuck: bool) {
        self.freeze_stuck.set(stuck);
        self.set(reg::MCR, self.settle(self.get(reg::MCR)));
    }

    /// Marks the mailbox at `offset` as transmitted and raises its flag
    pub fn complete_tx(&self, mailbox_offset: usize, mb: usize) {
        let cs = self.get(mailbox_offset);
        self.set(mailbox_offset, (cs & !(0xf << 24)) | (0x8 << 24));
        self.raise(iflag_offset(mb / 32), 1 << (mb % 32));
    }

    fn settle(&self, mcr: u32) -> u32 {
        let mut mcr = mcr & !MCR_RO;
        if mcr & MDIS != 0 {
            mcr |= LPMACK;
        }
        if mcr & FRZ != 0 && mcr & HALT != 0 && mcr & MDIS == 0 && !self.freeze_stuck.get() {
            mcr |= FRZACK;
        }
        if mcr & (LPMACK | FRZACK) != 0 {
            mcr |= NOTRDY;
        }
        mcr
    }

    fn reset_block(&self, old_mcr: u32) {
        self.set(reg::MCR, self.settle((old_mcr & MDIS) | FRZ | HALT | 0xf));
        self.set(reg::CTRL1, 0);
        self.set(reg::CTRL2, 0x00B0_0000);
        self.set(reg::ESR1, 0);
        for bank in 0..4 {
            self.set(imask_offset(bank), 0);
            self.set(iflag_offset(bank), 0);
        }
        self.set(reg::FDCTRL, 0x8000_0100);
        self.set(reg::MECR, 0x800C_0080);
    }
}

fn imask_offset(bank: usize) -> usize {
    [reg::IMASK1, reg::IMASK2, reg::IMASK3, reg::IMASK4][bank]
}

fn iflag_offset(bank: usize) -> usize {
    [reg::IFLAG1, reg::IFLAG2, reg::IFLAG3, reg::IFLAG4][bank]
}

impl RegisterAccess for Sim {
    fn read(&self, offset: usize) -> u32 {
        let value = self.get(offset);
        if offset == reg::ESR1 {
            self.set(offset, value & !ESR1_ERRORS);
        }
        value
    }

    fn write(&self, offset: usize, value: u32) {
        match offset {
            reg::MCR => {
                if value & SOFTRST != 0 {
                    self.reset_block(self.get(reg::MCR));
                } else {
                    let ro = self.get(reg::MCR) & MCR_RO;
                    self.set(reg::MCR, self.settle((value & !MCR_RO) | ro));
                }
            }
            reg::ESR1 => self.set(offset, self.get(offset) & !(value & ESR1_W1C)),
            reg::ERRSR => self.set(offset, self.get(offset) & !(value & ERRSR_W1C)),
            reg::IFLAG1 | reg::IFLAG2 | reg::IFLAG3 | reg::IFLAG4 => {
                self.set(offset, self.get(offset) & !value)
            }
            _ => self.set(offset, value),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn freeze_is_acknowledged_only_when_enabled() {
        let sim = Sim::new();
        assert_ne!(sim.read(reg::MCR) & LPMACK, 0);
        assert_eq!(sim.read(reg::MCR) & FRZACK, 0);
        sim.write(reg::MCR, sim.read(reg::MCR) & !MDIS);
        assert_eq!(sim.read(reg::MCR) & LPMACK, 0);
        assert_ne!(sim.read(reg::MCR) & FRZACK, 0);
        sim.stick_freeze(true);
        assert_eq!(sim.read(reg::MCR) & FRZACK, 0);
    }

    #[test]
    fn flags_clear_on_write_one() {
        let sim = Sim::new();
        sim.raise(reg::IFLAG1, 0b1010);
        sim.write(reg::IFLAG1, 0b0010);
        assert_eq!(sim.read(reg::IFLAG1), 0b1000);
        sim.raise(reg::ESR1, 0x0000_0106);
        sim.write(reg::ESR1, 0xffff_ffff);
        assert_eq!(sim.read(reg::ESR1), 0x0000_0100);
    }

    #[test]
    fn esr1_errors_clear_on_read() {
        let sim = Sim::new();
        sim.raise(reg::ESR1, (1 << 26) | (1 << 13) | (1 << 4) | (1 << 1));
        assert_eq!(sim.read(reg::ESR1), (1 << 26) | (1 << 13) | (1 << 4) | (1 << 1));
        assert_eq!(sim.read(reg::ESR1), (1 << 4) | (1 << 1));
    }
}
