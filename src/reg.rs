//! Register map of the CAN controller
//!
//! The register block is reached through a [`RegisterAccess`] backend that
//! reads and writes 32-bit words at byte offsets from the instance base.
//! [`Mmio`] is the backend for real silicon. Register values are bitfield
//! types, one module per register, convertible from and to `u32`.

/// Implements the `u32` conversions for a bitfield register value. Expanded
/// in the module that declares the type.
macro_rules! register_value {
    ($name:ident) => {
        impl From<u32> for $name {
            #[inline(always)]
            fn from(bits: u32) -> Self {
                Self(bits)
            }
        }

        impl From<$name> for u32 {
            #[inline(always)]
            fn from(value: $name) -> u32 {
                value.0
            }
        }
    };
}
pub(crate) use register_value;

pub mod cbt;
pub mod ctrl1;
pub mod ctrl2;
pub mod ecr;
pub mod errsr;
pub mod esr1;
pub mod esr2;
pub mod fdcbt;
pub mod fdctrl;
pub mod mb;
pub mod mcr;
pub mod mecr;

use crate::instance::InstanceId;
use core::marker::PhantomData;
use vcell::VolatileCell;

/// Module Configuration Register
pub const MCR: usize = 0x00;
/// Control 1 Register
pub const CTRL1: usize = 0x04;
/// Free Running Timer
pub const TIMER: usize = 0x08;
/// Rx Mailboxes Global Mask Register
pub const RXMGMASK: usize = 0x10;
/// Rx Buffer 14 Mask Register
pub const RX14MASK: usize = 0x14;
/// Rx Buffer 15 Mask Register
pub const RX15MASK: usize = 0x18;
/// Error Counter
pub const ECR: usize = 0x1C;
/// Error and Status 1 Register
pub const ESR1: usize = 0x20;
/// Interrupt Masks 2 Register (mailboxes 32..=63)
pub const IMASK2: usize = 0x24;
/// Interrupt Masks 1 Register (mailboxes 0..=31)
pub const IMASK1: usize = 0x28;
/// Interrupt Flags 2 Register (mailboxes 32..=63)
pub const IFLAG2: usize = 0x2C;
/// Interrupt Flags 1 Register (mailboxes 0..=31)
pub const IFLAG1: usize = 0x30;
/// Control 2 Register
pub const CTRL2: usize = 0x34;
/// Error and Status 2 Register
pub const ESR2: usize = 0x38;
/// CRC Register
pub const CRCR: usize = 0x44;
/// Legacy Rx FIFO Global Mask Register
pub const RXFGMASK: usize = 0x48;
/// Legacy Rx FIFO Information Register
pub const RXFIR: usize = 0x4C;
/// CAN Bit Timing Register
pub const CBT: usize = 0x50;
/// Interrupt Masks 4 Register (mailboxes 96..=127)
pub const IMASK4: usize = 0x68;
/// Interrupt Masks 3 Register (mailboxes 64..=95)
pub const IMASK3: usize = 0x6C;
/// Interrupt Flags 4 Register (mailboxes 96..=127)
pub const IFLAG4: usize = 0x70;
/// Interrupt Flags 3 Register (mailboxes 64..=95)
pub const IFLAG3: usize = 0x74;
/// Start of the mailbox RAM
pub const RAM: usize = 0x80;
/// Start of the Rx Individual Mask Registers
pub const RXIMR: usize = 0x880;
/// Scratch area used by the Rx FIFO and serial message buffers
pub const SCRATCH: usize = 0xA80;
/// Memory Error Control Register
pub const MECR: usize = 0xAE0;
/// Error Report Address Register
pub const RERRAR: usize = 0xAF0;
/// Error Report Data Register
pub const RERRDR: usize = 0xAF4;
/// Error Report Syndrome Register
pub const RERRSYNR: usize = 0xAF8;
/// Error Status Register
pub const ERRSR: usize = 0xAFC;
/// CAN FD Control Register
pub const FDCTRL: usize = 0xC00;
/// CAN FD Bit Timing Register
pub const FDCBT: usize = 0xC04;
/// CAN FD CRC Register
pub const FDCRC: usize = 0xC08;

/// Size of one mailbox RAM region in bytes
pub const REGION_SIZE: usize = 0x200;
/// Size of the scratch area in bytes
pub const SCRATCH_SIZE: usize = MECR - SCRATCH;

const IMASK: [usize; 4] = [IMASK1, IMASK2, IMASK3, IMASK4];
const IFLAG: [usize; 4] = [IFLAG1, IFLAG2, IFLAG3, IFLAG4];

/// Word-level access to a CAN register block.
///
/// `offset` is the byte offset from the start of the block and is always a
/// multiple of 4.
pub trait RegisterAccess {
    /// Reads the word at `offset`
    fn read(&self, offset: usize) -> u32;
    /// Writes `value` to the word at `offset`
    fn write(&self, offset: usize, value: u32);
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &T {
    fn read(&self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Memory mapped register block of a CAN instance
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Wraps the register block starting at `base`.
    ///
    /// # Safety
    /// `base` must be the start of a CAN register block, and nothing else may
    /// access that block while the returned value exists.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Wraps the register block of `id`.
    ///
    /// # Safety
    /// Nothing else may access the register block of `id` while the returned
    /// value exists.
    pub unsafe fn instance(id: InstanceId) -> Self {
        Self::new(id.base_address())
    }

    fn cell(&self, offset: usize) -> &VolatileCell<u32> {
        // Safety: The constructor requires `base` to start a mapped register
        // block owned by `self`. All offsets used are word aligned.
        unsafe { &*((self.base + offset) as *const VolatileCell<u32>) }
    }
}

impl RegisterAccess for Mmio {
    #[inline(always)]
    fn read(&self, offset: usize) -> u32 {
        self.cell(offset).get()
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u32) {
        self.cell(offset).set(value)
    }
}

/// Typed handle to one register.
pub struct Reg<'a, A: ?Sized, T> {
    access: &'a A,
    offset: usize,
    _value: PhantomData<T>,
}

impl<'a, A: RegisterAccess + ?Sized, T: From<u32> + Into<u32>> Reg<'a, A, T> {
    /// Handle to the register at `offset`
    pub fn new(access: &'a A, offset: usize) -> Self {
        Self {
            access,
            offset,
            _value: PhantomData,
        }
    }

    /// Reads the register
    #[inline(always)]
    pub fn read(&self) -> T {
        T::from(self.access.read(self.offset))
    }

    /// Writes the register
    #[inline(always)]
    pub fn write(&self, value: T) {
        self.access.write(self.offset, value.into())
    }

    /// Read-modify-write. Must not be used on write-1-to-clear registers.
    #[inline(always)]
    pub fn modify<F: FnOnce(&mut T)>(&self, f: F) {
        let mut value = self.read();
        f(&mut value);
        self.write(value);
    }
}

/// Typed view over a [`RegisterAccess`] backend.
pub struct RegisterBlock<A> {
    access: A,
}

impl<A: RegisterAccess> RegisterBlock<A> {
    /// Wraps `access`
    pub fn new(access: A) -> Self {
        Self { access }
    }

    /// Unwraps the backend
    pub fn into_inner(self) -> A {
        self.access
    }

    /// The backend
    pub fn access(&self) -> &A {
        &self.access
    }

    /// Raw word at `offset`
    pub fn word(&self, offset: usize) -> Reg<'_, A, u32> {
        Reg::new(&self.access, offset)
    }

    /// Module Configuration Register
    pub fn mcr(&self) -> Reg<'_, A, mcr::Mcr> {
        Reg::new(&self.access, MCR)
    }

    /// Control 1 Register
    pub fn ctrl1(&self) -> Reg<'_, A, ctrl1::Ctrl1> {
        Reg::new(&self.access, CTRL1)
    }

    /// Control 2 Register
    pub fn ctrl2(&self) -> Reg<'_, A, ctrl2::Ctrl2> {
        Reg::new(&self.access, CTRL2)
    }

    /// Error Counter
    pub fn ecr(&self) -> Reg<'_, A, ecr::Ecr> {
        Reg::new(&self.access, ECR)
    }

    /// Error and Status 1 Register. Write 1 to clear the interrupt flags.
    pub fn esr1(&self) -> Reg<'_, A, esr1::Esr1> {
        Reg::new(&self.access, ESR1)
    }

    /// Error and Status 2 Register
    pub fn esr2(&self) -> Reg<'_, A, esr2::Esr2> {
        Reg::new(&self.access, ESR2)
    }

    /// CAN Bit Timing Register
    pub fn cbt(&self) -> Reg<'_, A, cbt::Cbt> {
        Reg::new(&self.access, CBT)
    }

    /// CAN FD Bit Timing Register
    pub fn fdcbt(&self) -> Reg<'_, A, fdcbt::Fdcbt> {
        Reg::new(&self.access, FDCBT)
    }

    /// CAN FD Control Register
    pub fn fdctrl(&self) -> Reg<'_, A, fdctrl::Fdctrl> {
        Reg::new(&self.access, FDCTRL)
    }

    /// Memory Error Control Register
    pub fn mecr(&self) -> Reg<'_, A, mecr::Mecr> {
        Reg::new(&self.access, MECR)
    }

    /// Error Status Register. Write 1 to clear.
    pub fn errsr(&self) -> Reg<'_, A, errsr::Errsr> {
        Reg::new(&self.access, ERRSR)
    }

    /// Interrupt mask bank `bank` (mailboxes `32 * bank ..`)
    pub fn imask(&self, bank: usize) -> Reg<'_, A, u32> {
        Reg::new(&self.access, IMASK[bank])
    }

    /// Interrupt flag bank `bank` (mailboxes `32 * bank ..`). Write 1 to
    /// clear.
    pub fn iflag(&self, bank: usize) -> Reg<'_, A, u32> {
        Reg::new(&self.access, IFLAG[bank])
    }

    /// Rx Individual Mask Register `index`
    pub fn rximr(&self, index: usize) -> Reg<'_, A, u32> {
        Reg::new(&self.access, RXIMR + 4 * index)
    }
}
