//! Legacy Rx FIFO
//!
//! When enabled, the FIFO occupies mailboxes 0 to 5 as its output window
//! and storage, followed by the ID filter table. Frames are read from the
//! output window and popped by clearing the frame available flag.

use crate::bus::{Can, Error};
use crate::config::RxFifoFilters;
use crate::filter::{FifoFilter, FilterFormat};
use crate::message::Message;
use crate::reg::mb::{MbCs, MbId, CS, DATA, ID};
use crate::reg::{self, RegisterAccess};

/// Start of the ID filter table, right after mailbox 5
const FILTER_TABLE: usize = reg::RAM + 0x60;
/// IFLAG1 bit signalling a frame in the FIFO output window
pub(crate) const FRAME_AVAILABLE: u32 = 1 << 5;
/// IFLAG1 bit signalling the FIFO is almost full
pub(crate) const WARNING: u32 = 1 << 6;
/// IFLAG1 bit signalling a frame was lost
pub(crate) const OVERFLOW: u32 = 1 << 7;

/// Frame read from the Rx FIFO
#[derive(Copy, Clone, Debug)]
pub struct FifoMessage {
    /// The frame
    pub message: Message,
    /// Index of the filter element that accepted the frame
    pub filter_hit: u16,
}

impl<A: RegisterAccess> Can<A> {
    /// Size of the filter table, from `CTRL2.RFFN`
    pub fn rx_fifo_filters(&self) -> RxFifoFilters {
        RxFifoFilters::from_rffn(self.regs.ctrl2().read().rffn())
    }

    /// Programs the filter table in `format`.
    ///
    /// Only allowed in freeze mode. `filters` is expected to fill the table,
    /// that is hold [`RxFifoFilters::elements`] times
    /// [`FilterFormat::elements_per_word`] elements; surplus elements are
    /// ignored and table words without an element are cleared.
    pub fn config_rx_fifo(&mut self, format: FilterFormat, filters: &[FifoFilter]) -> Result<(), Error> {
        if !self.is_frozen() {
            return Err(Error::NotFrozen);
        }
        if !self.rx_fifo_enabled() {
            return Err(Error::FifoDisabled);
        }
        self.regs.mcr().modify(|r| r.set_idam(format.idam()));

        let words = self.rx_fifo_filters().elements();
        let mut chunks = filters.chunks(format.elements_per_word().max(1));
        for i in 0..words {
            let word = match (format, chunks.next()) {
                (FilterFormat::D, _) | (_, None) => 0,
                (_, Some(chunk)) => format.encode(chunk),
            };
            self.regs.word(FILTER_TABLE + 4 * i).write(word);
        }
        Ok(())
    }

    /// Filter format in effect
    pub fn rx_fifo_filter_format(&self) -> FilterFormat {
        FilterFormat::from_idam(self.regs.mcr().read().idam())
    }

    /// Pops the oldest frame from the FIFO.
    ///
    /// Returns [`nb::Error::WouldBlock`] while the FIFO is empty.
    pub fn fifo_receive(&mut self) -> nb::Result<FifoMessage, Error> {
        if !self.rx_fifo_enabled() {
            return Err(Error::FifoDisabled.into());
        }
        if self.regs.iflag(0).read() & FRAME_AVAILABLE == 0 {
            return Err(nb::Error::WouldBlock);
        }

        let cs = MbCs::from(self.regs.word(reg::RAM + CS).read());
        let id = MbId::from(self.regs.word(reg::RAM + ID).read());
        let mut message = Message {
            cs,
            id,
            data: [0; 64],
        };
        let len = message.len().min(8);
        for (i, chunk) in message.data[..len].chunks_mut(4).enumerate() {
            let word = self.regs.word(reg::RAM + DATA + 4 * i).read().to_be_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        let filter_hit = (self.regs.word(reg::RXFIR).read() & 0x1ff) as u16;

        self.regs.iflag(0).write(FRAME_AVAILABLE);
        self.timer();
        Ok(FifoMessage {
            message,
            filter_hit,
        })
    }

    /// Mask applied to all filter elements when global masking is selected,
    /// in the layout of the filter table words. Does nothing while the FIFO
    /// is disabled.
    pub fn set_rx_fifo_global_mask(&mut self, mask: u32) -> Result<(), Error> {
        if !self.rx_fifo_enabled() {
            return Ok(());
        }
        self.with_freeze(|can| {
            can.regs.word(reg::RXFGMASK).write(mask);
            Ok(())
        })
    }

    /// Mask of filter element `index` when individual masking is selected,
    /// in the layout of the filter table words
    pub fn set_rx_fifo_individual_mask(&mut self, index: usize, mask: u32) -> Result<(), Error> {
        if index >= self.id().mailbox_count() {
            return Err(Error::InvalidParameter);
        }
        self.with_freeze(|can| {
            can.regs.rximr(index).write(mask);
            Ok(())
        })
    }
}
