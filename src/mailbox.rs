//! Mailboxes
//!
//! Mailboxes are laid out back to back in 512-byte RAM regions. In classic
//! mode every mailbox carries 8 bytes; in FD mode the payload size is chosen
//! per region, which changes how many mailboxes a region holds.

use crate::bus::{Can, Error};
use crate::config::PayloadSize;
use crate::message::{Message, MbCode};
use crate::reg::mb::{MbCs, MbId, CS, DATA, ID};
use crate::reg::{self, RegisterAccess};
use embedded_can::Id;

/// How a transmission ended after [`Can::abort_tx`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AbortOutcome {
    /// The frame was not sent
    Aborted,
    /// The frame was already on the bus and got transmitted
    Transmitted,
}

impl<A: RegisterAccess> Can<A> {
    /// Checks that `mb` is a mailbox the application may use: below the
    /// configured mailbox count and outside the range reserved by an enabled
    /// Rx FIFO.
    pub fn check_mb_id(&self, mb: usize) -> Result<(), Error> {
        if mb >= self.mailbox_count() {
            return Err(Error::InvalidMailbox(mb));
        }
        if self.rx_fifo_enabled() && mb < self.rx_fifo_filters().reserved_mailboxes() {
            return Err(Error::InvalidMailbox(mb));
        }
        Ok(())
    }

    /// RAM offset and payload size of mailbox `mb`, without validating `mb`
    /// against the configuration
    fn mb_location(&self, mb: usize) -> Option<(usize, PayloadSize)> {
        if !self.fd_enabled() {
            let size = PayloadSize::Bytes8;
            return (mb < self.id().mailbox_count())
                .then(|| (reg::RAM + mb * size.mailbox_size(), size));
        }
        let fdctrl = self.regs.fdctrl().read();
        let mut first = 0;
        for region in 0..self.id().region_count() {
            let size = PayloadSize::from_mbdsr(fdctrl.mbdsr(region));
            let count = size.mailboxes_per_region();
            if mb < first + count {
                let offset = reg::RAM + region * reg::REGION_SIZE + (mb - first) * size.mailbox_size();
                return Some((offset, size));
            }
            first += count;
        }
        None
    }

    /// Offset of mailbox `mb` in the register block
    pub(crate) fn mb_offset(&self, mb: usize) -> Result<usize, Error> {
        self.check_mb_id(mb)?;
        self.mb_location(mb)
            .map(|(offset, _)| offset)
            .ok_or(Error::InvalidMailbox(mb))
    }

    /// Payload capacity of mailbox `mb`
    pub fn payload_size(&self, mb: usize) -> Result<PayloadSize, Error> {
        self.check_mb_id(mb)?;
        self.mb_location(mb)
            .map(|(_, size)| size)
            .ok_or(Error::InvalidMailbox(mb))
    }

    fn read_cs(&self, offset: usize) -> MbCs {
        MbCs::from(self.regs.word(offset + CS).read())
    }

    fn write_cs(&self, offset: usize, cs: MbCs) {
        self.regs.word(offset + CS).write(cs.into());
    }

    /// Writes header and payload of `message` into the mailbox at `offset`
    /// and activates it with `code`
    fn write_mb(&self, offset: usize, message: &Message, code: MbCode) {
        let mut inactive = MbCs::default();
        inactive.set_code(MbCode::TxInactive.bits());
        self.write_cs(offset, inactive);

        self.regs.word(offset + ID).write(message.id.into());
        let len = if message.is_remote_frame() { 0 } else { message.len() };
        for (i, chunk) in message.data[..len].chunks(4).enumerate() {
            let mut word = [0; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.regs
                .word(offset + DATA + 4 * i)
                .write(u32::from_be_bytes(word));
        }

        let mut cs = message.cs;
        cs.set_code(code.bits());
        self.write_cs(offset, cs);
    }

    /// Sets up mailbox `mb` for transmission. The mailbox stays inactive
    /// until [`Self::send`].
    pub fn config_tx_mb(&mut self, mb: usize) -> Result<(), Error> {
        let offset = self.mb_offset(mb)?;
        let mut cs = MbCs::default();
        cs.set_code(MbCode::TxInactive.bits());
        self.write_cs(offset, cs);
        self.regs.word(offset + ID).write(0);
        self.clear_mailbox_flag(mb)
    }

    /// Sets up mailbox `mb` to receive frames with identifier `id`, subject
    /// to the active mask
    pub fn config_rx_mb(&mut self, mb: usize, id: Id) -> Result<(), Error> {
        let offset = self.mb_offset(mb)?;
        let mut cs = MbCs::default();
        cs.set_code(MbCode::RxInactive.bits());
        self.write_cs(offset, cs);

        let mut id_word = MbId::default();
        match id {
            Id::Standard(id) => id_word.set_std(id.as_raw()),
            Id::Extended(id) => {
                id_word.set_ext(id.as_raw());
                cs.set_ide(true);
            }
        }
        self.regs.word(offset + ID).write(id_word.into());
        self.clear_mailbox_flag(mb)?;

        cs.set_code(MbCode::RxEmpty.bits());
        self.write_cs(offset, cs);
        Ok(())
    }

    /// Sets up mailbox `mb` to answer remote requests matching the
    /// identifier of `message` with `message`. Takes effect only when the
    /// controller was initialized with automatic remote response.
    pub fn config_remote_response_mb(&mut self, mb: usize, message: &Message) -> Result<(), Error> {
        let offset = self.mb_offset(mb)?;
        if message.is_remote_frame() || message.fd_format() {
            return Err(Error::InvalidParameter);
        }
        self.clear_mailbox_flag(mb)?;
        self.write_mb(offset, message, MbCode::TxTanswer);
        Ok(())
    }

    /// Queues `message` for transmission in mailbox `mb`.
    ///
    /// Returns [`nb::Error::WouldBlock`] while the mailbox still holds a
    /// pending operation, which is anything other than an inactive or
    /// aborted mailbox.
    pub fn send(&mut self, mb: usize, message: &Message) -> nb::Result<(), Error> {
        self.check_mb_id(mb)?;
        let (offset, size) = self.mb_location(mb).ok_or(Error::InvalidMailbox(mb))?;
        if message.fd_format() && !self.fd_enabled() {
            return Err(Error::InvalidParameter.into());
        }
        if !message.is_remote_frame() && message.len() > size.bytes() {
            return Err(Error::TooMuchData.into());
        }
        let code = MbCode::from_bits(self.read_cs(offset).code());
        if !code.is_idle() {
            return Err(nb::Error::WouldBlock);
        }
        self.clear_mailbox_flag(mb)?;
        self.write_mb(offset, message, MbCode::TxData);
        Ok(())
    }

    /// Takes the frame out of receive mailbox `mb` and arms the mailbox for
    /// the next one.
    ///
    /// Returns [`nb::Error::WouldBlock`] while the mailbox is empty or being
    /// updated by the controller.
    pub fn mb_receive(&mut self, mb: usize) -> nb::Result<Message, Error> {
        self.check_mb_id(mb)?;
        let (offset, size) = self.mb_location(mb).ok_or(Error::InvalidMailbox(mb))?;
        // Reading the control/status word locks the mailbox until the timer
        // is read
        let mut cs = self.read_cs(offset);
        let code = MbCode::from_bits(cs.code());
        if !matches!(code, MbCode::RxFull | MbCode::RxOverrun) {
            self.timer();
            return Err(nb::Error::WouldBlock);
        }

        let id = MbId::from(self.regs.word(offset + ID).read());
        let mut message = Message {
            cs,
            id,
            data: [0; 64],
        };
        let len = message.len().min(size.bytes());
        for (i, chunk) in message.data[..len].chunks_mut(4).enumerate() {
            let word = self.regs.word(offset + DATA + 4 * i).read().to_be_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }

        cs.set_code(MbCode::RxEmpty.bits());
        self.write_cs(offset, cs);
        self.clear_mailbox_flag(mb)?;
        self.timer();
        Ok(message)
    }

    /// Deactivates mailbox `mb`, dropping a pending transmission or stopping
    /// reception
    pub fn inactivate_mb(&mut self, mb: usize) -> Result<(), Error> {
        let offset = self.mb_offset(mb)?;
        let mut cs = self.read_cs(offset);
        let inactive = if cs.code() & 0x8 != 0 {
            MbCode::TxInactive
        } else {
            MbCode::RxInactive
        };
        cs.set_code(inactive.bits());
        self.write_cs(offset, cs);
        self.timer();
        self.clear_mailbox_flag(mb)
    }

    /// Aborts the transmission pending in mailbox `mb`.
    ///
    /// The first call requests the abort. The controller reports completion
    /// through the mailbox flag, so this needs to be polled with the mailbox
    /// interrupt disabled.
    pub fn abort_tx(&mut self, mb: usize) -> nb::Result<AbortOutcome, Error> {
        let offset = self.mb_offset(mb)?;
        let code = MbCode::from_bits(self.read_cs(offset).code());
        if self.mailbox_flag(mb)? {
            self.clear_mailbox_flag(mb)?;
            return match code {
                MbCode::TxAbort => Ok(AbortOutcome::Aborted),
                _ => Ok(AbortOutcome::Transmitted),
            };
        }
        match code {
            MbCode::TxData => {
                let mut cs = self.read_cs(offset);
                cs.set_code(MbCode::TxAbort.bits());
                self.write_cs(offset, cs);
                Err(nb::Error::WouldBlock)
            }
            MbCode::TxAbort => Err(nb::Error::WouldBlock),
            MbCode::TxInactive => Ok(AbortOutcome::Transmitted),
            _ => Err(Error::InvalidParameter.into()),
        }
    }

    /// State of mailbox `mb`
    pub fn mb_code(&self, mb: usize) -> Result<MbCode, Error> {
        let offset = self.mb_offset(mb)?;
        let code = MbCode::from_bits(self.read_cs(offset).code());
        self.timer();
        Ok(code)
    }

    /// Enables or disables the interrupt of mailbox `mb`
    pub fn set_mailbox_interrupt(&mut self, mb: usize, enable: bool) -> Result<(), Error> {
        self.check_mb_id(mb)?;
        let bit = 1 << (mb % 32);
        self.regs.imask(mb / 32).modify(|r| {
            if enable {
                *r |= bit
            } else {
                *r &= !bit
            }
        });
        Ok(())
    }

    /// `true` if the interrupt of mailbox `mb` is enabled
    pub fn mailbox_interrupt_enabled(&self, mb: usize) -> Result<bool, Error> {
        self.check_mb_id(mb)?;
        Ok(self.regs.imask(mb / 32).read() & (1 << (mb % 32)) != 0)
    }

    /// `true` if mailbox `mb` completed a transmission or reception
    pub fn mailbox_flag(&self, mb: usize) -> Result<bool, Error> {
        self.check_mb_id(mb)?;
        Ok(self.regs.iflag(mb / 32).read() & (1 << (mb % 32)) != 0)
    }

    /// Clears the flag of mailbox `mb`
    pub fn clear_mailbox_flag(&mut self, mb: usize) -> Result<(), Error> {
        self.check_mb_id(mb)?;
        self.regs.iflag(mb / 32).write(1 << (mb % 32));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::test::{config, running};
    use crate::config::{CanConfig, FdConfig, RxFifoConfig, RxFifoFilters};
    use crate::instance::InstanceId;
    use crate::message::tx::{FrameType, MessageBuilder};
    use crate::sim::Sim;
    use embedded_can::{ExtendedId, Frame, StandardId};

    fn std_id(raw: u16) -> Id {
        StandardId::new(raw).unwrap().into()
    }

    #[test]
    fn send_is_busy_until_mailbox_completes() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        let frame = Message::new(std_id(0x123), &[1, 2, 3, 4, 5]).unwrap();
        can.config_tx_mb(5).unwrap();
        assert_eq!(can.send(5, &frame), Ok(()));
        assert_eq!(can.mb_code(5), Ok(MbCode::TxData));
        assert_eq!(can.send(5, &frame), Err(nb::Error::WouldBlock));

        sim.complete_tx(can.mb_offset(5).unwrap(), 5);
        assert_eq!(can.mb_code(5), Ok(MbCode::TxInactive));
        assert_eq!(can.send(5, &frame), Ok(()));
        assert!(!can.mailbox_flag(5).unwrap());
    }

    #[test]
    fn send_writes_mailbox_layout() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        let frame = Message::new(std_id(0x123), &[1, 2, 3, 4, 5]).unwrap();
        can.config_tx_mb(2).unwrap();
        can.send(2, &frame).unwrap();
        let offset = reg::RAM + 2 * 16;
        assert_eq!(offset, can.mb_offset(2).unwrap());
        let cs = MbCs::from(sim.get(offset));
        assert_eq!(cs.code(), 0xC);
        assert_eq!(cs.dlc(), 5);
        assert!(!cs.ide());
        assert_eq!(sim.get(offset + ID), 0x123 << 18);
        assert_eq!(sim.get(offset + DATA), 0x0102_0304);
        assert_eq!(sim.get(offset + DATA + 4), 0x0500_0000);

        let extended = Message::new(ExtendedId::new(0x1abc_def0).unwrap(), &[]).unwrap();
        can.config_tx_mb(3).unwrap();
        can.send(3, &extended).unwrap();
        let cs = MbCs::from(sim.get(offset + 16));
        assert!(cs.ide() && cs.srr());
        assert_eq!(sim.get(offset + 16 + ID), 0x1abc_def0);
    }

    #[test]
    fn mailbox_ids_are_validated() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        assert_eq!(can.check_mb_id(15), Ok(()));
        assert_eq!(can.check_mb_id(16), Err(Error::InvalidMailbox(16)));
        let frame = Message::new(std_id(1), &[]).unwrap();
        assert_eq!(
            can.send(16, &frame),
            Err(nb::Error::Other(Error::InvalidMailbox(16)))
        );

        let fifo = CanConfig {
            rx_fifo: Some(RxFifoConfig {
                filters: RxFifoFilters::new(16).unwrap(),
            }),
            ..config(32)
        };
        let mut can = running(&sim, InstanceId::Can2, &fifo);
        for mb in 0..10 {
            assert_eq!(can.check_mb_id(mb), Err(Error::InvalidMailbox(mb)));
        }
        assert_eq!(can.check_mb_id(10), Ok(()));
        assert_eq!(can.config_tx_mb(9), Err(Error::InvalidMailbox(9)));
        assert_eq!(can.config_rx_mb(4, std_id(1)), Err(Error::InvalidMailbox(4)));
    }

    #[test]
    fn fd_regions_change_mailbox_layout() {
        let sim = Sim::new();
        let mut fd = FdConfig::new(crate::bus::test::TIMING);
        fd.payload_sizes[0] = PayloadSize::Bytes32;
        let config = CanConfig {
            mailbox_count: 19,
            fd: Some(fd),
            ..config(0)
        };
        let mut can = running(&sim, InstanceId::Can7, &config);
        assert_eq!(can.mb_offset(11), Ok(reg::RAM + 11 * 40));
        assert_eq!(can.payload_size(11), Ok(PayloadSize::Bytes32));
        assert_eq!(can.mb_offset(12), Ok(reg::RAM + reg::REGION_SIZE));
        assert_eq!(can.mb_offset(13), Ok(reg::RAM + reg::REGION_SIZE + 72));
        assert_eq!(can.payload_size(18), Ok(PayloadSize::Bytes64));

        let big = MessageBuilder {
            id: std_id(0x10),
            frame_type: FrameType::FlexibleDatarate {
                payload: &[0x5a; 40],
                bit_rate_switching: true,
                force_error_state_indicator: false,
                padding: Some(0xff),
            },
        }
        .build()
        .unwrap();
        assert_eq!(
            can.send(3, &big),
            Err(nb::Error::Other(Error::TooMuchData))
        );
        can.send(12, &big).unwrap();
        let offset = reg::RAM + reg::REGION_SIZE;
        let cs = MbCs::from(sim.get(offset));
        assert!(cs.edl() && cs.brs());
        assert_eq!(cs.dlc(), 14);
        assert_eq!(sim.get(offset + DATA + 36), 0x5a5a_5a5a);
        assert_eq!(sim.get(offset + DATA + 40), 0xffff_ffff);
        assert_eq!(sim.get(offset + DATA + 44), 0xffff_ffff);
    }

    #[test]
    fn fd_frames_need_fd_mode() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        let fd = MessageBuilder {
            id: std_id(0x10),
            frame_type: FrameType::FlexibleDatarate {
                payload: &[0; 8],
                bit_rate_switching: false,
                force_error_state_indicator: false,
                padding: None,
            },
        }
        .build()
        .unwrap();
        assert_eq!(
            can.send(1, &fd),
            Err(nb::Error::Other(Error::InvalidParameter))
        );
    }

    #[test]
    fn receive_reads_full_mailbox_and_rearms() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        can.config_rx_mb(4, std_id(0x321)).unwrap();
        assert_eq!(can.mb_code(4), Ok(MbCode::RxEmpty));
        assert!(matches!(can.mb_receive(4), Err(nb::Error::WouldBlock)));

        let offset = can.mb_offset(4).unwrap();
        assert_eq!(sim.get(offset + ID), 0x321 << 18);
        let mut cs = MbCs::default();
        cs.set_code(MbCode::RxFull.bits());
        cs.set_dlc(6);
        sim.set(offset, cs.into());
        sim.set(offset + DATA, 0xdead_beef);
        sim.set(offset + DATA + 4, 0x1234_5678);
        sim.raise(reg::IFLAG1, 1 << 4);

        let message = can.mb_receive(4).unwrap();
        assert_eq!(message.id(), std_id(0x321));
        assert_eq!(message.data(), &[0xde, 0xad, 0xbe, 0xef, 0x12, 0x34]);
        assert_eq!(can.mb_code(4), Ok(MbCode::RxEmpty));
        assert!(!can.mailbox_flag(4).unwrap());
        assert!(matches!(can.mb_receive(4), Err(nb::Error::WouldBlock)));
    }

    #[test]
    fn extended_receive_mailbox_sets_ide() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        let id = ExtendedId::new(0x0765_4321).unwrap();
        can.config_rx_mb(7, id.into()).unwrap();
        let offset = can.mb_offset(7).unwrap();
        assert!(MbCs::from(sim.get(offset)).ide());
        assert_eq!(sim.get(offset + ID), 0x0765_4321);
    }

    #[test]
    fn abort_reports_outcome() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        let frame = Message::new(std_id(0x55), &[9]).unwrap();
        can.send(6, &frame).unwrap();
        assert_eq!(can.abort_tx(6), Err(nb::Error::WouldBlock));
        assert_eq!(can.mb_code(6), Ok(MbCode::TxAbort));
        assert_eq!(can.abort_tx(6), Err(nb::Error::WouldBlock));
        sim.raise(reg::IFLAG1, 1 << 6);
        assert_eq!(can.abort_tx(6), Ok(AbortOutcome::Aborted));
        // An aborted mailbox may be reused right away
        assert_eq!(can.send(6, &frame), Ok(()));

        sim.complete_tx(can.mb_offset(6).unwrap(), 6);
        assert_eq!(can.abort_tx(6), Ok(AbortOutcome::Transmitted));
    }

    #[test]
    fn inactivate_keeps_direction() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        can.send(1, &Message::new(std_id(1), &[]).unwrap()).unwrap();
        can.config_rx_mb(2, std_id(2)).unwrap();
        can.inactivate_mb(1).unwrap();
        can.inactivate_mb(2).unwrap();
        assert_eq!(can.mb_code(1), Ok(MbCode::TxInactive));
        assert_eq!(can.mb_code(2), Ok(MbCode::RxInactive));
    }

    #[test]
    fn remote_response_mailbox() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can2, &config(16));
        let answer = Message::new(std_id(0x77), &[1, 2]).unwrap();
        can.config_remote_response_mb(8, &answer).unwrap();
        assert_eq!(can.mb_code(8), Ok(MbCode::TxTanswer));
        let request = Message::new_remote(std_id(0x77), 2).unwrap();
        assert_eq!(
            can.config_remote_response_mb(8, &request),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn mailbox_interrupt_mask() {
        let sim = Sim::new();
        let mut can = running(&sim, InstanceId::Can0, &config(100));
        can.set_mailbox_interrupt(70, true).unwrap();
        assert_eq!(sim.get(reg::IMASK3), 1 << 6);
        assert!(can.mailbox_interrupt_enabled(70).unwrap());
        can.set_mailbox_interrupt(70, false).unwrap();
        assert_eq!(sim.get(reg::IMASK3), 0);
    }
}
