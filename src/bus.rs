//! Per-instance CAN controller context

use crate::config::{
    mailbox_limit, BitTiming, BitTimingError, CanConfig, ClockSource, MaskType, Mode,
    PayloadSize, TimeoutPolicy, DATA_BIT_TIMING_RANGES, NOMINAL_BIT_TIMING_RANGES,
};
use crate::filter::FilterFormat;
use crate::instance::InstanceId;
use crate::interrupt::{Callback, Interrupt};
use crate::message::TooMuchData;
use crate::reg::{self, ecr::Ecr, esr1::Esr1, mcr::Mcr, mecr::Mecr, RegisterAccess, RegisterBlock};
use core::convert::Infallible;
use core::fmt::{self, Debug};
use embedded_can::Id;

/// Errors returned by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument or a combination of configuration values is not supported
    InvalidParameter,
    /// The mailbox index is beyond the configured mailbox count or inside the
    /// range reserved by the Rx FIFO
    InvalidMailbox(usize),
    /// More mailboxes were requested than the mailbox RAM holds
    TooManyMailboxes {
        /// Requested mailbox count
        requested: usize,
        /// Mailboxes available with the requested payload sizes
        limit: usize,
    },
    /// Problems with the bit timing configuration
    BitTiming(BitTimingError),
    /// Payload does not fit in the mailbox
    TooMuchData,
    /// The operation is only allowed in freeze mode
    NotFrozen,
    /// The operation needs the Rx FIFO, which is disabled
    FifoDisabled,
    /// The hardware did not acknowledge a request in time
    Timeout(Wait),
}

impl From<BitTimingError> for Error {
    fn from(value: BitTimingError) -> Self {
        Self::BitTiming(value)
    }
}

impl From<TooMuchData> for Error {
    fn from(_: TooMuchData) -> Self {
        Self::TooMuchData
    }
}

/// Hardware acknowledge a busy-wait loop was waiting for
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Wait {
    /// `MCR.FRZACK` to be set
    FreezeEnter,
    /// `MCR.FRZACK` to be cleared
    FreezeExit,
    /// `MCR.LPMACK` to be cleared
    Enable,
    /// `MCR.LPMACK` to be set
    Disable,
    /// `MCR.SOFTRST` to self-clear
    SoftReset,
}

/// Printable ESR1 register
pub struct ErrorStatus(pub Esr1);

impl From<Esr1> for ErrorStatus {
    fn from(value: Esr1) -> Self {
        Self(value)
    }
}

impl Debug for ErrorStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> fmt::Result {
        let esr1 = &self.0;

        f.debug_struct("ErrorStatus")
            .field("bit1err_fast", &esr1.bit1err_fast())
            .field("bit0err_fast", &esr1.bit0err_fast())
            .field("crcerr_fast", &esr1.crcerr_fast())
            .field("frmerr_fast", &esr1.frmerr_fast())
            .field("stferr_fast", &esr1.stferr_fast())
            .field("errovr", &esr1.errovr())
            .field("bit1err", &esr1.bit1err())
            .field("bit0err", &esr1.bit0err())
            .field("ackerr", &esr1.ackerr())
            .field("crcerr", &esr1.crcerr())
            .field("frmerr", &esr1.frmerr())
            .field("stferr", &esr1.stferr())
            .field("txwrn", &esr1.txwrn())
            .field("rxwrn", &esr1.rxwrn())
            .field("fltconf", &esr1.fltconf())
            .finish()
    }
}

/// Printable ECR register
pub struct ErrorCounters(pub Ecr);

impl From<Ecr> for ErrorCounters {
    fn from(value: Ecr) -> Self {
        Self(value)
    }
}

impl ErrorCounters {
    /// Transmit error counter
    pub fn tx(&self) -> u8 {
        self.0.txerrcnt()
    }

    /// Receive error counter
    pub fn rx(&self) -> u8 {
        self.0.rxerrcnt()
    }

    /// Transmit errors in the data phase of bit rate switched frames
    pub fn tx_fast(&self) -> u8 {
        self.0.txerrcnt_fast()
    }

    /// Receive errors in the data phase of bit rate switched frames
    pub fn rx_fast(&self) -> u8 {
        self.0.rxerrcnt_fast()
    }
}

impl Debug for ErrorCounters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCounters")
            .field("tec", &self.tx())
            .field("rec", &self.rx())
            .field("tec_fast", &self.tx_fast())
            .field("rec_fast", &self.rx_fast())
            .finish()
    }
}

/// Fault confinement state of the controller
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultConfinement {
    /// Takes part in bus communication normally
    ErrorActive,
    /// Error counters reached 128
    ErrorPassive,
    /// Transmit error counter exceeded 255
    BusOff,
}

/// Single status bit of ESR1
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// Bit 1 error in the data phase of a bit rate switched frame
    Bit1ErrorFast = 31,
    /// Bit 0 error in the data phase of a bit rate switched frame
    Bit0ErrorFast = 30,
    /// CRC error in the data phase of a bit rate switched frame
    CrcErrorFast = 28,
    /// Form error in the data phase of a bit rate switched frame
    FormErrorFast = 27,
    /// Stuffing error in the data phase of a bit rate switched frame
    StuffErrorFast = 26,
    /// An error occurred while a previous error flag was still set
    ErrorOverrun = 21,
    /// Error interrupt flag for the data phase of bit rate switched frames
    ErrorFastInterrupt = 20,
    /// Bus off recovery completed
    BusOffDone = 19,
    /// Synchronized to the bus
    Synchronized = 18,
    /// Transmit error counter crossed 96
    TxWarningInterrupt = 17,
    /// Receive error counter crossed 96
    RxWarningInterrupt = 16,
    /// Bit 1 error
    Bit1Error = 15,
    /// Bit 0 error
    Bit0Error = 14,
    /// Acknowledge error
    AckError = 13,
    /// CRC error
    CrcError = 12,
    /// Form error
    FormError = 11,
    /// Stuffing error
    StuffError = 10,
    /// Transmit error counter is at or above 96
    TxWarning = 9,
    /// Receive error counter is at or above 96
    RxWarning = 8,
    /// Bus is idle
    Idle = 7,
    /// Transmitting a frame
    Transmitting = 6,
    /// Receiving a frame
    Receiving = 3,
    /// Entered bus off
    BusOff = 2,
    /// Error interrupt flag
    ErrorInterrupt = 1,
    /// Wake up by bus activity
    Wakeup = 0,
}

impl Status {
    fn mask(self) -> u32 {
        1 << self as u32
    }
}

/// Memory error report taken from the error report registers
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EccReport {
    /// Byte address of the word in the CAN RAM where the error was detected
    pub address: u16,
    /// Error was detected on a host access
    pub host_access: bool,
    /// Error could not be corrected
    pub non_correctable: bool,
    /// Raw data word read from the RAM
    pub data: u32,
    /// Syndromes of the four bytes of the word
    pub syndrome: u32,
}

/// Identifier mask in the layout of the mailbox identifier word. A set bit
/// requires the corresponding identifier bit to match.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdMask {
    /// Mask over the 11 bits of a standard identifier
    Standard(u16),
    /// Mask over the 29 bits of an extended identifier
    Extended(u32),
    /// Raw mask word
    Raw(u32),
}

impl IdMask {
    /// Mask requiring every bit of `id` to match
    pub fn exact(id: Id) -> Self {
        match id {
            Id::Standard(_) => IdMask::Standard(0x7ff),
            Id::Extended(_) => IdMask::Extended(0x1fff_ffff),
        }
    }

    /// Mask word as written to the mask registers
    pub fn bits(self) -> u32 {
        match self {
            IdMask::Standard(mask) => (u32::from(mask) & 0x7ff) << 18,
            IdMask::Extended(mask) => mask & 0x1fff_ffff,
            IdMask::Raw(bits) => bits,
        }
    }
}

/// Context of one CAN instance: register access, the callback table and the
/// ESR1 snapshot handed to error callbacks.
///
/// Every operation takes `&self` or `&mut self`, so calls on one instance
/// cannot interleave. Interrupt handlers reach the context through
/// [`Instances`](crate::instance::Instances).
pub struct Can<A> {
    id: InstanceId,
    pub(crate) regs: RegisterBlock<A>,
    pub(crate) callbacks: [Option<Callback<A>>; Interrupt::COUNT],
    pub(crate) esr1_buf: u32,
    timeout: TimeoutPolicy,
    self_reception: bool,
    manual_recovery: bool,
}

impl<A: RegisterAccess> Can<A> {
    /// Creates the context of instance `id` on top of `access`. The hardware
    /// is not touched until [`Self::init`].
    pub fn new(id: InstanceId, access: A) -> Self {
        Self {
            id,
            regs: RegisterBlock::new(access),
            callbacks: [None; Interrupt::COUNT],
            esr1_buf: 0,
            timeout: TimeoutPolicy::default(),
            self_reception: false,
            manual_recovery: false,
        }
    }

    /// Releases the register backend
    pub fn free(self) -> A {
        self.regs.into_inner()
    }

    /// Instance this context drives
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Raw access to the registers.
    ///
    /// # Safety
    /// The abstraction assumes that it has exclusive ownership of the
    /// registers. Direct access can break such assumptions.
    pub unsafe fn registers(&self) -> &RegisterBlock<A> {
        &self.regs
    }

    /// Busy-wait budget
    pub fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    /// Replaces the busy-wait budget
    pub fn set_timeout(&mut self, timeout: TimeoutPolicy) {
        self.timeout = timeout;
    }

    /// Polls MCR until `done` holds or the budget is exhausted
    fn wait_mcr(&self, wait: Wait, done: impl Fn(&Mcr) -> bool) -> Result<(), Error> {
        for _ in 0..self.timeout.max_polls.max(1) {
            if done(&self.regs.mcr().read()) {
                return Ok(());
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("{}: timeout waiting for {}", self.id, wait);
        Err(Error::Timeout(wait))
    }

    /// Brings the controller up and configures it from `config`.
    ///
    /// The controller is reset, its mailbox RAM, masks and Rx FIFO scratch
    /// area cleared, and it is left in `config.mode`.
    pub fn init(&mut self, config: &CanConfig) -> Result<(), Error> {
        let payload_sizes = config.fd.as_ref().map(|fd| &fd.payload_sizes);
        let limit = mailbox_limit(self.id.region_count(), payload_sizes);
        if config.mailbox_count == 0 {
            return Err(Error::InvalidParameter);
        }
        if config.mailbox_count > limit {
            return Err(Error::TooManyMailboxes {
                requested: config.mailbox_count,
                limit,
            });
        }
        if let Some(fifo) = config.rx_fifo {
            if config.fd.is_some() || config.mailbox_count < fifo.filters.reserved_mailboxes() {
                return Err(Error::InvalidParameter);
            }
        }
        config.bit_timing.check(&NOMINAL_BIT_TIMING_RANGES)?;
        if let Some(fd) = &config.fd {
            fd.data_timing.check(&DATA_BIT_TIMING_RANGES)?;
            if fd.tdc_offset.map_or(false, |offset| offset > 0x1f) {
                return Err(Error::InvalidParameter);
            }
        }

        self.timeout = config.timeout;
        self.self_reception = config.self_reception;
        self.manual_recovery = false;

        self.disable()?;
        self.regs
            .ctrl1()
            .modify(|r| r.set_clksrc(config.clock_source == ClockSource::Peripheral));
        self.enable()?;
        self.soft_reset()?;
        self.enter_freeze()?;

        self.clear_ram();

        self.regs.mcr().modify(|r| {
            r.set_maxmb((config.mailbox_count - 1) as u8);
            r.set_irmq(config.mask_type == MaskType::Individual);
            r.set_srxdis(!config.self_reception);
            r.set_aen(true);
            r.set_wrnen(true);
            r.set_fden(config.fd.is_some());
            r.set_rfen(config.rx_fifo.is_some());
            r.set_idam(FilterFormat::A.idam());
        });
        self.regs.ctrl2().modify(|r| {
            r.set_rffn(config.rx_fifo.map_or(0, |fifo| fifo.filters.rffn()));
            r.set_isocanfden(config.fd.is_some());
            r.set_rrs(!config.auto_remote_response);
        });
        self.write_std_bit_timing(&config.bit_timing);

        match &config.fd {
            Some(fd) => {
                self.regs.fdctrl().modify(|r| {
                    r.set_fdrate(fd.bit_rate_switching);
                    for (region, size) in fd.payload_sizes.iter().enumerate() {
                        r.set_mbdsr(region, size.mbdsr());
                    }
                    r.set_tdcen(fd.tdc_offset.is_some());
                    r.set_tdcoff(fd.tdc_offset.unwrap_or(0));
                });
                self.write_fd_bit_timing(&fd.data_timing);
            }
            None => self.regs.fdctrl().modify(|r| {
                r.set_fdrate(false);
                for region in 0..4 {
                    r.set_mbdsr(region, PayloadSize::Bytes8.mbdsr());
                }
                r.set_tdcen(false);
            }),
        }

        self.apply_mode(config.mode)?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "{}: initialized, {} mailboxes, mode {}",
            self.id,
            config.mailbox_count,
            config.mode
        );
        Ok(())
    }

    /// Zeroes the mailbox RAM, the individual and global masks and the Rx
    /// FIFO scratch area. Must be called in freeze mode.
    fn clear_ram(&self) {
        self.regs.ctrl2().modify(|r| r.set_wrmfrz(true));
        let ram_end = reg::RAM + self.id.region_count() * reg::REGION_SIZE;
        for offset in (reg::RAM..ram_end).step_by(4) {
            self.regs.word(offset).write(0);
        }
        for index in 0..self.id.mailbox_count() {
            self.regs.rximr(index).write(0);
        }
        for offset in [reg::RXMGMASK, reg::RX14MASK, reg::RX15MASK, reg::RXFGMASK] {
            self.regs.word(offset).write(0);
        }
        for offset in (reg::SCRATCH..reg::SCRATCH + reg::SCRATCH_SIZE).step_by(4) {
            self.regs.word(offset).write(0);
        }
        self.regs.ctrl2().modify(|r| r.set_wrmfrz(false));
    }

    /// Masks every interrupt source, drops the installed callbacks and
    /// disables the controller
    pub fn deinit(&mut self) -> Result<(), Error> {
        self.disable_all_interrupts();
        self.callbacks = [None; Interrupt::COUNT];
        self.esr1_buf = 0;
        self.disable()?;
        #[cfg(feature = "defmt")]
        defmt::debug!("{}: deinitialized", self.id);
        Ok(())
    }

    /// Leaves low power mode
    pub fn enable(&mut self) -> Result<(), Error> {
        self.regs.mcr().modify(|r| r.set_mdis(false));
        self.wait_mcr(Wait::Enable, |r| !r.lpmack())
    }

    /// Enters low power mode. Pending transmissions and receptions finish
    /// first.
    pub fn disable(&mut self) -> Result<(), Error> {
        if self.regs.mcr().read().mdis() {
            return Ok(());
        }
        self.regs.mcr().modify(|r| r.set_mdis(true));
        self.wait_mcr(Wait::Disable, |r| r.lpmack())
    }

    /// `true` while the controller is in low power mode
    pub fn is_disabled(&self) -> bool {
        self.regs.mcr().read().mdis()
    }

    fn soft_reset(&mut self) -> Result<(), Error> {
        self.regs.mcr().modify(|r| r.set_softrst(true));
        self.wait_mcr(Wait::SoftReset, |r| !r.softrst())
    }

    /// Requests freeze mode and waits for the acknowledge
    pub fn enter_freeze(&mut self) -> Result<(), Error> {
        self.regs.mcr().modify(|r| {
            r.set_frz(true);
            r.set_halt(true);
        });
        self.wait_mcr(Wait::FreezeEnter, |r| r.frzack())
    }

    /// Leaves freeze mode and waits for the acknowledge
    pub fn exit_freeze(&mut self) -> Result<(), Error> {
        self.regs.mcr().modify(|r| r.set_halt(false));
        self.wait_mcr(Wait::FreezeExit, |r| !r.frzack())
    }

    /// `true` while freeze mode is acknowledged
    pub fn is_frozen(&self) -> bool {
        self.regs.mcr().read().frzack()
    }

    /// Runs `f` in freeze mode. Freeze mode is entered only if the controller
    /// is running and left again afterwards, so the run/freeze state of the
    /// controller is the same before and after the call.
    pub fn with_freeze<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let was_frozen = self.is_frozen();
        if !was_frozen {
            self.enter_freeze()?;
        }
        let ret = f(self);
        if !was_frozen {
            self.exit_freeze()?;
        }
        ret
    }

    /// Switches the operation mode
    pub fn set_operation_mode(&mut self, mode: Mode) -> Result<(), Error> {
        if mode == Mode::Disabled {
            self.disable()?;
        } else {
            if self.is_disabled() {
                self.enable()?;
            }
            if !self.is_frozen() {
                self.enter_freeze()?;
            }
            self.apply_mode(mode)?;
        }
        #[cfg(feature = "defmt")]
        defmt::debug!("{}: mode {}", self.id, mode);
        Ok(())
    }

    /// Programs `mode` on a frozen controller and leaves freeze mode unless
    /// `mode` is [`Mode::Freeze`]
    fn apply_mode(&mut self, mode: Mode) -> Result<(), Error> {
        self.regs.ctrl1().modify(|r| {
            r.set_lom(mode == Mode::ListenOnly);
            r.set_lpb(mode == Mode::Loopback);
        });
        // Loopback needs self reception; other modes get the configured one back
        let self_reception = mode == Mode::Loopback || self.self_reception;
        self.regs.mcr().modify(|r| r.set_srxdis(!self_reception));
        match mode {
            Mode::Freeze => Ok(()),
            Mode::Disabled => {
                self.exit_freeze()?;
                self.disable()
            }
            _ => self.exit_freeze(),
        }
    }

    /// Current operation mode
    pub fn operation_mode(&self) -> Mode {
        let mcr = self.regs.mcr().read();
        let ctrl1 = self.regs.ctrl1().read();
        if mcr.mdis() {
            Mode::Disabled
        } else if mcr.frzack() {
            Mode::Freeze
        } else if ctrl1.lpb() {
            Mode::Loopback
        } else if ctrl1.lom() {
            Mode::ListenOnly
        } else {
            Mode::Normal
        }
    }

    /// Number of mailboxes in use, `MCR.MAXMB + 1`
    pub fn mailbox_count(&self) -> usize {
        self.regs.mcr().read().maxmb() as usize + 1
    }

    /// `true` if the controller runs in CAN FD mode
    pub fn fd_enabled(&self) -> bool {
        self.regs.mcr().read().fden()
    }

    /// `true` if the legacy Rx FIFO is enabled
    pub fn rx_fifo_enabled(&self) -> bool {
        self.regs.mcr().read().rfen()
    }

    fn write_std_bit_timing(&self, timing: &BitTiming) {
        self.regs.cbt().modify(|r| {
            r.set_btf(true);
            r.set_epresdiv(timing.prescaler - 1);
            r.set_erjw(timing.sjw - 1);
            r.set_epropseg(timing.prop_seg - 1);
            r.set_epseg1(timing.phase_seg_1 - 1);
            r.set_epseg2(timing.phase_seg_2 - 1);
        });
    }

    fn write_fd_bit_timing(&self, timing: &BitTiming) {
        self.regs.fdcbt().modify(|r| {
            r.set_fpresdiv(timing.prescaler - 1);
            r.set_frjw(timing.sjw - 1);
            r.set_fpropseg(timing.prop_seg);
            r.set_fpseg1(timing.phase_seg_1 - 1);
            r.set_fpseg2(timing.phase_seg_2 - 1);
        });
    }

    /// Sets the nominal bit timing
    pub fn set_std_bit_timing(&mut self, timing: &BitTiming) -> Result<(), Error> {
        timing.check(&NOMINAL_BIT_TIMING_RANGES)?;
        self.with_freeze(|can| {
            can.write_std_bit_timing(timing);
            Ok(())
        })
    }

    /// Nominal bit timing in effect
    pub fn std_bit_timing(&self) -> BitTiming {
        let cbt = self.regs.cbt().read();
        if cbt.btf() {
            BitTiming {
                prop_seg: cbt.epropseg() + 1,
                phase_seg_1: cbt.epseg1() + 1,
                phase_seg_2: cbt.epseg2() + 1,
                prescaler: cbt.epresdiv() + 1,
                sjw: cbt.erjw() + 1,
            }
        } else {
            let ctrl1 = self.regs.ctrl1().read();
            BitTiming {
                prop_seg: ctrl1.propseg() + 1,
                phase_seg_1: ctrl1.pseg1() + 1,
                phase_seg_2: ctrl1.pseg2() + 1,
                prescaler: u16::from(ctrl1.presdiv()) + 1,
                sjw: ctrl1.rjw() + 1,
            }
        }
    }

    /// Sets the data phase bit timing of bit rate switched frames
    pub fn set_fd_bit_timing(&mut self, timing: &BitTiming) -> Result<(), Error> {
        timing.check(&DATA_BIT_TIMING_RANGES)?;
        self.with_freeze(|can| {
            can.write_fd_bit_timing(timing);
            Ok(())
        })
    }

    /// Data phase bit timing in effect
    pub fn fd_bit_timing(&self) -> BitTiming {
        let fdcbt = self.regs.fdcbt().read();
        BitTiming {
            prop_seg: fdcbt.fpropseg(),
            phase_seg_1: fdcbt.fpseg1() + 1,
            phase_seg_2: fdcbt.fpseg2() + 1,
            prescaler: fdcbt.fpresdiv() + 1,
            sjw: fdcbt.frjw() + 1,
        }
    }

    /// Selects global or individual masking for mailboxes and the Rx FIFO
    pub fn set_rx_mask_type(&mut self, mask_type: MaskType) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.regs
                .mcr()
                .modify(|r| r.set_irmq(mask_type == MaskType::Individual));
            Ok(())
        })
    }

    /// Mask applied to all receive mailboxes except 14 and 15 when global
    /// masking is selected
    pub fn set_rx_mb_global_mask(&mut self, mask: IdMask) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.regs.word(reg::RXMGMASK).write(mask.bits());
            Ok(())
        })
    }

    /// Mask of mailbox `mb` when individual masking is selected
    pub fn set_rx_mb_individual_mask(&mut self, mb: usize, mask: IdMask) -> Result<(), Error> {
        self.check_mb_id(mb)?;
        self.with_freeze(|can| {
            can.regs.rximr(mb).write(mask.bits());
            Ok(())
        })
    }

    /// Mask of mailbox 14 when global masking is selected
    pub fn set_rx_mb14_mask(&mut self, mask: IdMask) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.regs.word(reg::RX14MASK).write(mask.bits());
            Ok(())
        })
    }

    /// Mask of mailbox 15 when global masking is selected
    pub fn set_rx_mb15_mask(&mut self, mask: IdMask) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.regs.word(reg::RX15MASK).write(mask.bits());
            Ok(())
        })
    }

    /// Receive frames transmitted by this controller
    pub fn set_self_reception(&mut self, enable: bool) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.self_reception = enable;
            can.regs.mcr().modify(|r| r.set_srxdis(!enable));
            Ok(())
        })
    }

    /// Reads a status bit from ESR1. Reading ESR1 clears its error bits.
    pub fn status(&self, status: Status) -> bool {
        self.regs.word(reg::ESR1).read() & status.mask() != 0
    }

    /// Clears an interrupt flag of ESR1. Error bits clear when ESR1 is
    /// read.
    pub fn clear_status(&mut self, status: Status) {
        self.regs.word(reg::ESR1).write(status.mask());
    }

    /// Reads a status bit from the ESR1 snapshot taken for the running error
    /// callback
    pub fn status_from_esr1_buffer(&self, status: Status) -> bool {
        self.esr1_buf & status.mask() != 0
    }

    /// ESR1 snapshot taken before the error flags were cleared. Only valid
    /// inside an [`Interrupt::Error`] or [`Interrupt::ErrorFast`] callback;
    /// zero otherwise.
    pub fn esr1_buffer(&self) -> u32 {
        self.esr1_buf
    }

    /// Reads the error status
    pub fn error_status(&self) -> ErrorStatus {
        self.regs.esr1().read().into()
    }

    /// Reads the error counters
    pub fn error_counters(&self) -> ErrorCounters {
        self.regs.ecr().read().into()
    }

    /// Fault confinement state
    pub fn fault_confinement(&self) -> FaultConfinement {
        match self.regs.esr1().read().fltconf() {
            0 => FaultConfinement::ErrorActive,
            1 => FaultConfinement::ErrorPassive,
            _ => FaultConfinement::BusOff,
        }
    }

    /// Lowest priority inactive transmit mailbox, if the controller found
    /// one during the last arbitration
    pub fn lowest_priority_inactive_mb(&self) -> Option<usize> {
        let esr2 = self.regs.esr2().read();
        (esr2.imb() && esr2.vps()).then(|| esr2.lptm() as usize)
    }

    /// Selects between automatic bus off recovery and recovery on request
    /// through [`Self::recover_from_bus_off`]
    pub fn set_bus_off_recovery(&mut self, automatic: bool) {
        self.manual_recovery = !automatic;
        self.regs.ctrl1().modify(|r| r.set_boffrec(!automatic));
    }

    /// Lets the controller leave bus off while automatic recovery is
    /// disabled. Returns `WouldBlock` as long as the controller is bus off;
    /// once it is back, automatic recovery is disabled again. Does nothing
    /// with automatic recovery selected.
    pub fn recover_from_bus_off(&mut self) -> nb::Result<(), Infallible> {
        if !self.manual_recovery {
            return Ok(());
        }
        if self.fault_confinement() == FaultConfinement::BusOff {
            self.regs.ctrl1().modify(|r| r.set_boffrec(false));
            return Err(nb::Error::WouldBlock);
        }
        self.regs.ctrl1().modify(|r| r.set_boffrec(true));
        Ok(())
    }

    /// Wake up from low power mode on bus activity. With `filtered`, only
    /// dominant pulses longer than the filter time wake the controller.
    pub fn set_self_wakeup(&mut self, enable: bool, filtered: bool) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.regs.mcr().modify(|r| {
                r.set_slfwak(enable);
                r.set_waksrc(filtered);
            });
            Ok(())
        })
    }

    /// Transceiver delay compensation offset in time quanta. `None` disables
    /// compensation.
    pub fn set_tdc(&mut self, offset: Option<u8>) -> Result<(), Error> {
        if offset.map_or(false, |offset| offset > 0x1f) {
            return Err(Error::InvalidParameter);
        }
        self.with_freeze(|can| {
            can.regs.fdctrl().modify(|r| {
                r.set_tdcen(offset.is_some());
                r.set_tdcoff(offset.unwrap_or(0));
            });
            Ok(())
        })
    }

    /// `true` if the measured transceiver delay exceeded the compensation
    /// range. Cleared by [`Self::clear_tdc_failed`].
    pub fn tdc_failed(&self) -> bool {
        self.regs.fdctrl().read().tdcfail()
    }

    /// Clears the transceiver delay compensation failure flag
    pub fn clear_tdc_failed(&mut self) {
        self.regs.fdctrl().modify(|r| r.set_tdcfail(true));
    }

    /// Measured transceiver delay plus offset, in clock periods
    pub fn tdc_value(&self) -> u8 {
        self.regs.fdctrl().read().tdcval()
    }

    /// Details of the last memory error, if one was flagged
    pub fn ecc_error_report(&self) -> Option<EccReport> {
        let errsr = self.regs.errsr().read();
        if !(errsr.ceif() || errsr.fanceif() || errsr.hanceif()) {
            return None;
        }
        let rerrar = self.regs.word(reg::RERRAR).read();
        Some(EccReport {
            address: (rerrar & 0x3fff) as u16,
            host_access: (rerrar >> 16) & 0x7 == 0,
            non_correctable: rerrar & (1 << 24) != 0,
            data: self.regs.word(reg::RERRDR).read(),
            syndrome: self.regs.word(reg::RERRSYNR).read(),
        })
    }

    /// Free running timer. Reading it also releases a mailbox locked by a
    /// preceding control/status read.
    pub fn timer(&self) -> u16 {
        self.regs.word(reg::TIMER).read() as u16
    }

    /// Edits MECR. Writes are only accepted with `CTRL2.ECRWRE` set and
    /// `MECR.ECRWRDIS` clear; both are restored afterwards.
    pub(crate) fn modify_mecr(&self, f: impl FnOnce(&mut Mecr)) {
        self.regs.ctrl2().modify(|r| r.set_ecrwre(true));
        self.regs.mecr().modify(|r| r.set_ecrwrdis(false));
        self.regs.mecr().modify(f);
        self.regs.mecr().modify(|r| r.set_ecrwrdis(true));
        self.regs.ctrl2().modify(|r| r.set_ecrwre(false));
    }
}
