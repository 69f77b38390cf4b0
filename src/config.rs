//! CAN bus configuration

use core::ops::RangeInclusive;
use fugit::HertzU32;

/// Configuration applied by [`Can::init`](crate::bus::Can::init)
#[derive(Copy, Clone, Debug)]
pub struct CanConfig {
    /// Number of mailboxes in use, counted from mailbox 0. Includes the
    /// mailboxes taken by the Rx FIFO when it is enabled.
    pub mailbox_count: usize,
    /// Legacy Rx FIFO. `None` leaves it disabled.
    pub rx_fifo: Option<RxFifoConfig>,
    /// Operation mode entered at the end of initialization
    pub mode: Mode,
    /// Clock feeding the protocol engine
    pub clock_source: ClockSource,
    /// Bit timing for classic frames and the arbitration phase of FD frames
    pub bit_timing: BitTiming,
    /// CAN FD settings. `None` runs the controller in classic mode.
    pub fd: Option<FdConfig>,
    /// Selects between the global masks and the individual masks for
    /// mailbox and Rx FIFO matching
    pub mask_type: MaskType,
    /// Receive frames transmitted by this controller
    pub self_reception: bool,
    /// Answer matching remote requests automatically from mailboxes set up
    /// with
    /// [`Can::config_remote_response_mb`](crate::bus::Can::config_remote_response_mb).
    /// When `false`, remote requests are stored like data frames.
    pub auto_remote_response: bool,
    /// Budget for busy-wait loops on hardware acknowledge bits
    pub timeout: TimeoutPolicy,
}

impl CanConfig {
    /// Create an instance
    ///
    /// Nominal bit timing must be provided, all other settings come
    /// pre-populated with default values.
    pub fn new(bit_timing: BitTiming) -> Self {
        Self {
            mailbox_count: 16,
            rx_fifo: None,
            mode: Default::default(),
            clock_source: Default::default(),
            bit_timing,
            fd: None,
            mask_type: Default::default(),
            self_reception: false,
            auto_remote_response: false,
            timeout: Default::default(),
        }
    }
}

/// CAN FD settings
#[derive(Copy, Clone, Debug)]
pub struct FdConfig {
    /// Bit timing of the data phase of bit rate switched frames
    pub data_timing: BitTiming,
    /// If `true`, FD frames may be transmitted with bit rate switching
    pub bit_rate_switching: bool,
    /// Payload size of every mailbox in each 512-byte RAM region. Regions
    /// not implemented by the instance are ignored.
    pub payload_sizes: [PayloadSize; 4],
    /// Transceiver delay compensation offset in time quanta. `None`
    /// disables compensation.
    pub tdc_offset: Option<u8>,
}

impl FdConfig {
    /// Create an instance with 64-byte mailboxes in every region and bit
    /// rate switching enabled
    pub fn new(data_timing: BitTiming) -> Self {
        Self {
            data_timing,
            bit_rate_switching: true,
            payload_sizes: [PayloadSize::Bytes64; 4],
            tdc_offset: None,
        }
    }
}

/// Operation mode
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Takes part in bus communication
    #[default]
    Normal,
    /// Receives frames without acknowledging them and does not transmit
    ListenOnly,
    /// Transmitted frames are looped back internally and received
    Loopback,
    /// Halted with configuration registers writable
    Freeze,
    /// Module disabled, clocks gated
    Disabled,
}

/// Clock feeding the CAN protocol engine
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// Oscillator clock
    #[default]
    Oscillator,
    /// Peripheral bus clock
    Peripheral,
}

/// Selects the masks used when matching received frames
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MaskType {
    /// `RXMGMASK`, `RX14MASK`, `RX15MASK` and `RXFGMASK`
    Global,
    /// One `RXIMR` per mailbox / Rx FIFO filter element
    #[default]
    Individual,
}

/// Payload size of the mailboxes of one RAM region
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadSize {
    /// 8 bytes, 32 mailboxes per region
    #[default]
    Bytes8 = 0,
    /// 16 bytes, 21 mailboxes per region
    Bytes16 = 1,
    /// 32 bytes, 12 mailboxes per region
    Bytes32 = 2,
    /// 64 bytes, 7 mailboxes per region
    Bytes64 = 3,
}

impl PayloadSize {
    /// Payload bytes per mailbox
    pub fn bytes(self) -> usize {
        8 << self as usize
    }

    /// Value of the `FDCTRL.MBDSRn` field selecting this size
    pub fn mbdsr(self) -> u8 {
        self as u8
    }

    /// Size selected by an `FDCTRL.MBDSRn` field value
    pub fn from_mbdsr(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::Bytes8,
            1 => Self::Bytes16,
            2 => Self::Bytes32,
            _ => Self::Bytes64,
        }
    }

    /// Bytes taken by one mailbox, header included
    pub fn mailbox_size(self) -> usize {
        8 + self.bytes()
    }

    /// Mailboxes that fit in one 512-byte RAM region
    pub fn mailboxes_per_region(self) -> usize {
        crate::reg::REGION_SIZE / self.mailbox_size()
    }
}

/// Number of mailboxes the RAM of an instance with `region_count` regions
/// holds. `payload_sizes` is `None` for classic operation, where every
/// mailbox carries 8 bytes.
pub fn mailbox_limit(region_count: usize, payload_sizes: Option<&[PayloadSize; 4]>) -> usize {
    match payload_sizes {
        None => region_count * PayloadSize::Bytes8.mailboxes_per_region(),
        Some(sizes) => sizes
            .iter()
            .take(region_count)
            .map(|size| size.mailboxes_per_region())
            .sum(),
    }
}

/// Legacy Rx FIFO settings
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFifoConfig {
    /// Size of the ID filter table
    pub filters: RxFifoFilters,
}

/// Number of Rx FIFO ID filter table elements, a multiple of 8 in
/// `8..=128`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFifoFilters(u8);

impl RxFifoFilters {
    /// Eight filter elements
    pub const MIN: Self = Self(0);

    /// `None` unless `elements` is a multiple of 8 in `8..=128`
    pub fn new(elements: usize) -> Option<Self> {
        if (8..=128).contains(&elements) && elements % 8 == 0 {
            Some(Self((elements / 8 - 1) as u8))
        } else {
            None
        }
    }

    /// Value of the `CTRL2.RFFN` field
    pub fn from_rffn(rffn: u8) -> Self {
        Self(rffn & 0xf)
    }

    /// Value of the `CTRL2.RFFN` field
    pub fn rffn(self) -> u8 {
        self.0
    }

    /// Number of filter table elements
    pub fn elements(self) -> usize {
        (self.0 as usize + 1) * 8
    }

    /// Mailboxes occupied by the FIFO engine and the filter table,
    /// starting at mailbox 0
    pub fn reserved_mailboxes(self) -> usize {
        8 + 2 * self.0 as usize
    }
}

/// Busy-wait budget for hardware acknowledge bits
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeoutPolicy {
    /// Number of register polls before giving up
    pub max_polls: u32,
}

impl TimeoutPolicy {
    /// Default number of polls
    pub const DEFAULT_MAX_POLLS: u32 = 0x1_0000;
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            max_polls: Self::DEFAULT_MAX_POLLS,
        }
    }
}

/// Bit-timing parameters
///
/// The bit time is made of the synchronization segment (1 time quantum),
/// the propagation segment and the two phase segments. One time quantum is
/// `prescaler` periods of the protocol engine clock.
///
/// This struct expects *real* values; the encodings the registers expect
/// are handled within the HAL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    /// Propagation segment in time quanta
    pub prop_seg: u8,
    /// Phase segment 1 in time quanta
    pub phase_seg_1: u8,
    /// Phase segment 2 in time quanta
    pub phase_seg_2: u8,
    /// Clock periods per time quantum
    pub prescaler: u16,
    /// Resynchronization jump width in time quanta
    pub sjw: u8,
}

/// Misconfigurations of [`BitTiming`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitTimingError {
    /// SJW is outside the wrapped `RangeInclusive`
    SynchronizationJumpWidthOutOfRange(RangeInclusive<u32>),
    /// Propagation segment is outside the wrapped `RangeInclusive`
    PropagationSegmentOutOfRange(RangeInclusive<u32>),
    /// Phase segment 1 is outside the wrapped `RangeInclusive`
    PhaseSeg1OutOfRange(RangeInclusive<u32>),
    /// Phase segment 2 is outside the wrapped `RangeInclusive`
    PhaseSeg2OutOfRange(RangeInclusive<u32>),
    /// Prescaler is outside the wrapped `RangeInclusive`
    PrescalerOutOfRange(RangeInclusive<u32>),
}

/// Valid values of a BitTiming struct
#[derive(Clone)]
pub(crate) struct BitTimingRanges {
    sjw: RangeInclusive<u32>,
    prop_seg: RangeInclusive<u32>,
    phase_seg_1: RangeInclusive<u32>,
    phase_seg_2: RangeInclusive<u32>,
    prescaler: RangeInclusive<u32>,
}

/// Ranges of the `CBT` register
pub(crate) const NOMINAL_BIT_TIMING_RANGES: BitTimingRanges = BitTimingRanges {
    sjw: 1..=32,
    prop_seg: 1..=64,
    phase_seg_1: 1..=32,
    phase_seg_2: 1..=32,
    prescaler: 1..=1024,
};

/// Ranges of the `FDCBT` register
pub(crate) const DATA_BIT_TIMING_RANGES: BitTimingRanges = BitTimingRanges {
    sjw: 1..=8,
    prop_seg: 1..=31,
    phase_seg_1: 1..=8,
    phase_seg_2: 1..=8,
    prescaler: 1..=1024,
};

impl BitTiming {
    /// Returns the number of time quanta that make up one bit time, `t_bit /
    /// t_q`
    pub fn time_quanta_per_bit(&self) -> u32 {
        1 + u32::from(self.prop_seg) + u32::from(self.phase_seg_1) + u32::from(self.phase_seg_2)
    }

    /// Bitrate resulting from these parameters on a protocol engine clocked
    /// at `can_clock`
    pub fn bitrate(&self, can_clock: HertzU32) -> HertzU32 {
        let divider = u32::from(self.prescaler).max(1) * self.time_quanta_per_bit();
        HertzU32::from_raw(can_clock.to_Hz() / divider)
    }

    pub(crate) fn check(&self, valid: &BitTimingRanges) -> Result<(), BitTimingError> {
        if !valid.sjw.contains(&self.sjw.into()) {
            Err(BitTimingError::SynchronizationJumpWidthOutOfRange(
                valid.sjw.clone(),
            ))
        } else if !valid.prop_seg.contains(&self.prop_seg.into()) {
            Err(BitTimingError::PropagationSegmentOutOfRange(
                valid.prop_seg.clone(),
            ))
        } else if !valid.phase_seg_1.contains(&self.phase_seg_1.into()) {
            Err(BitTimingError::PhaseSeg1OutOfRange(
                valid.phase_seg_1.clone(),
            ))
        } else if !valid.phase_seg_2.contains(&self.phase_seg_2.into()) {
            Err(BitTimingError::PhaseSeg2OutOfRange(
                valid.phase_seg_2.clone(),
            ))
        } else if !valid.prescaler.contains(&self.prescaler.into()) {
            Err(BitTimingError::PrescalerOutOfRange(valid.prescaler.clone()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use fugit::RateExtU32;

    const TIMING: BitTiming = BitTiming {
        prop_seg: 2,
        phase_seg_1: 4,
        phase_seg_2: 3,
        prescaler: 4,
        sjw: 2,
    };

    #[test]
    fn standard_timing_is_valid() {
        assert_eq!(TIMING.check(&NOMINAL_BIT_TIMING_RANGES), Ok(()));
        assert_eq!(TIMING.check(&DATA_BIT_TIMING_RANGES), Ok(()));
        assert_eq!(TIMING.time_quanta_per_bit(), 10);
    }

    #[test]
    fn zero_segments_are_rejected() {
        let timing = BitTiming {
            phase_seg_2: 0,
            ..TIMING
        };
        assert_eq!(
            timing.check(&NOMINAL_BIT_TIMING_RANGES),
            Err(BitTimingError::PhaseSeg2OutOfRange(1..=32))
        );
        let timing = BitTiming {
            prop_seg: 0,
            ..TIMING
        };
        assert!(matches!(
            timing.check(&NOMINAL_BIT_TIMING_RANGES),
            Err(BitTimingError::PropagationSegmentOutOfRange(_))
        ));
        let timing = BitTiming {
            prescaler: 0,
            ..TIMING
        };
        assert!(matches!(
            timing.check(&NOMINAL_BIT_TIMING_RANGES),
            Err(BitTimingError::PrescalerOutOfRange(_))
        ));
    }

    #[test]
    fn data_phase_ranges_are_narrower() {
        let timing = BitTiming {
            phase_seg_1: 9,
            ..TIMING
        };
        assert_eq!(timing.check(&NOMINAL_BIT_TIMING_RANGES), Ok(()));
        assert!(matches!(
            timing.check(&DATA_BIT_TIMING_RANGES),
            Err(BitTimingError::PhaseSeg1OutOfRange(_))
        ));
    }

    #[test]
    fn bitrate_divides_clock_by_quanta() {
        assert_eq!(TIMING.bitrate(40.MHz()), 1.MHz::<1, 1>());
    }

    #[test]
    fn mailbox_limit_depends_on_payload_sizes() {
        assert_eq!(mailbox_limit(2, None), 64);
        assert_eq!(mailbox_limit(4, None), 128);
        let sizes = [
            PayloadSize::Bytes8,
            PayloadSize::Bytes16,
            PayloadSize::Bytes32,
            PayloadSize::Bytes64,
        ];
        assert_eq!(mailbox_limit(2, Some(&sizes)), 32 + 21);
        assert_eq!(mailbox_limit(4, Some(&sizes)), 32 + 21 + 12 + 7);
    }

    #[test]
    fn rx_fifo_filters_reserve_mailboxes() {
        assert_eq!(RxFifoFilters::new(8), Some(RxFifoFilters::MIN));
        assert_eq!(RxFifoFilters::MIN.reserved_mailboxes(), 8);
        let filters = RxFifoFilters::new(32).unwrap();
        assert_eq!(filters.rffn(), 3);
        assert_eq!(filters.elements(), 32);
        assert_eq!(filters.reserved_mailboxes(), 14);
        assert_eq!(RxFifoFilters::new(12), None);
        assert_eq!(RxFifoFilters::new(136), None);
    }
}
