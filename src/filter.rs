//! Rx FIFO ID filter table
//!
//! The table starts right after the eight words of the FIFO output
//! mailboxes and holds `(RFFN + 1) * 8` words. How a word is split into
//! filter elements depends on the format selected by `MCR.IDAM`.

use embedded_can::Id;

/// Layout of the filter table words
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterFormat {
    /// One full identifier per word, with RTR and IDE
    A,
    /// Two identifiers per word: full standard IDs or the 14 most
    /// significant bits of extended IDs, with RTR and IDE
    B,
    /// Four 8-bit partial identifiers per word
    C,
    /// All frames rejected
    D,
}

impl FilterFormat {
    /// Value of the `MCR.IDAM` field
    pub fn idam(self) -> u8 {
        match self {
            FilterFormat::A => 0,
            FilterFormat::B => 1,
            FilterFormat::C => 2,
            FilterFormat::D => 3,
        }
    }

    /// Format selected by an `MCR.IDAM` field value
    pub fn from_idam(idam: u8) -> Self {
        match idam & 0x3 {
            0 => FilterFormat::A,
            1 => FilterFormat::B,
            2 => FilterFormat::C,
            _ => FilterFormat::D,
        }
    }

    /// Filter elements in one table word
    pub fn elements_per_word(self) -> usize {
        match self {
            FilterFormat::A => 1,
            FilterFormat::B => 2,
            FilterFormat::C => 4,
            FilterFormat::D => 0,
        }
    }

    /// Packs up to [`Self::elements_per_word`] filters into a table word.
    /// Missing elements are left zero.
    pub fn encode(self, filters: &[FifoFilter]) -> u32 {
        match self {
            FilterFormat::A => filters.first().map_or(0, FifoFilter::format_a),
            FilterFormat::B => {
                let high = filters.first().map_or(0, |f| f.format_b() << 16);
                let low = filters.get(1).map_or(0, FifoFilter::format_b);
                high | low
            }
            FilterFormat::C => filters
                .iter()
                .take(4)
                .enumerate()
                .fold(0, |word, (i, f)| word | u32::from(f.format_c()) << (24 - 8 * i)),
            FilterFormat::D => 0,
        }
    }
}

/// Rx FIFO filter element
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FifoFilter {
    /// Identifier to accept
    pub id: Id,
    /// Accept remote frames instead of data frames. Ignored by format C.
    pub remote: bool,
}

impl FifoFilter {
    /// Filter accepting data frames with identifier `id`
    pub fn data(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            remote: false,
        }
    }

    /// Filter accepting remote frames with identifier `id`
    pub fn remote(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            remote: true,
        }
    }

    fn flags(&self) -> u32 {
        let ide = matches!(self.id, Id::Extended(_));
        (self.remote as u32) << 31 | (ide as u32) << 30
    }

    fn format_a(&self) -> u32 {
        let id = match self.id {
            Id::Standard(id) => u32::from(id.as_raw()) << 19,
            Id::Extended(id) => id.as_raw() << 1,
        };
        self.flags() | id
    }

    /// Element in the lower half word layout
    fn format_b(&self) -> u32 {
        let id = match self.id {
            Id::Standard(id) => u32::from(id.as_raw()) << 3,
            Id::Extended(id) => (id.as_raw() >> 15) & 0x3fff,
        };
        (self.flags() >> 16) | id
    }

    fn format_c(&self) -> u8 {
        match self.id {
            Id::Standard(id) => (id.as_raw() >> 3) as u8,
            Id::Extended(id) => (id.as_raw() >> 21) as u8,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use embedded_can::{ExtendedId, StandardId};

    fn std(raw: u16) -> StandardId {
        StandardId::new(raw).unwrap()
    }

    fn ext(raw: u32) -> ExtendedId {
        ExtendedId::new(raw).unwrap()
    }

    #[test]
    fn format_a_words() {
        assert_eq!(FilterFormat::A.encode(&[FifoFilter::data(std(0x123))]), 0x123 << 19);
        assert_eq!(
            FilterFormat::A.encode(&[FifoFilter::remote(ext(0x1234_5678))]),
            (1 << 31) | (1 << 30) | (0x1234_5678 << 1)
        );
        assert_eq!(FilterFormat::A.encode(&[]), 0);
    }

    #[test]
    fn format_b_words() {
        let word = FilterFormat::B.encode(&[
            FifoFilter::data(std(0x7ff)),
            FifoFilter::remote(std(0x001)),
        ]);
        assert_eq!(word, (0x7ff << 19) | (1 << 15) | (0x001 << 3));

        let id = 0x1fff_ffff;
        let word = FilterFormat::B.encode(&[FifoFilter::data(ext(id)), FifoFilter::data(ext(id))]);
        assert_eq!(
            word,
            (1 << 30) | (((id >> 15) & 0x3fff) << 16) | (1 << 14) | ((id >> 15) & 0x3fff)
        );
    }

    #[test]
    fn format_c_words() {
        let word = FilterFormat::C.encode(&[
            FifoFilter::data(std(0x7f8)),
            FifoFilter::data(ext(0x1fe0_0000)),
            FifoFilter::data(std(0x008)),
            FifoFilter::data(std(0x010)),
            FifoFilter::data(std(0x7ff)),
        ]);
        assert_eq!(word, 0xffff_0102);
    }

    #[test]
    fn idam_round_trips() {
        for format in [FilterFormat::A, FilterFormat::B, FilterFormat::C, FilterFormat::D] {
            assert_eq!(FilterFormat::from_idam(format.idam()), format);
        }
        assert_eq!(FilterFormat::D.encode(&[FifoFilter::data(std(1))]), 0);
    }
}
