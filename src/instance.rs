//! CAN instances of the device and the per-instance context arena

use crate::bus::Can;
use crate::interrupt::IrqLine;
use crate::reg::RegisterAccess;
use crate::vector::Vector;

/// Number of CAN instances on the device
pub const INSTANCE_COUNT: usize = 8;

/// Base address of every CAN register block, indexed by [`InstanceId`]
const BASE_ADDRESSES: [usize; INSTANCE_COUNT] = [
    0x4004_8000,
    0x4004_9000,
    0x4004_A000,
    0x4004_B000,
    0x4004_C000,
    0x4004_D000,
    0x4004_E000,
    0x4004_F000,
];

/// Identity of a CAN peripheral instance
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InstanceId {
    /// CAN0
    Can0 = 0,
    /// CAN1
    Can1 = 1,
    /// CAN2
    Can2 = 2,
    /// CAN3
    Can3 = 3,
    /// CAN4
    Can4 = 4,
    /// CAN5
    Can5 = 5,
    /// CAN6
    Can6 = 6,
    /// CAN7
    Can7 = 7,
}

/// The index does not name a CAN instance
#[derive(Debug)]
pub struct InvalidInstance;

impl TryFrom<u8> for InstanceId {
    type Error = InvalidInstance;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use InstanceId::*;
        let ret = match value {
            0 => Can0,
            1 => Can1,
            2 => Can2,
            3 => Can3,
            4 => Can4,
            5 => Can5,
            6 => Can6,
            7 => Can7,
            8.. => Err(InvalidInstance)?,
        };
        Ok(ret)
    }
}

impl InstanceId {
    /// All instances in index order
    pub const ALL: [InstanceId; INSTANCE_COUNT] = [
        InstanceId::Can0,
        InstanceId::Can1,
        InstanceId::Can2,
        InstanceId::Can3,
        InstanceId::Can4,
        InstanceId::Can5,
        InstanceId::Can6,
        InstanceId::Can7,
    ];

    /// Index of the instance, `0..INSTANCE_COUNT`
    pub fn index(self) -> usize {
        self as usize
    }

    /// Start of the register block
    pub fn base_address(self) -> usize {
        BASE_ADDRESSES[self.index()]
    }

    /// Number of mailboxes implemented in hardware with 8-byte payloads.
    ///
    /// CAN0 and CAN1 carry four RAM regions, the other instances two.
    pub fn mailbox_count(self) -> usize {
        match self {
            InstanceId::Can0 | InstanceId::Can1 => 128,
            _ => 64,
        }
    }

    /// Number of 512-byte mailbox RAM regions
    pub fn region_count(self) -> usize {
        self.mailbox_count() / 32
    }
}

/// Per-instance contexts, indexed by [`InstanceId`].
///
/// Interrupt handlers reach the context of their instance through
/// [`Instances::on_vector`].
pub struct Instances<A> {
    slots: [Option<Can<A>>; INSTANCE_COUNT],
}

impl<A: RegisterAccess> Default for Instances<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: RegisterAccess> Instances<A> {
    /// An arena without contexts
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Stores `can` in the slot of its instance. Returns the context
    /// previously held there.
    pub fn insert(&mut self, can: Can<A>) -> Option<Can<A>> {
        self.slots[can.id().index()].replace(can)
    }

    /// Takes the context of `id` out of the arena
    pub fn remove(&mut self, id: InstanceId) -> Option<Can<A>> {
        self.slots[id.index()].take()
    }

    /// Context of `id`
    pub fn get(&self, id: InstanceId) -> Option<&Can<A>> {
        self.slots[id.index()].as_ref()
    }

    /// Context of `id`
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Can<A>> {
        self.slots[id.index()].as_mut()
    }

    /// Runs the handler of `line` on the context of `id`. Lines of instances
    /// without a context are ignored.
    pub fn dispatch(&mut self, id: InstanceId, line: IrqLine) {
        if let Some(can) = self.get_mut(id) {
            can.handle(line);
        }
    }

    /// Runs the handler behind a hardware interrupt vector
    pub fn on_vector(&mut self, vector: Vector) {
        self.dispatch(vector.instance(), vector.line());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn instance_index_round_trips() {
        for id in InstanceId::ALL {
            assert_eq!(InstanceId::try_from(id.index() as u8).ok(), Some(id));
        }
        assert!(InstanceId::try_from(8).is_err());
    }

    #[test]
    fn region_count_follows_mailbox_count() {
        assert_eq!(InstanceId::Can0.region_count(), 4);
        assert_eq!(InstanceId::Can5.region_count(), 2);
    }
}
