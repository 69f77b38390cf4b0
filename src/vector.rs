//! Hardware interrupt vectors
//!
//! Every instance has one vector per [`IrqLine`]. The crate keeps no global
//! context, so it defines no handler functions: the application owns the
//! [`Instances`](crate::instance::Instances) arena and its interrupt
//! handlers forward their vector to
//! [`Instances::on_vector`](crate::instance::Instances::on_vector):
//!
//! ```no_run
//! # use z20k14x_can::{instance::Instances, reg::Mmio, vector::Vector};
//! # fn instances() -> &'static mut Instances<Mmio> { unimplemented!() }
//! fn can0_bus_off() {
//!     instances().on_vector(Vector::CAN0_BUS_OFF);
//! }
//! ```

use crate::instance::InstanceId;
use crate::interrupt::IrqLine;
use paste::paste;

/// An interrupt vector: an instance and one of its lines
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector {
    instance: InstanceId,
    line: IrqLine,
}

impl Vector {
    /// Vector of `line` on `instance`
    pub const fn new(instance: InstanceId, line: IrqLine) -> Self {
        Self { instance, line }
    }

    /// Instance raising the vector
    pub fn instance(self) -> InstanceId {
        self.instance
    }

    /// Line of the instance
    pub fn line(self) -> IrqLine {
        self.line
    }
}

macro_rules! vectors {
    (@line $instance:ident, $suffix:ident, $line:ident, $what:literal) => {
        paste! {
            #[doc = concat!(stringify!($instance), " ", $what)]
            pub const [<$instance:upper _ $suffix>]: Vector =
                Vector::new(InstanceId::$instance, IrqLine::$line);
        }
    };
    ($($instance:ident),+ $(,)?) => {
        impl Vector {
            $(
                vectors!(@line $instance, BUS_OFF, BusOff, "bus off");
                vectors!(@line $instance, BUS_OFF_DONE, BusOffDone, "bus off recovery done");
                vectors!(@line $instance, TX_WARNING, TxWarning, "transmit warning");
                vectors!(@line $instance, RX_WARNING, RxWarning, "receive warning");
                vectors!(@line $instance, ERROR, Error, "bus error");
                vectors!(@line $instance, ERROR_FAST, ErrorFast, "fast data phase bus error");
                vectors!(@line $instance, WAKEUP, SelfWakeup, "self wake up");
                vectors!(@line $instance, ECC, Ecc, "memory error");
                vectors!(@line $instance, MB_GROUP0, Mailboxes0, "mailbox group 0");
                vectors!(@line $instance, MB_GROUP1, Mailboxes1, "mailbox group 1");
                vectors!(@line $instance, MB_GROUP2, Mailboxes2, "mailbox group 2");
                vectors!(@line $instance, MB_GROUP3, Mailboxes3, "mailbox group 3");
            )+
        }
    };
}

vectors!(Can0, Can1, Can2, Can3, Can4, Can5, Can6, Can7);
