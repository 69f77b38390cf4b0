#![no_std]
#![warn(missing_docs)]
//! # Z20K14x CAN
//!
//! ## Overview
//! This crate provides a HAL for the CAN controllers of the Z20K14x family.
//!
//! It provides the following features:
//!
//! - classical CAN and CAN FD with bitrate switching support
//! - per-region mailbox payload sizes of 8, 16, 32 or 64 bytes
//! - freeze mode discipline for every reconfiguration
//! - message transmission and reception through individual mailboxes
//! - message transmission cancellation
//! - message reception through the legacy Rx FIFO and its ID filter table
//! - global and individual acceptance masks
//! - error, bus off, wake up and memory error reporting
//! - interrupt dispatch to per-instance callback tables
//!
//! Eight instances, CAN0 to CAN7, are identified by [`InstanceId`]. CAN0 and
//! CAN1 implement 128 mailboxes, the others 64. Every instance is driven
//! through a [`Can`] context that owns a [`RegisterAccess`] backend, which is
//! [`Mmio`] on real silicon.
//!
//! ## General usage example
//!
//! ```no_run
//! use z20k14x_can::bus::Can;
//! use z20k14x_can::config::{BitTiming, CanConfig};
//! use z20k14x_can::embedded_can::{Id, StandardId};
//! use z20k14x_can::instance::InstanceId;
//! use z20k14x_can::interrupt::{Event, Interrupt};
//! use z20k14x_can::message::tx::{ClassicFrameType, FrameType, MessageBuilder};
//! use z20k14x_can::reg::Mmio;
//!
//! fn on_mailbox(can: &mut Can<Mmio>, event: Event) {
//!     if let Event::Mailbox(mb) = event {
//!         if let Ok(message) = can.mb_receive(mb) {
//!             // ...
//! #           let _ = message;
//!         }
//!     }
//! }
//!
//! // 500 kbit/s from a 40 MHz protocol engine clock
//! let timing = BitTiming {
//!     prop_seg: 7,
//!     phase_seg_1: 8,
//!     phase_seg_2: 4,
//!     prescaler: 4,
//!     sjw: 4,
//! };
//! let mut config = CanConfig::new(timing);
//! config.mailbox_count = 32;
//!
//! // Safety: CAN2 is not used anywhere else
//! let access = unsafe { Mmio::instance(InstanceId::Can2) };
//! let mut can = Can::new(InstanceId::Can2, access);
//! can.init(&config).unwrap();
//!
//! // Mailbox 0 receives ID 0x123, mailbox 1 transmits
//! let id = Id::Standard(StandardId::new(0x123).unwrap());
//! can.config_rx_mb(0, id).unwrap();
//! can.config_tx_mb(1).unwrap();
//!
//! can.install_callback(Interrupt::MailboxGroup0, on_mailbox);
//! can.set_mailbox_interrupt(0, true).unwrap();
//!
//! let message = MessageBuilder {
//!     id: Id::Standard(StandardId::new(0x100).unwrap()),
//!     frame_type: FrameType::Classic(ClassicFrameType::Data(&[1, 2, 3])),
//! }
//! .build()
//! .unwrap();
//! nb::block!(can.send(1, &message)).unwrap();
//! ```
//!
//! The interrupt handlers of the device forward their vector to the context
//! of the instance, see [`vector`].
//!
//! [`InstanceId`]: crate::instance::InstanceId
//! [`Can`]: crate::bus::Can
//! [`RegisterAccess`]: crate::reg::RegisterAccess
//! [`Mmio`]: crate::reg::Mmio

pub mod bus;
pub mod config;
pub mod filter;
pub mod instance;
pub mod interrupt;
pub mod mailbox;
pub mod message;
pub mod prelude;
pub mod reg;
pub mod rx_fifo;
pub mod vector;

#[cfg(test)]
mod sim;

pub use embedded_can;
