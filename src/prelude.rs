//! Traits needed to use the crate, imported anonymously
pub use crate::reg::RegisterAccess as _;
pub use embedded_can::Frame as _;
