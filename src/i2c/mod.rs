// Licensed under the Apache-2.0 license

//! Serial IO I2C slave driver.
//!
//! The transaction core of an I2C slave device sitting beneath a
//! DesignWare-compatible controller: a transfer engine that turns an ordered
//! list of read/write segments into register-level bus traffic under a
//! per-controller bus lock, and an ioctl compiler that turns untrusted packed
//! request buffers into that segment list.

pub mod common;
pub mod controller;
pub mod hal;
pub mod ioctl;
pub mod poll;
pub mod registers;
pub mod segment;
pub mod slave;
pub mod transfer;

#[cfg(test)]
pub(crate) mod mock;

pub use common::{AddressWidth, BusConfig, BusConfigBuilder, Error, SlaveIdentity};
pub use controller::BusController;
pub use ioctl::{CompiledRequest, IoctlOp, RequestBuilder, IOCTL_I2C_SLAVE_TRANSFER};
pub use poll::PollStrategy;
pub use registers::{MmioRegisters, RegisterInterface};
pub use segment::{Direction, Segment};
pub use slave::{DeviceRegistrar, SlaveDevice};
pub use transfer::RestartPolicy;
