// Licensed under the Apache-2.0 license

//! I2C slave devices: the char-device and ioctl entry points.
//!
//! A [`SlaveDevice`] is one addressable target hanging off a
//! [`BusController`]. Its `read`/`write` entry points are single-segment
//! transfers; the `TRANSFER` ioctl compiles a packed multi-segment request and
//! runs it as one transaction.

use core::fmt::Write as _;

use heapless::String;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{Error, SlaveIdentity};
use crate::i2c::controller::BusController;
use crate::i2c::ioctl::{CompiledRequest, IoctlOp, MAX_SEGMENTS};
use crate::i2c::registers::RegisterInterface;
use crate::i2c::segment::Segment;
use crate::i2c::transfer;

/// Room for a `{:04x}` formatted 16-bit address.
pub const NAME_LEN: usize = 4;

/// The driver framework's device registration step.
pub trait DeviceRegistrar {
    type Error;

    /// Publish a device under `name`.
    ///
    /// # Errors
    ///
    /// Whatever the framework reports; it is handed back to the caller as is.
    fn register(&mut self, name: &str) -> Result<(), Self::Error>;
}

pub struct SlaveDevice<'a, R, L = NoOpLogger, const N: usize = MAX_SEGMENTS>
where
    R: RegisterInterface,
    L: Logger,
{
    parent: Option<&'a BusController<R>>,
    identity: SlaveIdentity,
    name: String<NAME_LEN>,
    logger: L,
}

impl<'a, R, L, const N: usize> SlaveDevice<'a, R, L, N>
where
    R: RegisterInterface,
    L: Logger,
{
    /// Create and register the slave at `address` on `parent`.
    ///
    /// The width is stored as given; an unrecognized value is reported by the
    /// first transfer.
    ///
    /// # Errors
    ///
    /// Propagates the registrar's error unchanged.
    pub fn init<G: DeviceRegistrar>(
        parent: &'a BusController<R>,
        address_width: u8,
        address: u16,
        registrar: &mut G,
        logger: L,
    ) -> Result<Self, G::Error> {
        let mut name = String::new();
        // Four hex digits always fit.
        let _ = write!(name, "{address:04x}");
        registrar.register(&name)?;

        Ok(Self {
            parent: Some(parent),
            identity: SlaveIdentity::new(address_width, address),
            name,
            logger,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn identity(&self) -> SlaveIdentity {
        self.identity
    }

    #[must_use]
    pub fn parent(&self) -> Option<&'a BusController<R>> {
        self.parent
    }

    /// Drop the link to the parent controller. Later transfers fail with
    /// [`Error::DetachedDevice`].
    pub fn detach(&mut self) {
        self.parent = None;
    }

    /// Run `segments` as one transaction.
    ///
    /// # Errors
    ///
    /// See [`transfer::transfer`].
    pub fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<(), Error> {
        transfer::transfer(self.parent, &self.identity, segments, &mut self.logger)
    }

    /// Read `buf.len()` bytes from the slave. Returns the requested count.
    ///
    /// # Errors
    ///
    /// Any transfer error.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let count = buf.len();
        self.transfer(&mut [Segment::Read(buf)])?;
        Ok(count)
    }

    /// Write all of `buf` to the slave. Returns the requested count.
    ///
    /// # Errors
    ///
    /// Any transfer error.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.transfer(&mut [Segment::Write(buf)])?;
        Ok(buf.len())
    }

    /// Dispatch an ioctl.
    ///
    /// For `TRANSFER`, `input` holds the packed request and `output` receives
    /// every read record's bytes in request order. The success value is the
    /// request's write total.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedIoctl`] for unknown opcodes, any compile error
    /// (reported before the controller is touched), or any transfer error.
    pub fn ioctl(&mut self, op: u32, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        match IoctlOp::try_from(op)? {
            IoctlOp::Transfer => self.transfer_ioctl(input, output),
        }
    }

    fn transfer_ioctl(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
        let mut request = CompiledRequest::<N>::compile(input, output)
            .inspect_err(|_| self.logger.error("Malformed I2C transfer request."))?;
        self.transfer(request.segments_mut())?;
        Ok(request.write_total())
    }
}

impl<R, L, const N: usize> embedded_io::ErrorType for SlaveDevice<'_, R, L, N>
where
    R: RegisterInterface,
    L: Logger,
{
    type Error = Error;
}

impl<R, L, const N: usize> embedded_io::Read for SlaveDevice<'_, R, L, N>
where
    R: RegisterInterface,
    L: Logger,
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        SlaveDevice::read(self, buf)
    }
}

impl<R, L, const N: usize> embedded_io::Write for SlaveDevice<'_, R, L, N>
where
    R: RegisterInterface,
    L: Logger,
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        SlaveDevice::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
