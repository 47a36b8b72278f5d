// Licensed under the Apache-2.0 license

//! Common types for the Serial IO I2C slave driver.
//!
//! This module provides the shared error taxonomy, the slave addressing
//! description and the bus configuration used across the driver.

use crate::i2c::poll::PollStrategy;

/// Raw address-width value selecting 7-bit addressing.
pub const I2C_7BIT_ADDRESS: u8 = 7;
/// Raw address-width value selecting 10-bit addressing.
pub const I2C_10BIT_ADDRESS: u8 = 10;

/// Negative status codes reported across the char/ioctl boundary.
pub mod status {
    pub const NO_MEMORY: i32 = -4;
    pub const INVALID_ARGS: i32 = -10;
    pub const BAD_STATE: i32 = -20;
    pub const TIMED_OUT: i32 = -23;
}

/// Driver error taxonomy.
///
/// Every variant except [`Error::BusTimeout`] is detected before any register
/// is written, so a failed call leaves the controller untouched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The slave has no live parent controller.
    DetachedDevice,
    /// The slave's address width is neither 7-bit nor 10-bit.
    InvalidAddressWidth,
    /// Fewer bytes remain in the ioctl input than a segment header needs.
    TruncatedHeader,
    /// A segment declares more bytes than remain in the ioctl input.
    SegmentOverrunsInput,
    /// The caller's output buffer cannot hold the declared read bytes.
    OutputBufferTooSmall,
    /// No room for the compiled segment list.
    AllocationFailure,
    /// The ioctl opcode is not one this device handles.
    UnsupportedIoctl,
    /// A bounded poll gave up waiting on the controller.
    BusTimeout,
}

impl Error {
    /// Status code reported to char/ioctl callers.
    #[must_use]
    pub fn status(self) -> i32 {
        match self {
            Error::DetachedDevice => status::BAD_STATE,
            Error::InvalidAddressWidth
            | Error::TruncatedHeader
            | Error::SegmentOverrunsInput
            | Error::OutputBufferTooSmall
            | Error::UnsupportedIoctl => status::INVALID_ARGS,
            Error::AllocationFailure => status::NO_MEMORY,
            Error::BusTimeout => status::TIMED_OUT,
        }
    }
}

/// Collapse a char/ioctl result into the signed convention of the device
/// protocol: a byte count on success, a negative status on failure.
#[must_use]
pub fn to_ssize(result: Result<usize, Error>) -> isize {
    match result {
        Ok(count) => isize::try_from(count).unwrap_or(isize::MAX),
        Err(err) => err.status() as isize,
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Error::DetachedDevice => "orphaned I2C slave",
            Error::InvalidAddressWidth => "bad address width",
            Error::TruncatedHeader => "truncated segment header",
            Error::SegmentOverrunsInput => "segment overruns input",
            Error::OutputBufferTooSmall => "output buffer too small",
            Error::AllocationFailure => "segment list exhausted",
            Error::UnsupportedIoctl => "unsupported ioctl",
            Error::BusTimeout => "bus poll timed out",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        embedded_hal::i2c::ErrorKind::Other
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::DetachedDevice => embedded_io::ErrorKind::NotConnected,
            Error::InvalidAddressWidth
            | Error::TruncatedHeader
            | Error::SegmentOverrunsInput
            | Error::OutputBufferTooSmall => embedded_io::ErrorKind::InvalidInput,
            Error::AllocationFailure => embedded_io::ErrorKind::OutOfMemory,
            Error::UnsupportedIoctl => embedded_io::ErrorKind::Unsupported,
            Error::BusTimeout => embedded_io::ErrorKind::TimedOut,
        }
    }
}

/// Target addressing mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddressWidth {
    SevenBit,
    TenBit,
}

impl TryFrom<u8> for AddressWidth {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            I2C_7BIT_ADDRESS => Ok(AddressWidth::SevenBit),
            I2C_10BIT_ADDRESS => Ok(AddressWidth::TenBit),
            _ => Err(Error::InvalidAddressWidth),
        }
    }
}

impl From<AddressWidth> for u8 {
    fn from(width: AddressWidth) -> u8 {
        match width {
            AddressWidth::SevenBit => I2C_7BIT_ADDRESS,
            AddressWidth::TenBit => I2C_10BIT_ADDRESS,
        }
    }
}

/// Address of one slave on the bus, fixed when the device is initialized.
///
/// The width is kept in its raw configuration form and only resolved to an
/// [`AddressWidth`] when a transfer starts, so a bad configuration surfaces as
/// [`Error::InvalidAddressWidth`] without touching the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlaveIdentity {
    address_width: u8,
    address: u16,
}

impl SlaveIdentity {
    #[must_use]
    pub const fn new(address_width: u8, address: u16) -> Self {
        Self {
            address_width,
            address,
        }
    }

    #[must_use]
    pub const fn seven_bit(address: u8) -> Self {
        Self::new(I2C_7BIT_ADDRESS, address as u16)
    }

    #[must_use]
    pub const fn ten_bit(address: u16) -> Self {
        Self::new(I2C_10BIT_ADDRESS, address)
    }

    #[must_use]
    pub const fn raw_width(&self) -> u8 {
        self.address_width
    }

    #[must_use]
    pub const fn address(&self) -> u16 {
        self.address
    }

    /// Resolve the configured width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddressWidth`] for any unrecognized width.
    pub fn width(&self) -> Result<AddressWidth, Error> {
        AddressWidth::try_from(self.address_width)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct BusConfig {
    pub poll: PollStrategy,
}

#[derive(Copy, Clone, Debug)]
pub struct BusConfigBuilder {
    poll: PollStrategy,
}

impl Default for BusConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll: PollStrategy::Spin,
        }
    }
    #[must_use]
    pub fn poll(mut self, poll: PollStrategy) -> Self {
        self.poll = poll;
        self
    }
    #[must_use]
    pub fn poll_limit(mut self, max_polls: u32) -> Self {
        self.poll = PollStrategy::Bounded(max_polls);
        self
    }
    #[must_use]
    pub fn build(self) -> BusConfig {
        BusConfig { poll: self.poll }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfigBuilder::new().build()
    }
}
