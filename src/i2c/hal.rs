// Licensed under the Apache-2.0 license

//! embedded-hal `I2c` on top of the transfer engine.
//!
//! Each `Operation` becomes one segment and the whole slice runs as a single
//! transaction under [`RestartPolicy::DirectionChange`]: adjacent operations
//! of the same type run back to back, and restart is asserted only where the
//! direction flips.

use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress, TenBitAddress};
use heapless::Vec;

use crate::common::NoOpLogger;
use crate::i2c::common::{AddressWidth, Error};
use crate::i2c::controller::BusController;
use crate::i2c::ioctl::MAX_SEGMENTS;
use crate::i2c::registers::RegisterInterface;
use crate::i2c::segment::Segment;
use crate::i2c::transfer::RestartPolicy;

impl<R: RegisterInterface> ErrorType for BusController<R> {
    type Error = Error;
}

impl<R: RegisterInterface> I2c<SevenBitAddress> for BusController<R> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        run_operations(self, AddressWidth::SevenBit, u16::from(address), operations)
    }
}

impl<R: RegisterInterface> I2c<TenBitAddress> for BusController<R> {
    fn transaction(
        &mut self,
        address: TenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        run_operations(self, AddressWidth::TenBit, address, operations)
    }
}

fn run_operations<R: RegisterInterface>(
    bus: &BusController<R>,
    width: AddressWidth,
    address: u16,
    operations: &mut [Operation<'_>],
) -> Result<(), Error> {
    let mut segments: Vec<Segment<'_>, MAX_SEGMENTS> = Vec::new();
    for op in operations.iter_mut() {
        segments
            .push(Segment::from(op))
            .map_err(|_| Error::AllocationFailure)?;
    }
    bus.transfer(
        width,
        address,
        RestartPolicy::DirectionChange,
        &mut segments,
        &mut NoOpLogger,
    )
}
