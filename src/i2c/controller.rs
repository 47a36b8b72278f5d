// Licensed under the Apache-2.0 license

//! Bus controller: owns the register block behind the bus lock.
//!
//! One [`BusController`] exists per physical controller. Slave devices hold a
//! shared reference to it; every transfer takes the lock before the first
//! idle wait and releases it after the final RX drain, so command words of
//! two callers never interleave. The lock is a spin lock and is not
//! reentrant.

use crate::common::Logger;
use crate::i2c::common::{AddressWidth, BusConfig, Error};
use crate::i2c::poll::PollStrategy;
use crate::i2c::registers::RegisterInterface;
use crate::i2c::segment::Segment;
use crate::i2c::transfer::{self, RestartPolicy};

pub struct BusController<R: RegisterInterface> {
    bus: spin::Mutex<R>,
    poll: PollStrategy,
}

impl<R: RegisterInterface> BusController<R> {
    pub fn new(regs: R, config: BusConfig) -> Self {
        Self {
            bus: spin::Mutex::new(regs),
            poll: config.poll,
        }
    }

    /// Run one transaction with the bus lock held for its whole duration.
    ///
    /// # Errors
    ///
    /// [`Error::BusTimeout`] if a bounded poll gives up; the lock is released
    /// on that path too.
    pub fn transfer<L: Logger>(
        &self,
        width: AddressWidth,
        address: u16,
        restart: RestartPolicy,
        segments: &mut [Segment<'_>],
        logger: &mut L,
    ) -> Result<(), Error> {
        let mut regs = self.bus.lock();
        transfer::run(&mut *regs, self.poll, width, address, restart, segments, logger)
            .inspect_err(|_| logger.error("i2c transfer aborted"))
    }

    /// Whether another caller currently owns the bus.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.bus.is_locked()
    }

    pub fn into_inner(self) -> R {
        self.bus.into_inner()
    }
}
