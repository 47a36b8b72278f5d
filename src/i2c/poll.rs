// Licensed under the Apache-2.0 license

//! Waiting on controller status bits.
//!
//! The transfer engine never spins on a register directly; it hands a
//! predicate to a [`PollStrategy`]. [`PollStrategy::Spin`] waits forever, so a
//! wedged controller hangs the caller. [`PollStrategy::Bounded`] is the hook
//! for layering a timeout on top of the engine.

use crate::i2c::common::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollStrategy {
    /// Re-evaluate the predicate until it holds, with no upper bound.
    Spin,
    /// Give up with [`Error::BusTimeout`] after this many failed evaluations.
    Bounded(u32),
}

impl PollStrategy {
    /// Block until `ready` returns true.
    ///
    /// # Errors
    ///
    /// Only [`PollStrategy::Bounded`] fails, with [`Error::BusTimeout`].
    pub fn wait<F: FnMut() -> bool>(self, mut ready: F) -> Result<(), Error> {
        match self {
            PollStrategy::Spin => {
                while !ready() {
                    core::hint::spin_loop();
                }
                Ok(())
            }
            PollStrategy::Bounded(max_polls) => {
                for _ in 0..max_polls {
                    if ready() {
                        return Ok(());
                    }
                    core::hint::spin_loop();
                }
                Err(Error::BusTimeout)
            }
        }
    }
}
