// Licensed under the Apache-2.0 license

//! Transfer engine: drives one multi-segment transaction through the
//! controller registers while the bus lock is held.
//!
//! Command-word flag placement:
//! - restart placement follows a [`RestartPolicy`]. Char and ioctl requests
//!   use [`RestartPolicy::SameDirection`]; the embedded-hal surface uses
//!   [`RestartPolicy::DirectionChange`].
//! - stop is asserted once per transaction, on the last byte of the last
//!   segment that carries any bytes.

use crate::common::Logger;
use crate::i2c::common::{AddressWidth, Error, SlaveIdentity};
use crate::i2c::controller::BusController;
use crate::i2c::poll::PollStrategy;
use crate::i2c::registers::{CommandKind, DataCommand, RegisterInterface};
use crate::i2c::segment::{Direction, Segment};

/// Which segment boundaries assert restart on the segment's first byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart when a segment keeps the direction of the segment before it.
    /// The first segment compares against itself, so it always restarts.
    SameDirection,
    /// Restart only where the direction changes between segments that carry
    /// bytes. Adjacent same-direction segments run back to back.
    DirectionChange,
}

impl RestartPolicy {
    fn initial(self, segments: &[Segment<'_>]) -> Option<Direction> {
        match self {
            RestartPolicy::SameDirection => segments.first().map(Segment::direction),
            RestartPolicy::DirectionChange => None,
        }
    }

    fn restart(self, previous: Option<Direction>, next: Direction) -> bool {
        match self {
            RestartPolicy::SameDirection => previous == Some(next),
            RestartPolicy::DirectionChange => previous.is_some_and(|prev| prev != next),
        }
    }

    /// Whether `segment` becomes the reference for the next boundary.
    fn tracks(self, segment: &Segment<'_>) -> bool {
        match self {
            RestartPolicy::SameDirection => true,
            RestartPolicy::DirectionChange => !segment.is_empty(),
        }
    }
}

/// Run `segments` against the slave described by `slave` as one transaction.
///
/// An empty segment list still performs the bus handshake and drains, but
/// issues no command words.
///
/// # Errors
///
/// - [`Error::DetachedDevice`] when `controller` is `None`.
/// - [`Error::InvalidAddressWidth`] when the slave's width is unrecognized.
/// - [`Error::BusTimeout`] only under [`PollStrategy::Bounded`].
///
/// The first two are reported before the bus lock is taken or any register is
/// accessed.
pub fn transfer<R, L>(
    controller: Option<&BusController<R>>,
    slave: &SlaveIdentity,
    segments: &mut [Segment<'_>],
    logger: &mut L,
) -> Result<(), Error>
where
    R: RegisterInterface,
    L: Logger,
{
    let Some(controller) = controller else {
        logger.error("Orphaned I2C slave.");
        return Err(Error::DetachedDevice);
    };
    let width = slave.width().inspect_err(|_| logger.error("Bad address width."))?;
    controller.transfer(
        width,
        slave.address(),
        RestartPolicy::SameDirection,
        segments,
        logger,
    )
}

/// Register sequencing for one transaction. The caller holds the bus lock.
pub(crate) fn run<R, L>(
    regs: &mut R,
    poll: PollStrategy,
    width: AddressWidth,
    address: u16,
    policy: RestartPolicy,
    segments: &mut [Segment<'_>],
    logger: &mut L,
) -> Result<(), Error>
where
    R: RegisterInterface,
    L: Logger,
{
    logger.debug("i2c transfer start");
    wait_idle(regs, poll)?;

    regs.set_addressing_mode(width);
    regs.set_target_address(width, address);
    regs.enable();

    let stop_segment = segments.iter().rposition(|segment| !segment.is_empty());
    let mut last_direction = policy.initial(segments);

    for (index, segment) in segments.iter_mut().enumerate() {
        let direction = segment.direction();
        let tracked = policy.tracks(segment);
        let mut restart = policy.restart(last_direction, direction);
        let final_segment = stop_segment == Some(index);

        match segment {
            Segment::Write(bytes) => {
                let count = bytes.len();
                for (offset, &byte) in bytes.iter().enumerate() {
                    poll.wait(|| regs.status().tx_fifo_not_full())?;
                    regs.write_command(DataCommand {
                        kind: CommandKind::Write(byte),
                        restart: core::mem::take(&mut restart),
                        stop: final_segment && offset + 1 == count,
                    });
                }
            }
            Segment::Read(buffer) => {
                let count = buffer.len();
                for (offset, slot) in buffer.iter_mut().enumerate() {
                    regs.write_command(DataCommand {
                        kind: CommandKind::Read,
                        restart: core::mem::take(&mut restart),
                        stop: final_segment && offset + 1 == count,
                    });
                    poll.wait(|| regs.status().rx_fifo_not_empty())?;
                    *slot = regs.read_data();
                }
            }
        }

        if tracked {
            last_direction = Some(direction);
        }
    }

    while regs.stop_detect_pending() {
        regs.clear_stop_detect();
    }

    // Idle is polled twice after the drain.
    wait_idle(regs, poll)?;
    wait_idle(regs, poll)?;

    // Leave the RX FIFO empty for the next caller.
    while regs.status().rx_fifo_not_empty() {
        let _ = regs.read_data();
    }

    logger.debug("i2c transfer complete");
    Ok(())
}

fn wait_idle<R: RegisterInterface>(regs: &mut R, poll: PollStrategy) -> Result<(), Error> {
    poll.wait(|| regs.status().is_idle())
}
