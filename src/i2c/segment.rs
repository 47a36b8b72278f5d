// Licensed under the Apache-2.0 license

//! Direction-uniform chunks of an I2C transaction.

use embedded_hal::i2c::Operation;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Write,
    Read,
}

/// One logical segment of a transaction.
///
/// Write segments borrow their input bytes, read segments borrow the region
/// their bytes land in. The slice length is the segment length.
#[derive(Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Write(&'a [u8]),
    Read(&'a mut [u8]),
}

impl Segment<'_> {
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Segment::Write(_) => Direction::Write,
            Segment::Read(_) => Direction::Read,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Segment::Write(buf) => buf.len(),
            Segment::Read(buf) => buf.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<&'a mut Operation<'_>> for Segment<'a> {
    fn from(op: &'a mut Operation<'_>) -> Self {
        match op {
            Operation::Write(bytes) => Segment::Write(*bytes),
            Operation::Read(buffer) => Segment::Read(&mut **buffer),
        }
    }
}
