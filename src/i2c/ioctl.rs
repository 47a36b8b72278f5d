// Licensed under the Apache-2.0 license

//! Ioctl request compiler.
//!
//! Turns the packed, caller-supplied `TRANSFER` buffer into a segment list
//! without copying any payload. The wire form is a run of records, each a
//! [`RawSegmentHeader`] optionally followed by payload:
//!
//! ```text
//! +----------+----------+------------------------+
//! | read u32 | len u32  | len payload bytes      |  write record (read == 0)
//! +----------+----------+------------------------+
//! | read u32 | len u32  |                           read record (read != 0)
//! +----------+----------+
//! ```
//!
//! Fields are native-endian. There is no terminator: the list ends where the
//! input ends, and a trailing partial record is an error.
//!
//! Compilation is two passes over the same immutable input. The first pass
//! validates every header against the bytes that remain and sizes the
//! request; nothing is built unless it succeeds. The second pass builds the
//! segments: write segments point straight at their inline payload, read
//! segments take back-to-back regions of the output buffer in request order.

use heapless::Vec;
use zerocopy::byteorder::native_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::i2c::common::Error;
use crate::i2c::segment::Segment;

/// The one ioctl opcode an I2C slave device answers.
pub const IOCTL_I2C_SLAVE_TRANSFER: u32 = 0x0000_2405;

/// Default bound on segments per compiled request.
pub const MAX_SEGMENTS: usize = 32;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum IoctlOp {
    Transfer = IOCTL_I2C_SLAVE_TRANSFER,
}

impl TryFrom<u32> for IoctlOp {
    type Error = Error;

    fn try_from(op: u32) -> Result<Self, Self::Error> {
        match op {
            IOCTL_I2C_SLAVE_TRANSFER => Ok(IoctlOp::Transfer),
            _ => Err(Error::UnsupportedIoctl),
        }
    }
}

/// Fixed header of one wire record.
#[derive(Copy, Clone, Debug, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RawSegmentHeader {
    read: U32,
    len: U32,
}

pub const HEADER_LEN: usize = core::mem::size_of::<RawSegmentHeader>();

impl RawSegmentHeader {
    #[must_use]
    pub fn new(read: bool, len: u32) -> Self {
        Self {
            read: U32::new(u32::from(read)),
            len: U32::new(len),
        }
    }

    #[must_use]
    pub fn is_read(&self) -> bool {
        self.read.get() != 0
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.len.get()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One validated wire record.
enum Record<'a> {
    Write(&'a [u8]),
    Read(usize),
}

/// Walks the wire records of an input buffer.
///
/// Yields an error at most once and then stops.
struct Records<'a> {
    rest: &'a [u8],
}

impl<'a> Records<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { rest: input }
    }

    fn fail(&mut self, err: Error) -> Option<Result<Record<'a>, Error>> {
        self.rest = &[];
        Some(Err(err))
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let Ok((header, tail)) = RawSegmentHeader::ref_from_prefix(self.rest) else {
            return self.fail(Error::TruncatedHeader);
        };
        let Ok(len) = usize::try_from(header.len()) else {
            return self.fail(Error::SegmentOverrunsInput);
        };

        if header.is_read() {
            self.rest = tail;
            return Some(Ok(Record::Read(len)));
        }
        match tail.split_at_checked(len) {
            Some((payload, rest)) => {
                self.rest = rest;
                Some(Ok(Record::Write(payload)))
            }
            None => self.fail(Error::SegmentOverrunsInput),
        }
    }
}

/// Totals gathered by the validation pass.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Survey {
    segments: usize,
    read_total: usize,
    write_total: usize,
}

fn survey(input: &[u8]) -> Result<Survey, Error> {
    let mut survey = Survey::default();
    for record in Records::new(input) {
        match record? {
            Record::Write(payload) => {
                survey.write_total = survey.write_total.saturating_add(payload.len());
            }
            Record::Read(len) => {
                survey.read_total = survey.read_total.saturating_add(len);
            }
        }
        survey.segments += 1;
    }
    Ok(survey)
}

fn build<'a, const N: usize>(
    input: &'a [u8],
    output: &'a mut [u8],
) -> Result<Vec<Segment<'a>, N>, Error> {
    let mut segments = Vec::new();
    let mut cursor = output;
    for record in Records::new(input) {
        let segment = match record? {
            Record::Write(payload) => Segment::Write(payload),
            Record::Read(len) => {
                let (region, rest) = core::mem::take(&mut cursor)
                    .split_at_mut_checked(len)
                    .ok_or(Error::OutputBufferTooSmall)?;
                cursor = rest;
                Segment::Read(region)
            }
        };
        segments
            .push(segment)
            .map_err(|_| Error::AllocationFailure)?;
    }
    Ok(segments)
}

/// A fully validated ioctl request, ready for the transfer engine.
///
/// Only [`CompiledRequest::compile`] produces one, so holding a value means
/// both passes succeeded.
#[derive(Debug)]
pub struct CompiledRequest<'a, const N: usize = MAX_SEGMENTS> {
    segments: Vec<Segment<'a>, N>,
    read_total: usize,
    write_total: usize,
}

impl<'a, const N: usize> CompiledRequest<'a, N> {
    /// Validate `input` and lay its segments over `input` and `output`.
    ///
    /// The output buffer must hold every read record's bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedHeader`] when fewer than [`HEADER_LEN`] bytes remain at a record start.
    /// - [`Error::SegmentOverrunsInput`] when a write payload runs past the input.
    /// - [`Error::OutputBufferTooSmall`] when `output` is shorter than the read total.
    /// - [`Error::AllocationFailure`] when the request has more than `N` segments.
    pub fn compile(input: &'a [u8], output: &'a mut [u8]) -> Result<Self, Error> {
        let survey = survey(input)?;
        if output.len() < survey.read_total {
            return Err(Error::OutputBufferTooSmall);
        }
        if survey.segments > N {
            return Err(Error::AllocationFailure);
        }

        let segments = build::<N>(input, output)?;
        debug_assert_eq!(segments.len(), survey.segments);
        Ok(Self {
            segments,
            read_total: survey.read_total,
            write_total: survey.write_total,
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment<'a>] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment<'a>] {
        &mut self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of all read record lengths.
    #[must_use]
    pub fn read_total(&self) -> usize {
        self.read_total
    }

    /// Sum of all write record lengths. This is the ioctl's success value.
    #[must_use]
    pub fn write_total(&self) -> usize {
        self.write_total
    }
}

/// Encodes a `TRANSFER` input buffer into a fixed-capacity byte vector.
#[derive(Debug, Default)]
pub struct RequestBuilder<const CAP: usize> {
    bytes: Vec<u8, CAP>,
}

impl<const CAP: usize> RequestBuilder<CAP> {
    #[must_use]
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append a write record carrying `payload` inline.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`] if the record does not fit.
    pub fn write(&mut self, payload: &[u8]) -> Result<&mut Self, Error> {
        let len = u32::try_from(payload.len()).map_err(|_| Error::AllocationFailure)?;
        self.push(RawSegmentHeader::new(false, len).as_bytes())?;
        self.push(payload)?;
        Ok(self)
    }

    /// Append a read record for `len` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::AllocationFailure`] if the header does not fit.
    pub fn read(&mut self, len: u32) -> Result<&mut Self, Error> {
        self.push(RawSegmentHeader::new(true, len).as_bytes())?;
        Ok(self)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn push(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.bytes
            .extend_from_slice(bytes)
            .map_err(|()| Error::AllocationFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::segment::Direction;
    use hex_literal::hex;
    use proptest::prelude::*;

    fn offset_in(input: &[u8], part: &[u8]) -> usize {
        part.as_ptr() as usize - input.as_ptr() as usize
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn single_write_record_compiles_in_place() {
        let input = hex!("00000000 03000000 102030");
        let mut output = [0u8; 0];

        let request = CompiledRequest::<4>::compile(&input, &mut output).unwrap();

        assert_eq!(request.len(), 1);
        assert_eq!(request.write_total(), 3);
        assert_eq!(request.read_total(), 0);
        match &request.segments()[0] {
            Segment::Write(payload) => {
                assert_eq!(*payload, &[0x10, 0x20, 0x30]);
                assert_eq!(offset_in(&input, payload), HEADER_LEN);
            }
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn write_then_read_lays_out_output() {
        let mut builder = RequestBuilder::<64>::new();
        builder.write(&[0xaa]).unwrap().read(2).unwrap();
        let mut output = [0u8; 2];
        let output_start = output.as_ptr() as usize;

        let request = CompiledRequest::<4>::compile(builder.as_bytes(), &mut output).unwrap();

        let directions: std::vec::Vec<Direction> =
            request.segments().iter().map(Segment::direction).collect();
        assert_eq!(directions, [Direction::Write, Direction::Read]);
        assert_eq!(request.write_total(), 1);
        match &request.segments()[1] {
            Segment::Read(region) => {
                assert_eq!(region.len(), 2);
                assert_eq!(region.as_ptr() as usize, output_start);
            }
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_an_empty_request() {
        let request = CompiledRequest::<4>::compile(&[], &mut []).unwrap();
        assert!(request.is_empty());
        assert_eq!(request.write_total(), 0);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let mut builder = RequestBuilder::<64>::new();
        builder.write(&[1, 2]).unwrap().read(1).unwrap();
        let bytes = builder.as_bytes();
        let cut = &bytes[..bytes.len() - 3];

        let mut output = [0u8; 8];
        let result = CompiledRequest::<4>::compile(cut, &mut output);
        assert_eq!(result.unwrap_err(), Error::TruncatedHeader);
    }

    #[test]
    fn overlong_write_is_rejected() {
        let mut builder = RequestBuilder::<64>::new();
        builder.write(&[1, 2, 3, 4]).unwrap();
        let bytes = builder.as_bytes();

        let result = CompiledRequest::<4>::compile(&bytes[..bytes.len() - 1], &mut []);
        assert_eq!(result.unwrap_err(), Error::SegmentOverrunsInput);
    }

    #[test]
    fn huge_declared_write_length_is_rejected() {
        let header = RawSegmentHeader::new(false, u32::MAX);
        let result = CompiledRequest::<4>::compile(header.as_bytes(), &mut []);
        assert_eq!(result.unwrap_err(), Error::SegmentOverrunsInput);
    }

    #[test]
    fn output_gate_uses_read_total() {
        let mut builder = RequestBuilder::<64>::new();
        builder.read(4).unwrap().write(&[9]).unwrap().read(4).unwrap();

        let mut short = [0u8; 7];
        let result = CompiledRequest::<4>::compile(builder.as_bytes(), &mut short);
        assert_eq!(result.unwrap_err(), Error::OutputBufferTooSmall);

        let mut output = [0u8; 8];
        let request = CompiledRequest::<4>::compile(builder.as_bytes(), &mut output).unwrap();
        assert_eq!(request.read_total(), 8);
        assert_eq!(request.write_total(), 1);
    }

    #[test]
    fn too_many_segments_is_allocation_failure() {
        let mut builder = RequestBuilder::<64>::new();
        builder.read(0).unwrap().read(0).unwrap().read(0).unwrap();

        let result = CompiledRequest::<2>::compile(builder.as_bytes(), &mut []);
        assert_eq!(result.unwrap_err(), Error::AllocationFailure);
    }

    #[test]
    fn builder_overflow_is_reported() {
        let mut builder = RequestBuilder::<10>::new();
        assert_eq!(builder.write(&[1, 2, 3]).unwrap_err(), Error::AllocationFailure);
    }

    #[test]
    fn opcode_dispatch() {
        assert_eq!(IoctlOp::try_from(IOCTL_I2C_SLAVE_TRANSFER), Ok(IoctlOp::Transfer));
        assert_eq!(IoctlOp::try_from(0), Err(Error::UnsupportedIoctl));
    }

    #[derive(Clone, Debug)]
    enum WireRecord {
        Write(std::vec::Vec<u8>),
        Read(u8),
    }

    fn wire_records() -> impl Strategy<Value = std::vec::Vec<WireRecord>> {
        prop::collection::vec(
            prop_oneof![
                prop::collection::vec(any::<u8>(), 0..6).prop_map(WireRecord::Write),
                (0u8..6).prop_map(WireRecord::Read),
            ],
            0..8,
        )
    }

    fn encode(records: &[WireRecord]) -> RequestBuilder<512> {
        let mut builder = RequestBuilder::new();
        for record in records {
            match record {
                WireRecord::Write(payload) => builder.write(payload).unwrap(),
                WireRecord::Read(len) => builder.read(u32::from(*len)).unwrap(),
            };
        }
        builder
    }

    proptest! {
        #[test]
        fn compiled_layout_matches_records(records in wire_records()) {
            let builder = encode(&records);
            let input = builder.as_bytes();
            let read_total: usize = records
                .iter()
                .map(|r| match r { WireRecord::Read(len) => usize::from(*len), WireRecord::Write(_) => 0 })
                .sum();
            let mut output = vec![0u8; read_total];
            let output_start = output.as_ptr() as usize;

            let request = CompiledRequest::<8>::compile(input, &mut output).unwrap();
            prop_assert_eq!(request.len(), records.len());
            prop_assert_eq!(request.read_total(), read_total);

            let mut input_offset = 0;
            let mut output_offset = 0;
            for (record, segment) in records.iter().zip(request.segments()) {
                match (record, segment) {
                    (WireRecord::Write(payload), Segment::Write(bytes)) => {
                        prop_assert_eq!(offset_in(input, bytes), input_offset + HEADER_LEN);
                        prop_assert_eq!(*bytes, payload.as_slice());
                        input_offset += HEADER_LEN + payload.len();
                    }
                    (WireRecord::Read(len), Segment::Read(region)) => {
                        prop_assert_eq!(region.len(), usize::from(*len));
                        prop_assert_eq!(region.as_ptr() as usize, output_start + output_offset);
                        output_offset += usize::from(*len);
                        input_offset += HEADER_LEN;
                    }
                    _ => prop_assert!(false, "direction mismatch"),
                }
            }
            prop_assert_eq!(input_offset, input.len());
        }

        #[test]
        fn truncation_is_classified(records in wire_records(), cut in any::<prop::sample::Index>()) {
            let builder = encode(&records);
            let input = builder.as_bytes();
            prop_assume!(!input.is_empty());
            let cut = cut.index(input.len());

            // Where does `cut` fall relative to record boundaries?
            let mut start = 0;
            let mut expected = Ok(());
            for record in &records {
                let end = start + HEADER_LEN + match record {
                    WireRecord::Write(payload) => payload.len(),
                    WireRecord::Read(_) => 0,
                };
                if cut == start {
                    break;
                }
                if cut < start + HEADER_LEN {
                    expected = Err(Error::TruncatedHeader);
                    break;
                }
                if cut < end {
                    expected = Err(Error::SegmentOverrunsInput);
                    break;
                }
                start = end;
            }

            let mut output = [0u8; 64];
            let result = CompiledRequest::<8>::compile(&input[..cut], &mut output).map(|_| ());
            prop_assert_eq!(result, expected);
        }
    }
}
