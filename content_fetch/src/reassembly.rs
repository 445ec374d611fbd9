use std::collections::BTreeMap;
use std::io;

use tracing::{debug, trace};

use crate::error::{ContentFetchError, Result};
use crate::interfaces::OutputSink;
use crate::segment::{Segment, SegmentNumber, ValidationState};

/// Where an accepted segment ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// The segment extended the output; `count` segments were flushed including drained ones.
    Flushed { count: usize },
    /// Held until the gap before it is filled.
    Buffered,
    /// Already flushed earlier; dropped.
    Duplicate,
}

/// Run-scoped reorder state: the segments waiting on a gap and the next sequence number that
/// extends the flushed output.
///
/// Every segment in `pending` has a sequence number strictly greater than `next_expected`.
#[derive(Debug, Default)]
pub(crate) struct ReassemblyBuffer {
    pending: BTreeMap<SegmentNumber, Segment>,
    next_expected: SegmentNumber,
    segments_flushed: u64,
    bytes_flushed: u64,
    final_segment: Option<SegmentNumber>,
}

impl ReassemblyBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Places an accepted segment, flushing it and any now-contiguous buffered segments.
    pub(crate) fn insert(&mut self, segment: Segment, sink: &mut dyn OutputSink) -> io::Result<Placement> {
        debug_assert_eq!(segment.state(), ValidationState::Accepted);

        if let Some(final_segment) = segment.final_segment() {
            self.set_final_segment(final_segment);
        }

        let number = segment.number();
        if number < self.next_expected {
            return Ok(Placement::Duplicate);
        }

        if number > self.next_expected {
            trace!(segment = number, next_expected = self.next_expected, "buffering out of order segment");
            self.pending.insert(number, segment);
            return Ok(Placement::Buffered);
        }

        self.flush_one(&segment, sink)?;
        let drained = self.flush_contiguous(sink)?;
        Ok(Placement::Flushed { count: 1 + drained })
    }

    /// Records the announced last segment and discards anything buffered beyond it.
    fn set_final_segment(&mut self, final_segment: SegmentNumber) {
        // The bound only ever tightens.
        let final_segment = self.final_segment.map_or(final_segment, |known| known.min(final_segment));
        self.final_segment = Some(final_segment);
        if let Some(first_beyond) = final_segment.checked_add(1) {
            let beyond = self.pending.split_off(&first_beyond);
            if !beyond.is_empty() {
                debug!(final_segment, discarded = beyond.len(), "discarding buffered segments past the final segment");
            }
        }
    }

    /// Returns why `segment` cannot belong to the object, given the final-segment marker known so
    /// far and the one the segment itself carries.
    pub(crate) fn out_of_range(&self, segment: &Segment) -> Option<String> {
        let number = segment.number();
        if let Some(own_final) = segment.final_segment() {
            if number > own_final {
                return Some(format!("segment {number} lies past its own final-segment marker {own_final}"));
            }
        }
        match self.final_segment {
            Some(final_segment) if number > final_segment => {
                Some(format!("segment {number} lies past the announced final segment {final_segment}"))
            },
            _ => None,
        }
    }

    fn flush_contiguous(&mut self, sink: &mut dyn OutputSink) -> io::Result<usize> {
        let mut count = 0;
        while let Some(segment) = self.pending.remove(&self.next_expected) {
            if let Err(e) = self.flush_one(&segment, sink) {
                self.pending.insert(segment.number(), segment);
                return Err(e);
            }
            count += 1;
        }
        Ok(count)
    }

    fn flush_one(&mut self, segment: &Segment, sink: &mut dyn OutputSink) -> io::Result<()> {
        sink.write_segment(segment.payload())?;
        self.next_expected += 1;
        self.segments_flushed += 1;
        self.bytes_flushed += segment.len() as u64;
        Ok(())
    }

    /// Verifies that nothing is missing once no further segments will arrive.
    pub(crate) fn check_complete(&self) -> Result<()> {
        let tail_missing = self
            .final_segment
            .is_some_and(|final_segment| self.next_expected != final_segment.saturating_add(1));

        if !self.pending.is_empty() || tail_missing {
            return Err(ContentFetchError::IncompleteObject {
                next_expected: self.next_expected,
                buffered: self.pending.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn next_expected(&self) -> SegmentNumber {
        self.next_expected
    }

    pub(crate) fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn segments_flushed(&self) -> u64 {
        self.segments_flushed
    }

    pub(crate) fn bytes_flushed(&self) -> u64 {
        self.bytes_flushed
    }

    pub(crate) fn final_segment(&self) -> Option<SegmentNumber> {
        self.final_segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(number: SegmentNumber, payload: &'static str) -> Segment {
        Segment::new(number, payload).mark(ValidationState::Accepted)
    }

    #[test]
    fn test_in_order_segments_flush_immediately() {
        let mut sink = Vec::new();
        let mut buffer = ReassemblyBuffer::new();

        assert_eq!(buffer.insert(accepted(0, "AB"), &mut sink).unwrap(), Placement::Flushed { count: 1 });
        assert_eq!(buffer.insert(accepted(1, "CD"), &mut sink).unwrap(), Placement::Flushed { count: 1 });

        assert_eq!(sink, b"ABCD");
        assert_eq!(buffer.next_expected(), 2);
        assert_eq!(buffer.bytes_flushed(), 4);
        buffer.check_complete().unwrap();
    }

    #[test]
    fn test_gap_fill_drains_buffer() {
        let mut sink = Vec::new();
        let mut buffer = ReassemblyBuffer::new();

        assert_eq!(buffer.insert(accepted(2, "EF"), &mut sink).unwrap(), Placement::Buffered);
        assert_eq!(buffer.insert(accepted(1, "CD"), &mut sink).unwrap(), Placement::Buffered);
        assert!(sink.is_empty());
        assert_eq!(buffer.buffered(), 2);

        assert_eq!(buffer.insert(accepted(0, "AB"), &mut sink).unwrap(), Placement::Flushed { count: 3 });
        assert_eq!(sink, b"ABCDEF");
        assert_eq!(buffer.buffered(), 0);
        assert_eq!(buffer.next_expected(), 3);
    }

    #[test]
    fn test_duplicates() {
        let mut sink = Vec::new();
        let mut buffer = ReassemblyBuffer::new();

        buffer.insert(accepted(0, "AB"), &mut sink).unwrap();
        assert_eq!(buffer.insert(accepted(0, "AB"), &mut sink).unwrap(), Placement::Duplicate);

        // A later copy of a buffered segment replaces the earlier one.
        assert_eq!(buffer.insert(accepted(2, "xx"), &mut sink).unwrap(), Placement::Buffered);
        assert_eq!(buffer.insert(accepted(2, "EF"), &mut sink).unwrap(), Placement::Buffered);
        assert_eq!(buffer.buffered(), 1);

        buffer.insert(accepted(1, "CD"), &mut sink).unwrap();
        assert_eq!(sink, b"ABCDEF");
    }

    #[test]
    fn test_gap_reported_on_completion() {
        let mut sink = Vec::new();
        let mut buffer = ReassemblyBuffer::new();

        for (n, p) in [(0, "AB"), (1, "CD"), (3, "GH")] {
            buffer.insert(accepted(n, p), &mut sink).unwrap();
        }

        let err = buffer.check_complete().unwrap_err();
        assert!(matches!(err, ContentFetchError::IncompleteObject { next_expected: 2, buffered: 1 }));
        assert_eq!(sink, b"ABCD");
    }

    #[test]
    fn test_missing_tail_detected_from_final_segment() {
        let mut sink = Vec::new();
        let mut buffer = ReassemblyBuffer::new();

        buffer.insert(accepted(0, "AB").with_final_segment(2), &mut sink).unwrap();
        buffer.insert(accepted(1, "CD").with_final_segment(2), &mut sink).unwrap();
        assert_eq!(buffer.final_segment(), Some(2));

        let err = buffer.check_complete().unwrap_err();
        assert!(matches!(err, ContentFetchError::IncompleteObject { next_expected: 2, buffered: 0 }));

        buffer.insert(accepted(2, "EF").with_final_segment(2), &mut sink).unwrap();
        buffer.check_complete().unwrap();
    }

    #[test]
    fn test_segments_past_final_marker_are_out_of_range() {
        let mut sink = Vec::new();
        let mut buffer = ReassemblyBuffer::new();

        assert!(buffer.out_of_range(&accepted(5, "ZZ")).is_none());
        buffer.insert(accepted(5, "ZZ"), &mut sink).unwrap();
        buffer.insert(accepted(3, "GH"), &mut sink).unwrap();
        assert_eq!(buffer.buffered(), 2);

        // Learning the final segment drops what was buffered past it.
        buffer.insert(accepted(0, "AB").with_final_segment(3), &mut sink).unwrap();
        assert_eq!(buffer.buffered(), 1);

        assert!(buffer.out_of_range(&accepted(4, "XX")).is_some());
        assert!(buffer.out_of_range(&accepted(2, "EF")).is_none());
        assert!(buffer.out_of_range(&accepted(2, "EF").with_final_segment(1)).is_some());

        buffer.insert(accepted(1, "CD"), &mut sink).unwrap();
        buffer.insert(accepted(2, "EF"), &mut sink).unwrap();
        assert_eq!(sink, b"ABCDEFGH");
        buffer.check_complete().unwrap();
    }

    #[test]
    fn test_write_failure_keeps_segment_unflushed() {
        struct FailingSink;
        impl OutputSink for FailingSink {
            fn write_segment(&mut self, _data: &[u8]) -> io::Result<()> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut buffer = ReassemblyBuffer::new();
        assert!(buffer.insert(accepted(0, "AB"), &mut FailingSink).is_err());
        assert_eq!(buffer.next_expected(), 0);
        assert_eq!(buffer.segments_flushed(), 0);
    }
}
