use std::collections::BTreeMap;

use bytes::Bytes;

pub type SegmentNumber = u64;

/// A batch of segments delivered together by a fetcher, keyed by sequence number.
pub type SegmentBatch = BTreeMap<SegmentNumber, Segment>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationState {
    #[default]
    Unvalidated,
    Accepted,
    Rejected,
}

/// One unit of an object's payload, addressed by sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    number: SegmentNumber,
    payload: Bytes,
    final_segment: Option<SegmentNumber>,
    signature: Bytes,
    state: ValidationState,
}

impl Segment {
    pub fn new(number: SegmentNumber, payload: impl Into<Bytes>) -> Self {
        Self {
            number,
            payload: payload.into(),
            final_segment: None,
            signature: Bytes::new(),
            state: ValidationState::Unvalidated,
        }
    }

    /// Marks the sequence number of the object's last segment, as announced by the producer.
    pub fn with_final_segment(mut self, final_segment: SegmentNumber) -> Self {
        self.final_segment = Some(final_segment);
        self
    }

    pub fn with_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature = signature.into();
        self
    }

    pub fn number(&self) -> SegmentNumber {
        self.number
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn final_segment(&self) -> Option<SegmentNumber> {
        self.final_segment
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub(crate) fn mark(mut self, state: ValidationState) -> Self {
        self.state = state;
        self
    }
}

/// Collects segments into a batch keyed by their own sequence numbers.
pub fn batch_of(segments: impl IntoIterator<Item = Segment>) -> SegmentBatch {
    segments.into_iter().map(|s| (s.number(), s)).collect()
}
