use std::io::{self, Write};

use crate::handles::{DiscoveryHandle, FetchHandle};
use crate::name::{BaseName, VersionedName};
use crate::segment::Segment;

/// Resolves a base name to its newest versioned name.
///
/// Implementations must not block: the answer is given through the handle, either from within
/// `discover` or later from another task.  The handle is consumed by the answer, so a discoverer
/// reports success or failure exactly once.  Dropping the handle unanswered counts as a failure.
pub trait VersionDiscoverer: Send + Sync {
    fn discover(&self, base_name: &BaseName, reply: DiscoveryHandle);
}

/// Retrieves the segments of a versioned object, typically with many requests in flight.
///
/// Segments are handed over through [`FetchHandle::deliver`] in batches, in any order.  The fetch
/// ends with exactly one of [`FetchHandle::complete`] or [`FetchHandle::fail`]; the handle may be
/// cloned freely to deliver from concurrent tasks.
pub trait SegmentFetcher: Send + Sync {
    fn fetch(&self, name: &VersionedName, handle: FetchHandle);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(String),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }
}

/// Checks the authenticity and integrity of one received segment.
pub trait Validator: Send + Sync {
    fn validate(&self, name: &VersionedName, segment: &Segment) -> ValidationOutcome;
}

/// Ordered, append-only destination for the reassembled payload.
pub trait OutputSink: Send {
    fn write_segment(&mut self, data: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

impl<W: Write + Send> OutputSink for W {
    fn write_segment(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(self)
    }
}
