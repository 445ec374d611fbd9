//! Collaborators for driving an [`Orchestrator`](crate::Orchestrator) by hand in tests.
//! Uses `unwrap()` freely; intended for test-only use.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::prelude::*;

use crate::handles::{DiscoveryHandle, FetchHandle};
use crate::interfaces::{SegmentFetcher, ValidationOutcome, Validator, VersionDiscoverer};
use crate::name::{BaseName, VersionedName};
use crate::segment::{Segment, SegmentBatch, SegmentNumber, batch_of};

/// An in-memory sink whose contents stay readable after it has been handed to an orchestrator.
///
/// With `fail_after_writes(n)`, every write after the first `n` returns an error.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    data: Arc<Mutex<Vec<u8>>>,
    writes: Arc<Mutex<usize>>,
    fail_after: Option<usize>,
    flushes: Arc<Mutex<usize>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_after_writes(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8(self.contents()).unwrap()
    }

    pub fn flush_count(&self) -> usize {
        *self.flushes.lock()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut writes = self.writes.lock();
        if self.fail_after.is_some_and(|limit| *writes >= limit) {
            return Err(io::Error::other("sink refused write"));
        }
        *writes += 1;
        self.data.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.flushes.lock() += 1;
        Ok(())
    }
}

enum Script {
    Resolve(VersionedName),
    Fail(String),
    Hold,
}

/// A discoverer that answers with a fixed result, or holds on to the handle so the test can
/// answer later.
pub struct ScriptedDiscoverer {
    script: Script,
    held: Mutex<Vec<DiscoveryHandle>>,
    requests: Mutex<Vec<BaseName>>,
}

impl ScriptedDiscoverer {
    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            held: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn resolving(name: &str) -> Arc<Self> {
        Self::with_script(Script::Resolve(name.parse().unwrap()))
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Self::with_script(Script::Fail(reason.to_string()))
    }

    pub fn holding() -> Arc<Self> {
        Self::with_script(Script::Hold)
    }

    /// Takes the oldest handle held back by a `holding` discoverer.
    pub fn take_handle(&self) -> DiscoveryHandle {
        self.held.lock().remove(0)
    }

    pub fn requests(&self) -> Vec<BaseName> {
        self.requests.lock().clone()
    }
}

impl VersionDiscoverer for ScriptedDiscoverer {
    fn discover(&self, base_name: &BaseName, reply: DiscoveryHandle) {
        self.requests.lock().push(base_name.clone());
        match &self.script {
            Script::Resolve(name) => reply.succeed(name.clone()),
            Script::Fail(reason) => reply.fail(reason.clone()),
            Script::Hold => self.held.lock().push(reply),
        }
    }
}

/// A fetcher that records every fetch request and keeps its handle for the test to drive.
#[derive(Default)]
pub struct ManualFetcher {
    handles: Mutex<Vec<(VersionedName, FetchHandle)>>,
}

impl ManualFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fetch_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Takes the oldest captured fetch request.
    pub fn take_handle(&self) -> (VersionedName, FetchHandle) {
        self.handles.lock().remove(0)
    }
}

impl SegmentFetcher for ManualFetcher {
    fn fetch(&self, name: &VersionedName, handle: FetchHandle) {
        self.handles.lock().push((name.clone(), handle));
    }
}

/// Rejects the listed sequence numbers and accepts everything else.
pub struct RejectingValidator {
    rejected: HashSet<SegmentNumber>,
}

impl RejectingValidator {
    pub fn new(rejected: impl IntoIterator<Item = SegmentNumber>) -> Arc<Self> {
        Arc::new(Self {
            rejected: rejected.into_iter().collect(),
        })
    }
}

impl Validator for RejectingValidator {
    fn validate(&self, _name: &VersionedName, segment: &Segment) -> ValidationOutcome {
        if self.rejected.contains(&segment.number()) {
            ValidationOutcome::Rejected(format!("segment {} is on the reject list", segment.number()))
        } else {
            ValidationOutcome::Accepted
        }
    }
}

/// Builds a batch from `(sequence number, payload)` pairs.
pub fn segments(parts: &[(SegmentNumber, &str)]) -> SegmentBatch {
    batch_of(parts.iter().map(|(n, payload)| Segment::new(*n, payload.to_string())))
}

/// Deterministic random payload of `size` bytes.
pub fn random_data(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut buffer = vec![0_u8; size];
    rng.fill_bytes(&mut buffer);
    buffer
}
