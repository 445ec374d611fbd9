use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::name::VersionedName;
use crate::orchestrator::OrchestratorInner;
use crate::segment::SegmentBatch;

/// One-shot reply channel handed to a [`VersionDiscoverer`](crate::VersionDiscoverer).
///
/// Tied to the run that created it: once a newer run starts, answers through this handle are
/// ignored.
pub struct DiscoveryHandle {
    orchestrator: Arc<OrchestratorInner>,
    generation: u64,
    cancellation_token: CancellationToken,
    answered: bool,
}

impl DiscoveryHandle {
    pub(crate) fn new(orchestrator: Arc<OrchestratorInner>, generation: u64, cancellation_token: CancellationToken) -> Self {
        Self {
            orchestrator,
            generation,
            cancellation_token,
            answered: false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the run has terminated or been replaced; discovery work can stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn succeed(mut self, name: VersionedName) {
        self.answered = true;
        self.orchestrator.on_discovery_success(self.generation, name);
    }

    pub fn fail(mut self, reason: impl Into<String>) {
        self.answered = true;
        self.orchestrator.on_discovery_failure(self.generation, reason.into());
    }
}

impl Drop for DiscoveryHandle {
    fn drop(&mut self) {
        if !self.answered {
            self.orchestrator
                .on_discovery_failure(self.generation, "version discovery ended without an answer".to_string());
        }
    }
}

struct FetchChannel {
    orchestrator: Arc<OrchestratorInner>,
    generation: u64,
    cancellation_token: CancellationToken,
    closed: AtomicBool,
}

impl Drop for FetchChannel {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            self.orchestrator
                .on_fetch_failure(self.generation, "segment fetcher ended without completing".to_string());
        }
    }
}

/// Delivery channel handed to a [`SegmentFetcher`](crate::SegmentFetcher).
///
/// Clones share one channel.  The first `complete` or `fail` closes it for every clone; once all
/// clones are dropped without either, the fetch is reported as failed.
#[derive(Clone)]
pub struct FetchHandle {
    channel: Arc<FetchChannel>,
}

impl FetchHandle {
    pub(crate) fn new(orchestrator: Arc<OrchestratorInner>, generation: u64, cancellation_token: CancellationToken) -> Self {
        Self {
            channel: Arc::new(FetchChannel {
                orchestrator,
                generation,
                cancellation_token,
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.channel.generation
    }

    pub fn is_closed(&self) -> bool {
        self.channel.closed.load(Ordering::Acquire)
    }

    /// True once the run has terminated or been replaced; outstanding requests can be dropped.
    pub fn is_cancelled(&self) -> bool {
        self.channel.cancellation_token.is_cancelled()
    }

    /// Resolves when the run terminates or is replaced.
    pub async fn cancelled(&self) {
        self.channel.cancellation_token.cancelled().await
    }

    /// Hands a batch of received segments to the orchestrator.
    pub fn deliver(&self, batch: SegmentBatch) {
        if self.is_closed() {
            debug!(generation = self.channel.generation, "dropping batch delivered after fetch closed");
            return;
        }
        if batch.is_empty() {
            return;
        }
        self.channel.orchestrator.on_segments_received(self.channel.generation, batch);
    }

    /// Signals that no further segments will arrive.
    pub fn complete(self) {
        if !self.channel.closed.swap(true, Ordering::AcqRel) {
            self.channel.orchestrator.on_fetch_complete(self.channel.generation);
        }
    }

    pub fn fail(self, reason: impl Into<String>) {
        if !self.channel.closed.swap(true, Ordering::AcqRel) {
            self.channel.orchestrator.on_fetch_failure(self.channel.generation, reason.into());
        }
    }
}
