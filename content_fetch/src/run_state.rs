use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::ContentFetchError;
use crate::interfaces::SegmentFetcher;
use crate::name::{BaseName, VersionedName};
use crate::reassembly::ReassemblyBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Discovering,
    Fetching,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

/// What a run produced, reported on success and, as the partial output, on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub versioned_name: Option<VersionedName>,
    pub segments_flushed: u64,
    pub bytes_flushed: u64,
    pub rejected_segments: u64,
    pub duplicate_segments: u64,
}

/// A fatal run error together with whatever had already been flushed to the sink.
///
/// The flushed prefix is left in place; the caller decides whether it is usable.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: ContentFetchError,
    pub partial: RunSummary,
}

pub type RunOutcome = std::result::Result<RunSummary, RunFailure>;

/// Returned by [`Orchestrator::run`](crate::Orchestrator::run); resolves to the run's terminal outcome.
pub struct RunTicket {
    generation: u64,
    receiver: oneshot::Receiver<RunOutcome>,
}

impl RunTicket {
    pub(crate) fn new(generation: u64, receiver: oneshot::Receiver<RunOutcome>) -> Self {
        Self { generation, receiver }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the run to complete or fail.
    pub async fn wait(self) -> RunOutcome {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => Err(RunFailure {
                error: ContentFetchError::InternalError("run ended without reporting an outcome".to_string()),
                partial: RunSummary::default(),
            }),
        }
    }

    /// Returns the outcome if the run has already terminated.
    pub fn try_outcome(&mut self) -> Option<RunOutcome> {
        self.receiver.try_recv().ok()
    }
}

/// Run-scoped state.  Replaced wholesale when a new run starts, so nothing of a previous run's
/// buffer or counters can leak into the next one.
pub(crate) struct RunContext {
    generation: u64,
    cancellation_token: CancellationToken,
    phase: RunPhase,
    base_name: BaseName,
    versioned_name: Option<VersionedName>,
    fetcher: Option<Arc<dyn SegmentFetcher>>,
    outcome_tx: Option<oneshot::Sender<RunOutcome>>,

    pub(crate) buffer: ReassemblyBuffer,
    pub(crate) rejected_segments: u64,
    pub(crate) duplicate_segments: u64,
}

impl RunContext {
    pub(crate) fn new(
        generation: u64,
        cancellation_token: CancellationToken,
        base_name: BaseName,
        fetcher: Arc<dyn SegmentFetcher>,
        outcome_tx: oneshot::Sender<RunOutcome>,
    ) -> Self {
        Self {
            generation,
            cancellation_token,
            phase: RunPhase::Discovering,
            base_name,
            versioned_name: None,
            fetcher: Some(fetcher),
            outcome_tx: Some(outcome_tx),
            buffer: ReassemblyBuffer::new(),
            rejected_segments: 0,
            duplicate_segments: 0,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn phase(&self) -> RunPhase {
        self.phase
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub(crate) fn base_name(&self) -> &BaseName {
        &self.base_name
    }

    pub(crate) fn versioned_name(&self) -> Option<&VersionedName> {
        self.versioned_name.as_ref()
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Moves the run to `Fetching`, handing back the fetcher to start.
    pub(crate) fn begin_fetch(&mut self, name: VersionedName) -> Option<Arc<dyn SegmentFetcher>> {
        self.phase = RunPhase::Fetching;
        self.versioned_name = Some(name);
        self.fetcher.take()
    }

    pub(crate) fn summary(&self) -> RunSummary {
        RunSummary {
            versioned_name: self.versioned_name.clone(),
            segments_flushed: self.buffer.segments_flushed(),
            bytes_flushed: self.buffer.bytes_flushed(),
            rejected_segments: self.rejected_segments,
            duplicate_segments: self.duplicate_segments,
        }
    }

    pub(crate) fn complete(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.phase = RunPhase::Completed;
        self.cancellation_token.cancel();
        let summary = self.summary();
        info!(
            generation = self.generation,
            name = ?self.versioned_name,
            segments = summary.segments_flushed,
            bytes = summary.bytes_flushed,
            rejected = summary.rejected_segments,
            "run completed"
        );
        if let Some(tx) = self.outcome_tx.take() {
            let _ = tx.send(Ok(summary));
        }
    }

    /// Terminates the run with a fatal error.  The first terminal transition wins; later calls
    /// are ignored.
    pub(crate) fn fail(&mut self, error: ContentFetchError) {
        if self.is_terminal() {
            return;
        }
        self.phase = RunPhase::Failed;
        self.cancellation_token.cancel();

        let partial = self.summary();
        match &error {
            ContentFetchError::Superseded(_) | ContentFetchError::Cancelled => {
                info!(generation = self.generation, "run stopped: {error}");
            },
            _ => {
                error!(
                    generation = self.generation,
                    base_name = %self.base_name,
                    next_expected = self.buffer.next_expected(),
                    bytes_flushed = partial.bytes_flushed,
                    "run failed: {error}"
                );
            },
        }

        if let Some(tx) = self.outcome_tx.take() {
            let _ = tx.send(Err(RunFailure { error, partial }));
        }
    }
}
