use std::sync::Arc;

use error_printer::ErrorPrinter;
use fetch_config::FetchConfig;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ContentFetchError;
use crate::handles::{DiscoveryHandle, FetchHandle};
use crate::interfaces::{OutputSink, SegmentFetcher, ValidationOutcome, Validator, VersionDiscoverer};
use crate::name::{BaseName, VersionedName};
use crate::reassembly::Placement;
use crate::run_state::{RunContext, RunOutcome, RunPhase, RunSummary, RunTicket};
use crate::segment::{Segment, SegmentBatch, SegmentNumber, ValidationState};
use crate::validation::ValidationPolicy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub validation_policy: ValidationPolicy,
}

impl OrchestratorConfig {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            validation_policy: ValidationPolicy::from_strict_flag(config.validation.strict),
        }
    }
}

struct OrchestratorState {
    sink: Box<dyn OutputSink>,
    last_generation: u64,
    run: Option<RunContext>,
}

/// Shared core behind an [`Orchestrator`] and every handle it gives out.
///
/// All run state lives behind one mutex, so batches arriving concurrently from several fetch
/// tasks are validated, buffered and flushed one at a time.  Collaborator code is never invoked
/// while the lock is held, except the validator and the sink.
pub(crate) struct OrchestratorInner {
    validator: Arc<dyn Validator>,
    config: OrchestratorConfig,
    state: Mutex<OrchestratorState>,
}

/// Fetches a named, versioned, segmented object and writes its payload to a sink in order.
///
/// A run goes `Discovering -> Fetching -> Completed | Failed`.  Starting a new run replaces the
/// previous one: its callbacks are ignored from then on and its ticket resolves with
/// [`ContentFetchError::Superseded`].
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

impl Orchestrator {
    pub fn new(validator: Arc<dyn Validator>, sink: Box<dyn OutputSink>) -> Self {
        Self::with_config(validator, sink, OrchestratorConfig::default())
    }

    pub fn with_config(validator: Arc<dyn Validator>, sink: Box<dyn OutputSink>, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                validator,
                config,
                state: Mutex::new(OrchestratorState {
                    sink,
                    last_generation: 0,
                    run: None,
                }),
            }),
        }
    }

    /// Starts a run and returns as soon as discovery has been kicked off.
    pub fn run(
        &self,
        base_name: BaseName,
        discoverer: Arc<dyn VersionDiscoverer>,
        fetcher: Arc<dyn SegmentFetcher>,
    ) -> RunTicket {
        let (outcome_tx, outcome_rx) = tokio::sync::oneshot::channel();
        let cancellation_token = CancellationToken::new();

        let (generation, previous) = {
            let mut guard = self.inner.state.lock();
            let OrchestratorState {
                sink,
                last_generation,
                run,
            } = &mut *guard;
            *last_generation += 1;
            let generation = *last_generation;

            let context =
                RunContext::new(generation, cancellation_token.clone(), base_name.clone(), fetcher, outcome_tx);
            let mut previous = run.replace(context);
            if let Some(previous) = previous.as_mut() {
                fail_run(&mut **sink, previous, ContentFetchError::Superseded(generation));
            }
            (generation, previous)
        };
        // Dropped outside the lock: it may own collaborators holding handles of its own.
        drop(previous);

        info!(generation, base_name = %base_name, "starting run");

        let reply = DiscoveryHandle::new(self.inner.clone(), generation, cancellation_token);
        discoverer.discover(&base_name, reply);

        RunTicket::new(generation, outcome_rx)
    }

    /// Starts a run and waits for its outcome.
    pub async fn run_to_completion(
        &self,
        base_name: BaseName,
        discoverer: Arc<dyn VersionDiscoverer>,
        fetcher: Arc<dyn SegmentFetcher>,
    ) -> RunOutcome {
        self.run(base_name, discoverer, fetcher).wait().await
    }

    /// Fails the active run with [`ContentFetchError::Cancelled`].  Returns false if no run was active.
    pub fn cancel(&self) -> bool {
        let mut guard = self.inner.state.lock();
        let OrchestratorState { sink, run, .. } = &mut *guard;
        match run.as_mut() {
            Some(run) if !run.is_terminal() => {
                fail_run(&mut **sink, run, ContentFetchError::Cancelled);
                true
            },
            _ => false,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.inner.state.lock().run.as_ref().map(|r| r.phase()).unwrap_or_default()
    }

    /// Generation of the most recently started run; 0 before the first run.
    pub fn generation(&self) -> u64 {
        self.inner.state.lock().last_generation
    }

    pub fn next_expected(&self) -> SegmentNumber {
        self.inner
            .state
            .lock()
            .run
            .as_ref()
            .map(|r| r.buffer.next_expected())
            .unwrap_or_default()
    }

    pub fn buffered_segments(&self) -> usize {
        self.inner.state.lock().run.as_ref().map(|r| r.buffer.buffered()).unwrap_or_default()
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.inner.state.lock().run.as_ref().map(|r| r.summary())
    }

    pub fn versioned_name(&self) -> Option<VersionedName> {
        self.inner.state.lock().run.as_ref().and_then(|r| r.versioned_name().cloned())
    }
}

/// Returns the run if the callback belongs to it and it is still live.
fn live_run<'a>(run: &'a mut Option<RunContext>, generation: u64, event: &str) -> Option<&'a mut RunContext> {
    if matches!(run.as_ref(), Some(r) if r.generation() == generation && !r.is_terminal()) {
        return run.as_mut();
    }

    match run.as_ref() {
        Some(run) => {
            debug!(generation, current = run.generation(), phase = ?run.phase(), "ignoring {event} for an inactive run");
        },
        None => {
            debug!(generation, "ignoring {event}: no run started");
        },
    }
    None
}

/// Pushes whatever has been written so far out of the sink, then terminates the run.  The flushed
/// prefix stays in place for the caller.
fn fail_run(sink: &mut dyn OutputSink, run: &mut RunContext, error: ContentFetchError) {
    if run.is_terminal() {
        return;
    }
    let _ = sink.flush().warn_error("flushing partial output of a failing run");
    run.fail(error);
}

/// Runs the validator and marks the segment with the verdict.
fn validate_segment(
    validator: &dyn Validator,
    name: &VersionedName,
    key: SegmentNumber,
    segment: Segment,
) -> (Segment, Option<String>) {
    let outcome = if key != segment.number() {
        ValidationOutcome::Rejected(format!("delivered under sequence number {key}"))
    } else {
        validator.validate(name, &segment)
    };

    match outcome {
        ValidationOutcome::Accepted => (segment.mark(ValidationState::Accepted), None),
        ValidationOutcome::Rejected(reason) => (segment.mark(ValidationState::Rejected), Some(reason)),
    }
}

impl OrchestratorInner {
    pub(crate) fn on_discovery_success(self: &Arc<Self>, generation: u64, name: VersionedName) {
        let (fetcher, cancellation_token) = {
            let mut guard = self.state.lock();
            let OrchestratorState { sink, run, .. } = &mut *guard;
            let Some(run) = live_run(run, generation, "discovery result") else {
                return;
            };

            if run.phase() != RunPhase::Discovering {
                warn!(generation, name = %name, "discovery answered twice; ignoring");
                return;
            }

            if name.base() != run.base_name() {
                let base_name = run.base_name().clone();
                fail_run(
                    &mut **sink,
                    run,
                    ContentFetchError::DiscoveryFailure(format!("discovered name {name} does not belong to {base_name}")),
                );
                return;
            }

            info!(generation, name = %name, "version discovered; fetching segments");
            let Some(fetcher) = run.begin_fetch(name.clone()) else {
                fail_run(
                    &mut **sink,
                    run,
                    ContentFetchError::InternalError("segment fetcher already started".to_string()),
                );
                return;
            };
            (fetcher, run.cancellation_token())
        };

        let handle = FetchHandle::new(self.clone(), generation, cancellation_token);
        fetcher.fetch(&name, handle);
    }

    pub(crate) fn on_discovery_failure(&self, generation: u64, reason: String) {
        let mut guard = self.state.lock();
        let OrchestratorState { sink, run, .. } = &mut *guard;
        let Some(run) = live_run(run, generation, "discovery failure") else {
            return;
        };

        if run.phase() == RunPhase::Discovering {
            fail_run(&mut **sink, run, ContentFetchError::DiscoveryFailure(reason));
        }
    }

    pub(crate) fn on_segments_received(&self, generation: u64, batch: SegmentBatch) {
        let mut guard = self.state.lock();
        let OrchestratorState { sink, run, .. } = &mut *guard;

        let Some(run) = live_run(run, generation, "segment batch") else {
            return;
        };
        let Some(name) = run.versioned_name().cloned() else {
            warn!(generation, "segments delivered before discovery finished; ignoring");
            return;
        };

        debug!(generation, segments = batch.len(), next_expected = run.buffer.next_expected(), "received batch");

        for (key, segment) in batch {
            let (segment, mut rejection) = validate_segment(&*self.validator, &name, key, segment);
            if rejection.is_none() {
                rejection = run.buffer.out_of_range(&segment);
            }

            if let Some(reason) = rejection {
                let segment = segment.mark(ValidationState::Rejected);
                run.rejected_segments += 1;
                warn!(generation, segment = segment.number(), state = ?segment.state(), "segment failed validation: {reason}");

                if self.config.validation_policy == ValidationPolicy::Strict {
                    fail_run(
                        &mut **sink,
                        run,
                        ContentFetchError::ValidationFailure {
                            segment: segment.number(),
                            reason,
                        },
                    );
                    return;
                }
                continue;
            }

            match run.buffer.insert(segment, &mut **sink) {
                Ok(Placement::Duplicate) => {
                    run.duplicate_segments += 1;
                    debug!(generation, segment = key, "dropping late duplicate");
                },
                Ok(Placement::Flushed { count }) => {
                    debug!(generation, flushed = count, next_expected = run.buffer.next_expected(), "flushed segments");
                },
                Ok(Placement::Buffered) => {},
                Err(e) => {
                    fail_run(&mut **sink, run, e.into());
                    return;
                },
            }
        }
    }

    pub(crate) fn on_fetch_failure(&self, generation: u64, reason: String) {
        let mut guard = self.state.lock();
        let OrchestratorState { sink, run, .. } = &mut *guard;
        if let Some(run) = live_run(run, generation, "fetch failure") {
            fail_run(&mut **sink, run, ContentFetchError::FetchFailure(reason));
        }
    }

    pub(crate) fn on_fetch_complete(&self, generation: u64) {
        let mut guard = self.state.lock();
        let OrchestratorState { sink, run, .. } = &mut *guard;

        let Some(run) = live_run(run, generation, "fetch completion") else {
            return;
        };
        if run.phase() != RunPhase::Fetching {
            warn!(generation, phase = ?run.phase(), "fetch completion outside of fetching; ignoring");
            return;
        }

        if let Err(e) = run.buffer.check_complete() {
            fail_run(&mut **sink, run, e);
            return;
        }
        if let Err(e) = sink.flush() {
            run.fail(e.into());
            return;
        }
        run.complete();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RejectingValidator;
    use crate::validation::AcceptAllValidator;

    fn name() -> VersionedName {
        "/example/object/v=3".parse().unwrap()
    }

    #[test]
    fn test_validate_segment_marks_verdict() {
        let (accepted, reason) = validate_segment(&AcceptAllValidator, &name(), 0, Segment::new(0, "AB"));
        assert_eq!(accepted.state(), ValidationState::Accepted);
        assert!(reason.is_none());

        let validator = RejectingValidator::new([1]);
        let (rejected, reason) = validate_segment(&*validator, &name(), 1, Segment::new(1, "CD"));
        assert_eq!(rejected.state(), ValidationState::Rejected);
        assert!(reason.is_some());
    }

    #[test]
    fn test_validate_segment_rejects_mismatched_key() {
        let (segment, reason) = validate_segment(&AcceptAllValidator, &name(), 2, Segment::new(1, "CD"));
        assert_eq!(segment.state(), ValidationState::Rejected);
        assert_eq!(reason.as_deref(), Some("delivered under sequence number 2"));
    }
}
