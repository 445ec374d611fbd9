mod error;
mod handles;
mod interfaces;
mod local_store;
mod name;
mod orchestrator;
mod output;
mod reassembly;
mod run_state;
mod segment;
mod validation;

pub mod test_utils;

pub use error::{ContentFetchError, Result};
pub use handles::{DiscoveryHandle, FetchHandle};
pub use interfaces::{OutputSink, SegmentFetcher, ValidationOutcome, Validator, VersionDiscoverer};
pub use local_store::LocalContentStore;
pub use name::{BaseName, VersionedName};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use output::{ChannelWriter, OutputTarget, new_output_sink};
pub use run_state::{RunFailure, RunOutcome, RunPhase, RunSummary, RunTicket};
pub use segment::{Segment, SegmentBatch, SegmentNumber, ValidationState, batch_of};
pub use validation::{AcceptAllValidator, DigestValidator, ValidationPolicy};
