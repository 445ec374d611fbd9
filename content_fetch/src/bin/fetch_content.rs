use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use content_fetch::{
    BaseName, DigestValidator, LocalContentStore, Orchestrator, OrchestratorConfig, OutputTarget, RunSummary,
    new_output_sink,
};
use error_printer::ErrorPrinter;
use fetch_config::FetchConfig;
use fetch_logging::{LoggingConfig, init_logging};
use tracing::info;

/// Publishes a file into an in-process content store as signed segments, then fetches it back
/// through the orchestrator and writes the reassembled payload out.
#[derive(Parser)]
#[clap(name = "fetch-content")]
struct FetchCommand {
    /// File to publish.
    input: PathBuf,

    /// Base name the content is published under.
    #[clap(long, default_value = "/example/object")]
    name: String,

    /// Version number to publish.
    #[clap(long = "object-version", default_value_t = 1)]
    object_version: u64,

    /// Segment payload size in bytes.  Defaults to the configured `default_segment_size`.
    #[clap(long)]
    segment_size: Option<usize>,

    /// Where to write the fetched payload; stdout if not given.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Fail on the first segment that does not validate.
    #[clap(long)]
    strict: bool,
}

impl FetchCommand {
    async fn run(self, mut config: FetchConfig) -> Result<RunSummary> {
        if self.strict {
            config.validation.strict = true;
        }

        let base_name: BaseName = self.name.parse()?;
        let data = std::fs::read(&self.input).with_context(|| format!("reading {:?}", self.input))?;
        let segment_size = self.segment_size.unwrap_or(config.fetch.default_segment_size);

        let store = Arc::new(LocalContentStore::from_config(&config.fetch));
        let published = store.publish(&base_name, self.object_version, data, segment_size)?;
        eprintln!("Published {published}");

        let target = match self.output {
            Some(path) => OutputTarget::File(path),
            None => OutputTarget::Stdout,
        };
        let sink = new_output_sink(target)?;

        let orchestrator =
            Orchestrator::with_config(Arc::new(DigestValidator), sink, OrchestratorConfig::from_config(&config));

        let summary = orchestrator
            .run_to_completion(base_name, store.clone(), store)
            .await
            .log_error("fetch failed")?;

        Ok(summary)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = FetchCommand::parse();
    let config = FetchConfig::new();

    init_logging(LoggingConfig::from_config(&config.log, env!("CARGO_PKG_VERSION").to_string()));

    let summary = cli.run(config).await?;

    info!(?summary, "fetch finished");
    eprintln!(
        "Fetched {} segment(s), {} byte(s) from {}",
        summary.segments_flushed,
        summary.bytes_flushed,
        summary.versioned_name.map(|n| n.to_string()).unwrap_or_default()
    );

    Ok(())
}
