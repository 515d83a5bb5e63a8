use crate::error::{ExtractorError, Result};
use crate::extractor::aggregator::{ExtractionAggregator, ExtractionState, RunOutcome};
use crate::extractor::output_manager::{OutputManager, SaveSummary};
use crate::ui::progress::{ProgressReporter, ProgressSink, ProgressSnapshot};
use crate::ui::signals::CancellationToken;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub cancelled: bool,
    pub files_processed: usize,
    pub files_failed: usize,
    pub addresses_seen: u64,
    pub unique_addresses: usize,
    pub elapsed: Duration,
    pub addresses_file: PathBuf,
    pub report_file: PathBuf,
}

/// Owns one extraction run: the aggregator and its state, plus an optional
/// progress reporter watching that state.
///
/// Saving only reads the state, so it can happen before or after
/// [`ExtractionSession::shutdown`].
pub struct ExtractionSession {
    aggregator: Arc<ExtractionAggregator>,
    reporter: Option<ProgressReporter>,
}

impl ExtractionSession {
    pub fn new(aggregator: ExtractionAggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, interval: Duration, sink: Arc<dyn ProgressSink>) -> Self {
        let state = Arc::clone(self.aggregator.state());
        self.reporter = Some(ProgressReporter::new(state, interval, sink));
        self
    }

    pub fn state(&self) -> &Arc<ExtractionState> {
        self.aggregator.state()
    }

    pub fn reporter(&self) -> Option<&ProgressReporter> {
        self.reporter.as_ref()
    }

    /// Start the reporter timer, if one is attached. Needs a tokio runtime.
    pub fn start(&mut self) {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.start();
        }
    }

    /// Run the aggregator on a blocking thread so the reporter keeps ticking.
    pub async fn run(&self, files: Vec<PathBuf>, cancellation: CancellationToken) -> Result<RunOutcome> {
        let aggregator = Arc::clone(&self.aggregator);

        task::spawn_blocking(move || aggregator.run(&files, &cancellation))
            .await
            .map_err(|e| ExtractorError::Task {
                message: format!("Extraction task failed: {}", e),
            })
    }

    pub fn save(&self, output: &OutputManager) -> Result<SaveSummary> {
        output.save(self.state())
    }

    /// Emit a reading now; goes through the reporter's sink when attached.
    pub fn log(&self) -> ProgressSnapshot {
        match &self.reporter {
            Some(reporter) => reporter.log(),
            None => ProgressSnapshot::capture(self.state()),
        }
    }

    /// Stop the reporter and freeze the clock. Safe to call whether or not a
    /// run happened; repeated calls keep the first clock reading.
    pub async fn shutdown(&mut self) -> Duration {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.stop().await;
        }
        self.state().clock.stop()
    }

    pub fn summarize(&self, outcome: RunOutcome, output: &OutputManager) -> ExtractionSummary {
        let state = self.state();
        let files_processed = match outcome {
            RunOutcome::Completed { files, .. } => files,
            RunOutcome::Cancelled { files_started } => files_started,
        };

        ExtractionSummary {
            cancelled: outcome.is_cancelled(),
            files_processed,
            files_failed: state.tally.failed_count(),
            addresses_seen: state.tally.total_count(),
            unique_addresses: state.addresses.len(),
            elapsed: state.clock.elapsed(),
            addresses_file: output.addresses_path().to_path_buf(),
            report_file: output.report_path().to_path_buf(),
        }
    }
}
