pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod scanner;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExtractionConfig, OutputConfig, ProgressConfig};
pub use error::{ExtractorError, FailureKind, Result, SourceError, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{
    AddressSource, ElapsedClock, ExtractionAggregator, ExtractionSession, ExtractionState,
    ExtractionSummary, FileTally, OutputManager, RegexAddressSource, RunOutcome, TallyStatus,
    UniqueAddressSet,
};
pub use logging::init_tracing;
pub use scanner::{FileCollection, FileFilter};
pub use ui::{
    CancellationToken, GracefulShutdown, OutputFormatter, OutputMode, ProgressManager,
    ProgressReporter, TracingProgressSink,
};

use scanner::detect_case_insensitive;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Main library interface: gathers input files, extracts their addresses and
/// writes the results.
pub struct AddressExtractor {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl AddressExtractor {
    /// Create an extractor that listens for Ctrl+C.
    pub fn new(config: Config, output_mode: OutputMode, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create an extractor without installing a signal handler.
    pub fn new_for_test(config: Config, output_mode: OutputMode, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(config, cli_args.output_mode(), cli_args.quiet)
    }

    /// Extract addresses from `inputs` and write both result files.
    ///
    /// A cancelled run still writes what was gathered so far; the returned
    /// summary has `cancelled` set.
    pub async fn extract<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<ExtractionSummary> {
        if inputs.is_empty() {
            return Err(ExtractorError::Argument {
                message: "No input file paths specified".to_string(),
            });
        }
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation("Gathering input files");

        let case_insensitive_paths = self.resolve_path_case();
        let files = FileCollection::gather(inputs, case_insensitive_paths);
        let filter = FileFilter::new(&self.config.extraction);

        let statistics = files.get_statistics(&filter);
        tracing::info!(
            files = statistics.total_files,
            bytes = statistics.total_size,
            case_insensitive_paths,
            "input files gathered"
        );
        self.output_formatter.print_file_statistics(&statistics);

        let source = RegexAddressSource::new(filter)?
            .with_buffer_size(self.config.extraction.read_buffer_size);
        let file_progress = self.progress_manager.create_file_progress(files.len() as u64);
        let observer = {
            let pb = file_progress.clone();
            move |index: usize, path: &Path| ui::progress::update_file_progress(&pb, index, path)
        };

        let aggregator = ExtractionAggregator::new(
            Box::new(source),
            self.config.extraction.fold_address_case,
        )
        .with_file_observer(Box::new(observer));

        let mut session = ExtractionSession::new(aggregator);
        if self.config.progress.enabled {
            let sink = TracingProgressSink::new().with_progress_manager(self.progress_manager.clone());
            session = session.with_reporter(self.config.progress_interval(), Arc::new(sink));
        }

        self.output_formatter.start_operation("Extracting addresses");
        session.start();

        let outcome = match session.run(files.files().to_vec(), self.shutdown.token()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                session.shutdown().await;
                file_progress.abandon();
                return Err(e);
            }
        };

        let output = OutputManager::new(
            self.config.output.addresses_file.clone(),
            self.config.output.report_file.clone(),
        );
        let saved = session.save(&output);
        let elapsed = session.shutdown().await;

        if let Err(e) = saved {
            file_progress.abandon();
            return Err(e);
        }

        ui::progress::finish_progress_with_summary(
            &file_progress,
            &format!("Processed {} files", session.state().tally.len()),
            elapsed,
        );
        self.progress_manager.clear();

        session.log();

        let summary = session.summarize(outcome, &output);
        self.output_formatter.print_extraction_summary(&summary);

        Ok(summary)
    }

    /// Configured value, or a check of the directory receiving the output.
    fn resolve_path_case(&self) -> bool {
        if let Some(forced) = self.config.extraction.case_insensitive_paths {
            return forced;
        }

        let dir = case_check_directory(&self.config.output.addresses_file);
        match detect_case_insensitive(&dir) {
            Ok(case_insensitive) => case_insensitive,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "could not detect filesystem case sensitivity, assuming case-sensitive paths"
                );
                false
            }
        }
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &ExtractorError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn case_check_directory(output_file: &Path) -> PathBuf {
    match output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && parent.is_dir() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.output.addresses_file = dir.join("addresses_output.txt");
        config.output.report_file = dir.join("report.txt");
        config
    }

    #[tokio::test]
    async fn test_extract_writes_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let inputs = temp_dir.path().join("in");
        fs::create_dir(&inputs).unwrap();
        fs::write(inputs.join("a.txt"), "Bob@X.com, bob@x.com").unwrap();
        fs::write(inputs.join("b.txt"), "carol@y.com").unwrap();

        let extractor = AddressExtractor::new_for_test(config_in(temp_dir.path()), OutputMode::Plain, true);
        let summary = extractor.extract(&[&inputs]).await.unwrap();

        assert!(!summary.cancelled);
        assert_eq!(summary.unique_addresses, 2);
        assert_eq!(summary.addresses_seen, 3);
        assert_eq!(summary.files_failed, 0);

        let addresses = fs::read_to_string(temp_dir.path().join("addresses_output.txt")).unwrap();
        assert_eq!(addresses, "Bob@X.com\ncarol@y.com\n");

        let report = fs::read_to_string(temp_dir.path().join("report.txt")).unwrap();
        assert_eq!(
            report,
            format!(
                "{},2\n{},1\n",
                inputs.join("a.txt").display(),
                inputs.join("b.txt").display()
            )
        );
    }

    #[tokio::test]
    async fn test_extract_records_unreadable_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.txt");
        let archive = temp_dir.path().join("bundle.zip");
        fs::write(&good, "one@example.com two@example.com").unwrap();
        fs::write(&archive, "hidden@example.com").unwrap();
        let missing = temp_dir.path().join("missing.txt");

        let extractor = AddressExtractor::new_for_test(config_in(temp_dir.path()), OutputMode::Plain, true);
        let summary = extractor.extract(&[&good, &archive, &missing]).await.unwrap();

        assert_eq!(summary.unique_addresses, 2);
        assert_eq!(summary.files_failed, 2);

        let report = fs::read_to_string(temp_dir.path().join("report.txt")).unwrap();
        assert!(report.contains("bundle.zip,error:decode"));
        assert!(report.contains("missing.txt,error:io"));
    }

    #[tokio::test]
    async fn test_extract_with_no_files() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty");
        fs::create_dir(&empty).unwrap();

        let extractor = AddressExtractor::new_for_test(config_in(temp_dir.path()), OutputMode::Plain, true);
        let summary = extractor.extract(&[&empty]).await.unwrap();

        assert_eq!(summary.unique_addresses, 0);
        assert_eq!(summary.files_processed, 0);
        assert_eq!(fs::read_to_string(temp_dir.path().join("report.txt")).unwrap(), "");
    }

    #[tokio::test]
    async fn test_extract_requires_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = AddressExtractor::new_for_test(config_in(temp_dir.path()), OutputMode::Plain, true);

        let none: [&Path; 0] = [];
        let result = extractor.extract(&none).await;
        assert!(matches!(result, Err(ExtractorError::Argument { .. })));
        assert!(!temp_dir.path().join("report.txt").exists());
    }

    #[tokio::test]
    async fn test_extract_after_shutdown_request() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = AddressExtractor::new_for_test(config_in(temp_dir.path()), OutputMode::Plain, true);

        extractor.request_shutdown();
        assert!(!extractor.is_running());

        let result = extractor.extract(&[temp_dir.path()]).await;
        assert!(matches!(result, Err(ExtractorError::Cancelled)));
    }

    #[test]
    fn test_forced_path_case_skips_detection() {
        let mut config = Config::default();
        config.extraction.case_insensitive_paths = Some(true);
        config.output.addresses_file = PathBuf::from("/does/not/exist/out.txt");

        let extractor = AddressExtractor::new_for_test(config, OutputMode::Plain, true);
        assert!(extractor.resolve_path_case());
    }

    #[test]
    fn test_case_check_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(case_check_directory(&temp_dir.path().join("out.txt")), temp_dir.path());
        assert_eq!(case_check_directory(Path::new("out.txt")), PathBuf::from("."));
        assert_eq!(case_check_directory(Path::new("/does/not/exist/out.txt")), PathBuf::from("."));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        AddressExtractor::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[extraction]"));
        assert!(content.contains("[progress]"));
        assert!(content.contains("[output]"));
    }

    #[test]
    fn test_version_info() {
        assert!(!version_info().is_empty());
    }
}
