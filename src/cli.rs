use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{ArgAction, CommandFactory, Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "addrex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract unique email addresses from text files")]
#[command(
    long_about = "addrex reads the given files (and the files directly inside the given \
                  directories), collects every email address it finds, and writes the \
                  de-duplicated list plus a per-file report."
)]
#[command(after_help = "EXAMPLES:\n  \
    addrex contacts.csv notes.txt\n  \
    addrex ./exports -o found.txt -r counts.txt\n  \
    addrex mailbox.mbox --case-sensitive --interval 10\n  \
    addrex ./exports --config addrex.toml --output-format json")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Files or directories to extract from
    #[arg(required_unless_present_any = ["version", "usage", "generate_config"])]
    pub inputs: Vec<PathBuf>,

    /// File to write the unique addresses to
    #[arg(short = 'o', long = "output", help = "Address output file (default: addresses_output.txt)")]
    pub output: Option<PathBuf>,

    /// File to write the per-file counts to
    #[arg(short = 'r', long = "report", help = "Per-file report file (default: report.txt)")]
    pub report: Option<PathBuf>,

    /// Print version information
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue, exclusive = true)]
    pub version: bool,

    /// Print usage
    #[arg(short = '?', long = "help", action = ArgAction::SetTrue, exclusive = true)]
    pub usage: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Seconds between progress log lines
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// Disable periodic progress logging
    #[arg(long)]
    pub no_progress: bool,

    /// Exit with status 3 when any input file could not be read
    #[arg(long)]
    pub strict: bool,

    /// Treat addresses differing only in case as distinct
    #[arg(long)]
    pub case_sensitive: bool,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_addresses_file(self.output.clone())
            .with_report_file(self.report.clone())
            .with_interval(self.interval)
            .with_case_sensitive(self.case_sensitive)
            .with_progress_disabled(self.no_progress)
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_format.into()
    }

    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }

    pub fn version_line() -> String {
        format!("addrex {}", env!("CARGO_PKG_VERSION"))
    }
}
