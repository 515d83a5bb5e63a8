use crate::error::{ExtractorError, UserFriendlyError};
use crate::extractor::ExtractionSummary;
use crate::scanner::ExtensionStatistics;
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use serde_json;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ENVELOPE: Emoji = Emoji("📧 ", "> ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    /// Errors are printed even in quiet mode, always to stderr.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Warning, message),
            OutputMode::Json => self.print_json_message("warning", message),
            OutputMode::Plain => println!("WARNING: {}", message),
        }
    }

    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Info, message),
            OutputMode::Json => self.print_json_message("info", message),
            OutputMode::Plain => println!("INFO: {}", message),
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}{}", ENVELOPE, style(operation).bold());
                } else {
                    println!("> {}", operation);
                }
            }
            OutputMode::Json => self.print_json_message("operation_start", operation),
            OutputMode::Plain => println!("STARTING: {}", operation),
        }
    }

    pub fn print_user_friendly_error(&self, error: &ExtractorError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    pub fn print_file_statistics(&self, statistics: &ExtensionStatistics) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Json => {
                let extensions: Vec<_> = statistics
                    .extensions
                    .iter()
                    .map(|info| {
                        serde_json::json!({
                            "extension": info.extension,
                            "count": info.count,
                            "bytes": info.bytes,
                            "skipped": !info.parsing.is_read(),
                        })
                    })
                    .collect();

                self.print_json_object(&serde_json::json!({
                    "type": "files",
                    "total_files": statistics.total_files,
                    "total_bytes": statistics.total_size,
                    "extensions": extensions,
                }));
            }
            _ => print!("{}", statistics.display_summary()),
        }
    }

    pub fn print_extraction_summary(&self, summary: &ExtractionSummary) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => self.print_human_summary(summary),
            OutputMode::Json => self.print_json_summary(summary),
            OutputMode::Plain => self.print_plain_summary(summary),
        }
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let (emoji, styled) = match msg_type {
                MessageType::Success => (CHECKMARK, style(message).green().bold()),
                MessageType::Error => (CROSS, style(message).red().bold()),
                MessageType::Warning => (WARNING, style(message).yellow().bold()),
                MessageType::Info => (INFO, style(message).cyan()),
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        let value = serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        if level == "error" {
            eprintln!(
                "{}",
                serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
            );
        } else {
            self.print_json_object(&value);
        }
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }

    fn print_human_summary(&self, summary: &ExtractionSummary) {
        let rule = if self.use_colors {
            style("─".repeat(60)).dim().to_string()
        } else {
            "-".repeat(60)
        };

        println!();
        println!("{}", rule);

        let headline = if summary.cancelled {
            "Address extraction cancelled, partial results saved"
        } else {
            "Address extraction completed!"
        };
        if self.use_colors {
            let styled = if summary.cancelled {
                style(headline).yellow().bold()
            } else {
                style(headline).green().bold()
            };
            println!("{} {}", styled, if summary.cancelled { WARNING } else { CHECKMARK });
        } else {
            println!("{}", headline);
        }

        println!();
        println!("  Unique addresses: {}", self.highlight(summary.unique_addresses.to_string()));
        println!("  Addresses seen:   {}", self.highlight(summary.addresses_seen.to_string()));
        println!("  Files processed:  {}", self.highlight(summary.files_processed.to_string()));
        if summary.files_failed > 0 {
            println!("  Files failed:     {}", self.highlight(summary.files_failed.to_string()));
        }
        println!("  Time taken:       {}", self.highlight(format_duration(summary.elapsed)));
        println!("  Addresses file:   {}", summary.addresses_file.display());
        println!("  Report file:      {}", summary.report_file.display());

        println!("{}", rule);
    }

    fn print_json_summary(&self, summary: &ExtractionSummary) {
        let value = serde_json::json!({
            "type": "summary",
            "cancelled": summary.cancelled,
            "unique_addresses": summary.unique_addresses,
            "addresses_seen": summary.addresses_seen,
            "files_processed": summary.files_processed,
            "files_failed": summary.files_failed,
            "duration_ms": summary.elapsed.as_millis() as u64,
            "addresses_file": summary.addresses_file,
            "report_file": summary.report_file,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_plain_summary(&self, summary: &ExtractionSummary) {
        if summary.cancelled {
            println!("CANCELLED: Address extraction");
        } else {
            println!("COMPLETED: Address extraction");
        }
        println!("Unique addresses: {}", summary.unique_addresses);
        println!("Addresses seen: {}", summary.addresses_seen);
        println!("Files processed: {}", summary.files_processed);
        println!("Files failed: {}", summary.files_failed);
        println!("Duration: {}ms", summary.elapsed.as_millis());
        println!("Addresses file: {}", summary.addresses_file.display());
        println!("Report file: {}", summary.report_file.display());
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}
