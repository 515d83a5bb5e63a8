use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Invalid arguments: {message}")]
    Argument { message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to extract addresses from {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Background task failed: {message}")]
    Task { message: String },
}

/// Failure of a single file's address stream.
///
/// The two variants are kept distinct so the report can tell an unreadable
/// file apart from one whose type is not parsed at all.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported file type: {reason}")]
    Decode { reason: String },
}

impl SourceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            SourceError::Io(_) => FailureKind::Io,
            SourceError::Decode { .. } => FailureKind::Decode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Io,
    Decode,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Io => "io",
            FailureKind::Decode => "decode",
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExtractorError {
    fn user_message(&self) -> String {
        match self {
            ExtractorError::Argument { message } => message.clone(),
            ExtractorError::Source { path, source } => {
                format!("Could not extract from {}: {}", path.display(), source)
            }
            ExtractorError::Write { path, source } => {
                format!("Could not write {}: {}", path.display(), source)
            }
            ExtractorError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            ExtractorError::Cancelled => {
                "Extraction was cancelled by user".to_string()
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExtractorError::Argument { .. } => Some(
                "Run with -? to see the accepted arguments.".to_string()
            ),
            ExtractorError::Write { .. } => Some(
                "Ensure the output location exists and you have write permission, or choose another path with -o / -r.".to_string()
            ),
            ExtractorError::Config { .. } => Some(
                "Check your configuration file syntax, or regenerate one with --generate-config.".to_string()
            ),
            ExtractorError::Cancelled => Some(
                "Partial results were kept; rerun to process the remaining files.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ExtractorError {
    fn from(error: toml::de::Error) -> Self {
        ExtractorError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractorError>;

pub(crate) fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
