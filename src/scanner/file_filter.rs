use crate::config::ExtractionConfig;
use std::path::Path;

/// Whether files of an extension are read for addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionParsing {
    Read,
    Skip { reason: String },
}

impl ExtensionParsing {
    pub fn is_read(&self) -> bool {
        matches!(self, ExtensionParsing::Read)
    }
}

#[derive(Debug, Clone)]
pub struct FileFilter {
    skip_extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            skip_extensions: config
                .skip_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    pub fn parsing_for_extension(&self, extension: &str) -> ExtensionParsing {
        let extension = normalize_extension(extension);
        if self.skip_extensions.contains(&extension) {
            ExtensionParsing::Skip {
                reason: format!(".{} files are not text", extension),
            }
        } else {
            ExtensionParsing::Read
        }
    }

    pub fn parsing_for_path(&self, path: &Path) -> ExtensionParsing {
        match path.extension().and_then(|s| s.to_str()) {
            Some(extension) => self.parsing_for_extension(extension),
            None => ExtensionParsing::Read,
        }
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}
