use crate::error::{ExtractorError, Result};
use crate::extractor::address_source::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub progress: ProgressConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Treat addresses differing only in case as the same address.
    pub fold_address_case: bool,
    /// Compare input paths case-insensitively. Detected from the filesystem when unset.
    pub case_insensitive_paths: Option<bool>,
    /// Extensions that are never parsed (reported as decode failures).
    pub skip_extensions: Vec<String>,
    /// Bytes read from a file per scan.
    pub read_buffer_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub addresses_file: PathBuf,
    pub report_file: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fold_address_case: true,
            case_insensitive_paths: None,
            skip_extensions: vec![
                "zip".to_string(),
                "gz".to_string(),
                "tgz".to_string(),
                "7z".to_string(),
                "rar".to_string(),
                "pdf".to_string(),
                "doc".to_string(),
                "xls".to_string(),
                "exe".to_string(),
                "dll".to_string(),
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "gif".to_string(),
            ],
            read_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            addresses_file: PathBuf::from("addresses_output.txt"),
            report_file: PathBuf::from("report.txt"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExtractorError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ExtractorError::Config {
                message: format!("Failed to read config file {}: {}", path.display(), e),
            })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ExtractorError::Config {
                message: format!("Failed to parse config file {}: {}", path.display(), e),
            })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["addrex.toml", ".addrex.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref output) = cli_args.addresses_file {
            self.output.addresses_file = output.clone();
        }

        if let Some(ref report) = cli_args.report_file {
            self.output.report_file = report.clone();
        }

        if let Some(interval) = cli_args.interval_secs {
            self.progress.interval_secs = interval;
        }

        if cli_args.case_sensitive {
            self.extraction.fold_address_case = false;
        }

        if cli_args.disable_progress {
            self.progress.enabled = false;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config {
                message: format!("Failed to serialize config: {}", e),
            })?;

        std::fs::write(path, content)
            .map_err(|e| ExtractorError::Config {
                message: format!("Failed to write config file {}: {}", path.display(), e),
            })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.progress.enabled && self.progress.interval_secs == 0 {
            return Err(ExtractorError::Config {
                message: "Progress interval must be greater than 0 seconds".to_string(),
            });
        }

        if self.extraction.read_buffer_size < MIN_BUFFER_SIZE {
            return Err(ExtractorError::Config {
                message: format!(
                    "Read buffer size must be at least {} bytes",
                    MIN_BUFFER_SIZE
                ),
            });
        }

        if self.output.addresses_file.as_os_str().is_empty() {
            return Err(ExtractorError::Config {
                message: "Output file path must not be empty".to_string(),
            });
        }

        if self.output.report_file.as_os_str().is_empty() {
            return Err(ExtractorError::Config {
                message: "Report file path must not be empty".to_string(),
            });
        }

        if self.output.addresses_file == self.output.report_file {
            return Err(ExtractorError::Config {
                message: format!(
                    "Output and report must be different files: {}",
                    self.output.report_file.display()
                ),
            });
        }

        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress.interval_secs)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub addresses_file: Option<PathBuf>,
    pub report_file: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub case_sensitive: bool,
    pub disable_progress: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addresses_file(mut self, path: Option<PathBuf>) -> Self {
        self.addresses_file = path;
        self
    }

    pub fn with_report_file(mut self, path: Option<PathBuf>) -> Self {
        self.report_file = path;
        self
    }

    pub fn with_interval(mut self, interval_secs: Option<u64>) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_progress_disabled(mut self, disabled: bool) -> Self {
        self.disable_progress = disabled;
        self
    }
}
