use crate::error::{ExtractorError, Result};
use crate::extractor::aggregator::{ExtractionState, FileTally, TallyStatus, UniqueAddressSet};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSummary {
    pub addresses_written: usize,
    pub report_lines: usize,
}

/// Writes the address list and the per-file report.
pub struct OutputManager {
    addresses_path: PathBuf,
    report_path: PathBuf,
}

impl OutputManager {
    pub fn new<A: Into<PathBuf>, R: Into<PathBuf>>(addresses_path: A, report_path: R) -> Self {
        Self {
            addresses_path: addresses_path.into(),
            report_path: report_path.into(),
        }
    }

    pub fn addresses_path(&self) -> &Path {
        &self.addresses_path
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn save(&self, state: &ExtractionState) -> Result<SaveSummary> {
        let addresses_written = write_addresses(&self.addresses_path, &state.addresses)?;
        let report_lines = write_report(&self.report_path, &state.tally)?;

        tracing::debug!(
            addresses = %self.addresses_path.display(),
            report = %self.report_path.display(),
            addresses_written,
            report_lines,
            "results saved"
        );

        Ok(SaveSummary {
            addresses_written,
            report_lines,
        })
    }
}

/// One address per line, sorted. Returns the number of addresses written.
pub fn write_addresses(path: &Path, addresses: &UniqueAddressSet) -> Result<usize> {
    let sorted = addresses.sorted();
    write_lines(path, sorted.iter().map(String::as_str))?;
    Ok(sorted.len())
}

/// `<file-path>,<count>` per processed file, or `<file-path>,error:<kind>`
/// for files that could not be read.
pub fn write_report(path: &Path, tally: &FileTally) -> Result<usize> {
    let lines: Vec<String> = tally
        .snapshot()
        .iter()
        .map(|record| match record.status {
            TallyStatus::Failed(kind) => {
                format!("{},error:{}", record.path.display(), kind.as_str())
            }
            _ => format!("{},{}", record.path.display(), record.count),
        })
        .collect();

    write_lines(path, lines.iter().map(String::as_str))?;
    Ok(lines.len())
}

fn write_lines<'a, I>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let write_error = |source: std::io::Error| ExtractorError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
    }

    let file = fs::File::create(path).map_err(write_error)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file);

    for line in lines {
        writeln!(writer, "{}", line).map_err(write_error)?;
    }

    writer.flush().map_err(write_error)?;
    Ok(())
}
