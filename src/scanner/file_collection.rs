use crate::error::{format_bytes, Result};
use crate::scanner::file_filter::{ExtensionParsing, FileFilter};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Deduplicated list of concrete files to extract from, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct FileCollection {
    files: Vec<PathBuf>,
    case_insensitive: bool,
}

impl FileCollection {
    /// Expand `inputs` into files. Directories contribute their direct file
    /// children (no recursion). Inputs that do not exist are kept so that the
    /// extraction report lists them as unreadable.
    pub fn gather<P: AsRef<Path>>(inputs: &[P], case_insensitive: bool) -> Self {
        let mut collection = Self {
            files: Vec::new(),
            case_insensitive,
        };
        let mut seen = HashSet::new();

        for input in inputs {
            let input = input.as_ref();

            if input.is_dir() {
                for file in expand_directory(input) {
                    collection.push_unique(file, &mut seen);
                }
            } else {
                if !input.exists() {
                    tracing::warn!(path = %input.display(), "input path does not exist");
                }
                collection.push_unique(input.to_path_buf(), &mut seen);
            }
        }

        collection
    }

    fn push_unique(&mut self, path: PathBuf, seen: &mut HashSet<String>) {
        let key = if self.case_insensitive {
            path.to_string_lossy().to_lowercase()
        } else {
            path.to_string_lossy().into_owned()
        };

        if seen.insert(key) {
            self.files.push(path);
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.files.iter()
    }

    pub fn get_statistics(&self, filter: &FileFilter) -> ExtensionStatistics {
        let mut by_extension: HashMap<String, ExtensionInfo> = HashMap::new();
        let mut total_size = 0;

        for path in &self.files {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            total_size += size;

            let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
                continue;
            };
            let extension = extension.to_lowercase();

            let info = by_extension
                .entry(extension.clone())
                .or_insert_with(|| ExtensionInfo {
                    parsing: filter.parsing_for_extension(&extension),
                    extension,
                    count: 0,
                    bytes: 0,
                });
            info.count += 1;
            info.bytes += size;
        }

        let mut extensions: Vec<ExtensionInfo> = by_extension.into_values().collect();
        // Parsed extensions by file count first, skipped ones after
        extensions.sort_by(|a, b| {
            b.parsing
                .is_read()
                .cmp(&a.parsing.is_read())
                .then(b.count.cmp(&a.count))
                .then(a.extension.cmp(&b.extension))
        });

        ExtensionStatistics {
            total_files: self.files.len(),
            total_size,
            extensions,
        }
    }
}

impl<'a> IntoIterator for &'a FileCollection {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

fn expand_directory(dir: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(directory = %dir.display(), error = %err, "skipping unreadable directory entry");
            }
        }
    }
    files
}

/// Decide whether the filesystem holding `dir` compares names
/// case-insensitively, by creating a file and looking it up upper-cased.
pub fn detect_case_insensitive(dir: &Path) -> Result<bool> {
    let marker = tempfile::Builder::new()
        .prefix("addrex-case-check-")
        .tempfile_in(dir)?;

    let name = marker
        .path()
        .file_name()
        .map(|n| n.to_string_lossy().to_uppercase())
        .unwrap_or_default();

    Ok(dir.join(name).exists())
}

#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    pub extension: String,
    pub parsing: ExtensionParsing,
    pub count: usize,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct ExtensionStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub extensions: Vec<ExtensionInfo>,
}

impl ExtensionStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Found {} files ({}):\n",
            self.total_files,
            format_bytes(self.total_size)
        );

        for info in &self.extensions {
            summary.push_str(&format!(
                "  .{}: {} files : {}",
                info.extension,
                info.count,
                format_bytes(info.bytes)
            ));
            if let ExtensionParsing::Skip { reason } = &info.parsing {
                summary.push_str(&format!(", Skipping ({})", reason));
            }
            summary.push('\n');
        }

        summary
    }
}
