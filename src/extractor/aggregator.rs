use crate::error::{ExtractorError, FailureKind, SourceError, UserFriendlyError};
use crate::extractor::address_source::AddressSource;
use crate::ui::signals::CancellationToken;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Set of extracted addresses, keyed by their folded form when case
/// insensitive. The first spelling seen is the one kept.
#[derive(Debug)]
pub struct UniqueAddressSet {
    entries: DashMap<String, String>,
    case_insensitive: bool,
}

impl UniqueAddressSet {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            entries: DashMap::new(),
            case_insensitive,
        }
    }

    fn key(&self, address: &str) -> String {
        if self.case_insensitive {
            address.to_lowercase()
        } else {
            address.to_string()
        }
    }

    /// Returns `true` when the address was not already present.
    pub fn insert(&self, address: &str) -> bool {
        match self.entries.entry(self.key(address)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(address.to_string());
                true
            }
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(&self.key(address))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Addresses ordered case-insensitively, ties broken by byte order.
    pub fn sorted(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        addresses.sort_by_cached_key(|address| (address.to_lowercase(), address.clone()));
        addresses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyStatus {
    Pending,
    Complete,
    Cancelled,
    Failed(FailureKind),
}

/// Per-file counter. The count is atomic so the extraction thread never
/// takes a lock to bump it.
#[derive(Debug)]
pub struct TallyEntry {
    path: PathBuf,
    count: AtomicU64,
    status: Mutex<TallyStatus>,
}

impl TallyEntry {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            count: AtomicU64::new(0),
            status: Mutex::new(TallyStatus::Pending),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> TallyStatus {
        *self.status.lock()
    }

    fn set_status(&self, status: TallyStatus) {
        *self.status.lock() = status;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyRecord {
    pub path: PathBuf,
    pub count: u64,
    pub status: TallyStatus,
}

/// One entry per file handed to the aggregator, in processing order.
/// Processing the same path twice yields two entries.
#[derive(Debug, Default)]
pub struct FileTally {
    entries: RwLock<Vec<Arc<TallyEntry>>>,
}

impl FileTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &Path) -> Arc<TallyEntry> {
        let entry = Arc::new(TallyEntry::new(path.to_path_buf()));
        self.entries.write().push(Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<TallyRecord> {
        self.entries
            .read()
            .iter()
            .map(|entry| TallyRecord {
                path: entry.path.clone(),
                count: entry.count(),
                status: entry.status(),
            })
            .collect()
    }

    pub fn total_count(&self) -> u64 {
        self.entries.read().iter().map(|entry| entry.count()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|entry| matches!(entry.status(), TallyStatus::Failed(_)))
            .count()
    }
}

/// Monotonic clock started on creation and frozen by the first `stop`.
#[derive(Debug)]
pub struct ElapsedClock {
    started: Instant,
    stopped: OnceLock<Duration>,
}

impl ElapsedClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            stopped: OnceLock::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.stopped
            .get()
            .copied()
            .unwrap_or_else(|| self.started.elapsed())
    }

    /// Freezes the reading. Later calls return the first frozen value.
    pub fn stop(&self) -> Duration {
        *self.stopped.get_or_init(|| self.started.elapsed())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get().is_some()
    }
}

/// Everything the extraction writes and the reporter and writer read.
#[derive(Debug)]
pub struct ExtractionState {
    pub addresses: UniqueAddressSet,
    pub tally: FileTally,
    pub clock: ElapsedClock,
}

impl ExtractionState {
    pub fn new(case_insensitive: bool) -> Self {
        Self {
            addresses: UniqueAddressSet::new(case_insensitive),
            tally: FileTally::new(),
            clock: ElapsedClock::start(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { files: usize, failed: usize },
    Cancelled { files_started: usize },
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled { .. })
    }
}

enum FileOutcome {
    Complete,
    Cancelled,
}

pub type FileObserver = Box<dyn Fn(usize, &Path) + Send + Sync>;

pub struct ExtractionAggregator {
    source: Box<dyn AddressSource>,
    state: Arc<ExtractionState>,
    observer: Option<FileObserver>,
}

impl ExtractionAggregator {
    pub fn new(source: Box<dyn AddressSource>, case_insensitive: bool) -> Self {
        Self {
            source,
            state: Arc::new(ExtractionState::new(case_insensitive)),
            observer: None,
        }
    }

    /// Called with the index and path of each file before it is opened.
    pub fn with_file_observer(mut self, observer: FileObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> &Arc<ExtractionState> {
        &self.state
    }

    /// Extract from `files` one after another. A file that cannot be read is
    /// recorded as failed in the tally and the run moves on to the next one.
    pub fn run(&self, files: &[PathBuf], cancellation: &CancellationToken) -> RunOutcome {
        let mut failed = 0;

        for (index, path) in files.iter().enumerate() {
            if cancellation.is_cancelled() {
                return RunOutcome::Cancelled { files_started: index };
            }

            if let Some(observer) = &self.observer {
                observer(index, path);
            }

            let entry = self.state.tally.register(path);

            match self.extract_file(path, &entry, cancellation) {
                Ok(FileOutcome::Complete) => {
                    entry.set_status(TallyStatus::Complete);
                    tracing::debug!(path = %path.display(), addresses = entry.count(), "file extracted");
                }
                Ok(FileOutcome::Cancelled) => {
                    entry.set_status(TallyStatus::Cancelled);
                    tracing::info!(path = %path.display(), addresses = entry.count(), "extraction cancelled mid-file");
                    return RunOutcome::Cancelled { files_started: index + 1 };
                }
                Err(source) => {
                    failed += 1;
                    entry.set_status(TallyStatus::Failed(source.kind()));
                    let err = ExtractorError::Source {
                        path: path.clone(),
                        source,
                    };
                    tracing::warn!(error = %err.user_message(), "skipping file");
                }
            }
        }

        RunOutcome::Completed {
            files: files.len(),
            failed,
        }
    }

    fn extract_file(
        &self,
        path: &Path,
        entry: &TallyEntry,
        cancellation: &CancellationToken,
    ) -> Result<FileOutcome, SourceError> {
        let stream = self.source.stream(path, cancellation)?;

        for item in stream {
            if cancellation.is_cancelled() {
                return Ok(FileOutcome::Cancelled);
            }

            let address = item?;
            self.state.addresses.insert(&address);
            entry.increment();
        }

        if cancellation.is_cancelled() {
            Ok(FileOutcome::Cancelled)
        } else {
            Ok(FileOutcome::Complete)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::address_source::{AddressStream, RegexAddressSource};
    use crate::scanner::FileFilter;
    use std::collections::HashMap;
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    /// In-memory source: path -> addresses, unknown paths fail with an IO error.
    struct StaticSource {
        files: HashMap<PathBuf, Vec<&'static str>>,
        cancel_after: Option<(PathBuf, usize, CancellationToken)>,
    }

    impl AddressSource for StaticSource {
        fn stream(
            &self,
            path: &Path,
            _cancellation: &CancellationToken,
        ) -> Result<AddressStream<'_>, SourceError> {
            let addresses = self.files.get(path).ok_or_else(|| {
                SourceError::Io(io::Error::new(io::ErrorKind::NotFound, "missing"))
            })?;

            let trigger = match &self.cancel_after {
                Some((p, n, token)) if p == path => Some((*n, token.clone())),
                _ => None,
            };

            Ok(Box::new(addresses.iter().enumerate().map(move |(i, a)| {
                if let Some((n, token)) = &trigger {
                    if i + 1 == *n {
                        token.cancel();
                    }
                }
                Ok(a.to_string())
            })))
        }
    }

    fn static_source(files: &[(&str, Vec<&'static str>)]) -> StaticSource {
        StaticSource {
            files: files
                .iter()
                .map(|(p, a)| (PathBuf::from(p), a.clone()))
                .collect(),
            cancel_after: None,
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_case_variants_fold_to_one_address() {
        let source = static_source(&[
            ("a.txt", vec!["Bob@X.com", "bob@x.com"]),
            ("b.txt", vec!["carol@y.com"]),
        ]);
        let aggregator = ExtractionAggregator::new(Box::new(source), true);

        let outcome = aggregator.run(&paths(&["a.txt", "b.txt"]), &CancellationToken::new());

        assert_eq!(outcome, RunOutcome::Completed { files: 2, failed: 0 });
        let state = aggregator.state();
        assert_eq!(state.addresses.sorted(), vec!["Bob@X.com", "carol@y.com"]);

        let tally = state.tally.snapshot();
        assert_eq!(tally[0].path, PathBuf::from("a.txt"));
        assert_eq!(tally[0].count, 2);
        assert_eq!(tally[0].status, TallyStatus::Complete);
        assert_eq!(tally[1].count, 1);
    }

    #[test]
    fn test_case_sensitive_set_keeps_variants() {
        let source = static_source(&[("a.txt", vec!["Bob@X.com", "bob@x.com"])]);
        let aggregator = ExtractionAggregator::new(Box::new(source), false);

        aggregator.run(&paths(&["a.txt"]), &CancellationToken::new());

        assert_eq!(aggregator.state().addresses.len(), 2);
    }

    #[test]
    fn test_empty_input_is_noop() {
        let aggregator = ExtractionAggregator::new(Box::new(static_source(&[])), true);

        let outcome = aggregator.run(&[], &CancellationToken::new());

        assert_eq!(outcome, RunOutcome::Completed { files: 0, failed: 0 });
        assert!(aggregator.state().addresses.is_empty());
        assert!(aggregator.state().tally.is_empty());
    }

    #[test]
    fn test_files_without_addresses_get_tally_entry() {
        let source = static_source(&[("empty.txt", vec![]), ("one.txt", vec!["a@b.com"])]);
        let aggregator = ExtractionAggregator::new(Box::new(source), true);

        aggregator.run(&paths(&["empty.txt", "one.txt"]), &CancellationToken::new());

        let tally = aggregator.state().tally.snapshot();
        assert_eq!(tally.len(), 2);
        assert_eq!(tally[0].count, 0);
        assert_eq!(tally[0].status, TallyStatus::Complete);
    }

    #[test]
    fn test_duplicate_paths_get_independent_entries() {
        let source = static_source(&[("a.txt", vec!["x@y.com", "z@y.com"])]);
        let aggregator = ExtractionAggregator::new(Box::new(source), true);

        aggregator.run(&paths(&["a.txt", "a.txt"]), &CancellationToken::new());

        let state = aggregator.state();
        assert_eq!(state.addresses.len(), 2);
        let counts: Vec<u64> = state.tally.snapshot().iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![2, 2]);
        assert_eq!(state.tally.total_count(), 4);
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let source = static_source(&[
            ("one.txt", vec!["one@example.com"]),
            ("two.txt", vec!["two@example.com"]),
            ("three.txt", vec!["three@example.com"]),
        ]);
        let aggregator = ExtractionAggregator::new(Box::new(source), true);

        let outcome = aggregator.run(
            &paths(&["one.txt", "missing.txt", "two.txt", "three.txt"]),
            &CancellationToken::new(),
        );

        assert_eq!(outcome, RunOutcome::Completed { files: 4, failed: 1 });
        let state = aggregator.state();
        assert_eq!(state.addresses.len(), 3);
        assert_eq!(state.tally.failed_count(), 1);
        assert_eq!(
            state.tally.snapshot()[1].status,
            TallyStatus::Failed(FailureKind::Io)
        );
    }

    #[test]
    fn test_cancellation_mid_file_keeps_partial_results() {
        let token = CancellationToken::new();
        let mut source = static_source(&[
            ("a.txt", vec!["a1@x.com", "a2@x.com"]),
            ("b.txt", vec!["b1@x.com", "b2@x.com", "b3@x.com", "b4@x.com"]),
            ("c.txt", vec!["c1@x.com"]),
        ]);
        source.cancel_after = Some((PathBuf::from("b.txt"), 2, token.clone()));
        let aggregator = ExtractionAggregator::new(Box::new(source), true);

        let outcome = aggregator.run(&paths(&["a.txt", "b.txt", "c.txt"]), &token);

        assert_eq!(outcome, RunOutcome::Cancelled { files_started: 2 });
        let state = aggregator.state();
        // The item produced alongside the cancel signal is never merged
        assert_eq!(state.addresses.sorted(), vec!["a1@x.com", "a2@x.com", "b1@x.com"]);

        let tally = state.tally.snapshot();
        assert_eq!(tally.len(), 2);
        assert_eq!(tally[1].count, 1);
        assert_eq!(tally[1].status, TallyStatus::Cancelled);
        assert!(!state.addresses.contains("c1@x.com"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let source = static_source(&[("a.txt", vec!["a@x.com"])]);
        let aggregator = ExtractionAggregator::new(Box::new(source), true);

        let outcome = aggregator.run(&paths(&["a.txt"]), &token);

        assert_eq!(outcome, RunOutcome::Cancelled { files_started: 0 });
        assert!(aggregator.state().tally.is_empty());
    }

    #[test]
    fn test_runs_are_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("b.txt");
        fs::write(&a, "Bob@X.com, bob@x.com\nalice@example.org").unwrap();
        fs::write(&b, "carol@y.com ALICE@example.org").unwrap();
        let files = vec![a, b];

        let run = || {
            let source = RegexAddressSource::new(FileFilter::default()).unwrap();
            let aggregator = ExtractionAggregator::new(Box::new(source), true);
            aggregator.run(&files, &CancellationToken::new());
            let state = Arc::clone(aggregator.state());
            (state.addresses.sorted(), state.tally.snapshot())
        };

        let (first_addresses, first_tally) = run();
        let (second_addresses, second_tally) = run();

        assert_eq!(first_addresses, vec!["alice@example.org", "Bob@X.com", "carol@y.com"]);
        assert_eq!(first_addresses, second_addresses);
        assert_eq!(first_tally, second_tally);
        assert_eq!(first_tally[0].count, 3);
        assert_eq!(first_tally[1].count, 2);
    }

    #[test]
    fn test_observer_sees_every_file() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let source = static_source(&[("a.txt", vec![]), ("b.txt", vec![])]);
        let aggregator = ExtractionAggregator::new(Box::new(source), true)
            .with_file_observer(Box::new(move |index, path| {
                seen_clone.lock().push((index, path.to_path_buf()));
            }));

        aggregator.run(&paths(&["a.txt", "b.txt"]), &CancellationToken::new());

        assert_eq!(
            *seen.lock(),
            vec![(0, PathBuf::from("a.txt")), (1, PathBuf::from("b.txt"))]
        );
    }

    #[test]
    fn test_clock_stops_once() {
        let clock = ElapsedClock::start();
        assert!(!clock.is_stopped());

        let first = clock.stop();
        std::thread::sleep(Duration::from_millis(5));
        let second = clock.stop();

        assert!(clock.is_stopped());
        assert_eq!(first, second);
        assert_eq!(clock.elapsed(), first);
    }

    #[test]
    fn test_set_reads_during_writes() {
        let set = Arc::new(UniqueAddressSet::new(true));
        let writer_set = Arc::clone(&set);

        let writer = std::thread::spawn(move || {
            for i in 0..1000 {
                writer_set.insert(&format!("user{}@example.com", i));
            }
        });

        let mut last = 0;
        while last < 1000 {
            let now = set.len();
            assert!(now >= last);
            last = now;
            if writer.is_finished() {
                last = set.len();
                break;
            }
        }
        writer.join().unwrap();

        assert_eq!(last, 1000);
        assert!(set.contains("USER999@EXAMPLE.COM"));
    }
}
