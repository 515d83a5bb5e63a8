use crate::extractor::ExtractionState;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Clone)]
pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_file_progress(&self, total_files: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_files));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} files {msg}"
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        );
        pb.set_message("Extracting addresses...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn update_file_progress(pb: &ProgressBar, index: usize, path: &Path) {
    pb.set_position(index as u64);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    pb.set_message(format!("Reading {}", name));
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Point-in-time reading of the shared extraction state. The fields are read
/// one after another, so they need not agree with each other exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub elapsed: Duration,
    pub unique_addresses: usize,
    pub addresses_seen: u64,
    pub files_seen: usize,
    pub files_failed: usize,
}

impl ProgressSnapshot {
    pub fn capture(state: &ExtractionState) -> Self {
        Self {
            elapsed: state.clock.elapsed(),
            unique_addresses: state.addresses.len(),
            addresses_seen: state.tally.total_count(),
            files_seen: state.tally.len(),
            files_failed: state.tally.failed_count(),
        }
    }

    /// Unique addresses per second; zero until a millisecond has passed.
    pub fn rate(&self) -> u64 {
        if self.elapsed < Duration::from_millis(1) {
            return 0;
        }
        (self.unique_addresses as f64 / self.elapsed.as_secs_f64()) as u64
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Extraction time: {}ms, Addresses extracted: {}, Extraction rate: {}/s, Files: {}",
            self.elapsed.as_millis(),
            self.unique_addresses,
            self.rate(),
            self.files_seen
        )
    }
}

/// Destination for progress readings.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, snapshot: &ProgressSnapshot);
}

/// Logs readings through `tracing`, pausing any progress bars while it writes.
pub struct TracingProgressSink {
    progress: Option<ProgressManager>,
}

impl TracingProgressSink {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn with_progress_manager(mut self, progress: ProgressManager) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl Default for TracingProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TracingProgressSink {
    fn emit(&self, snapshot: &ProgressSnapshot) {
        let log = || {
            tracing::info!(
                target: "addrex::progress",
                elapsed_ms = snapshot.elapsed.as_millis() as u64,
                unique_addresses = snapshot.unique_addresses,
                addresses_seen = snapshot.addresses_seen,
                rate_per_sec = snapshot.rate(),
                files = snapshot.files_seen,
                failed = snapshot.files_failed,
                "{}",
                snapshot
            );
        };

        match &self.progress {
            Some(progress) => progress.suspend(log),
            None => log(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Created,
    Running,
    Stopped,
}

struct RunningTimer {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Periodically emits a [`ProgressSnapshot`] of the extraction state.
///
/// The reporter only reads shared state, so whether it runs has no effect on
/// what gets extracted. Ticks continue after extraction finishes until
/// [`ProgressReporter::stop`] is called or the reporter is dropped.
pub struct ProgressReporter {
    state: Arc<ExtractionState>,
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    ticks: Arc<AtomicU64>,
    status: ReporterState,
    timer: Option<RunningTimer>,
}

impl ProgressReporter {
    pub fn new(state: Arc<ExtractionState>, interval: Duration, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            state,
            sink,
            interval: interval.max(Duration::from_millis(1)),
            ticks: Arc::new(AtomicU64::new(0)),
            status: ReporterState::Created,
            timer: None,
        }
    }

    /// Spawn the timer task on the current tokio runtime. The first reading
    /// is emitted one full interval after start.
    pub fn start(&mut self) {
        if self.status != ReporterState::Created {
            tracing::warn!(state = ?self.status, "progress reporter already started");
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let ticks = Arc::clone(&self.ticks);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = interval.tick() => {
                        let snapshot = ProgressSnapshot::capture(&state);
                        ticks.fetch_add(1, Ordering::Relaxed);
                        sink.emit(&snapshot);
                    }
                }
            }
        });

        self.timer = Some(RunningTimer {
            stop: stop_tx,
            handle,
        });
        self.status = ReporterState::Running;
    }

    /// Stop the timer and wait for the task to exit; no reading is emitted
    /// afterwards except through [`ProgressReporter::log`].
    pub async fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.stop.send(());
            if let Err(e) = timer.handle.await {
                tracing::warn!(error = %e, "progress reporter task ended abnormally");
            }
        }
        self.status = ReporterState::Stopped;
    }

    /// Emit a reading now, independent of the timer.
    pub fn log(&self) -> ProgressSnapshot {
        let snapshot = ProgressSnapshot::capture(&self.state);
        self.sink.emit(&snapshot);
        snapshot
    }

    pub fn status(&self) -> ReporterState {
        self.status
    }

    /// Number of timer-driven readings emitted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            let _ = timer.stop.send(());
            timer.handle.abort();
        }
    }
}
