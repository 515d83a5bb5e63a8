pub mod progress;
pub mod output;
pub mod signals;

pub use progress::{ProgressManager, ProgressReporter, ProgressSink, ProgressSnapshot, TracingProgressSink};
pub use output::{OutputFormatter, OutputMode};
pub use signals::{CancellationToken, GracefulShutdown};
