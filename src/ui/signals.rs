use crate::error::{ExtractorError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the extraction thread and
/// whoever may ask it to stop. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ExtractorError::Cancelled);
        }
        Ok(())
    }
}

pub struct GracefulShutdown {
    token: CancellationToken,
    shutdown_message_shown: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let token = CancellationToken::new();
        let shutdown_message_shown = Arc::new(AtomicBool::new(false));

        let token_clone = token.clone();
        let message_shown_clone = shutdown_message_shown.clone();

        // First Ctrl+C cancels, the second one exits immediately
        ctrlc::set_handler(move || {
            token_clone.cancel();

            if !message_shown_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nStopping extraction, partial results will be saved... (press Ctrl+C again to force exit)");
            } else {
                eprintln!("\nForce stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| ExtractorError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })?;

        Ok(Self {
            token,
            shutdown_message_shown,
        })
    }

    /// Create a GracefulShutdown instance for testing (no signal handler registration)
    pub fn new_for_test() -> Self {
        Self {
            token: CancellationToken::new(),
            shutdown_message_shown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn check_shutdown(&self) -> Result<()> {
        self.token.check()
    }

    pub fn request_shutdown(&self) {
        self.token.cancel();
    }

    pub fn message_shown(&self) -> bool {
        self.shutdown_message_shown.load(Ordering::SeqCst)
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::new_for_test())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();

        assert!(!clone.is_cancelled());
        assert!(clone.check().is_ok());

        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(ExtractorError::Cancelled)));
    }

    #[test]
    fn test_shutdown_state_management() {
        let shutdown = GracefulShutdown::new_for_test();

        assert!(shutdown.is_running());
        assert!(shutdown.check_shutdown().is_ok());
        assert!(!shutdown.message_shown());

        let token = shutdown.token();
        shutdown.request_shutdown();
        assert!(!shutdown.is_running());
        assert!(token.is_cancelled());
        assert!(shutdown.check_shutdown().is_err());
    }

    #[test]
    fn test_token_cancelled_from_other_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();

        std::thread::spawn(move || remote.cancel()).join().unwrap();

        assert!(token.is_cancelled());
    }
}
