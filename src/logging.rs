use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

pub const LOG_ENV_VAR: &str = "ADDREX_LOG";

/// Install the stderr log subscriber.
///
/// `ADDREX_LOG` takes per-target levels, e.g. `ADDREX_LOG=addrex=debug,addrex::progress=warn`.
/// Without it the level is `addrex=info`, or `warn` in quiet mode. Only the
/// first call has any effect.
pub fn init_tracing(quiet: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet)));

        // A subscriber installed by the embedding application wins.
        let _ = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(filter)
            .try_init();
    });
}

fn default_directive(quiet: bool) -> &'static str {
    if quiet {
        "addrex=warn"
    } else {
        "addrex=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "addrex=info");
        assert_eq!(default_directive(true), "addrex=warn");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_tracing(true);
        init_tracing(false);
        tracing::info!("still fine");
    }
}
