// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact stderr logging. `RUST_LOG` wins; otherwise this crate logs at debug
/// when `verbose` is set and at info when not, other crates at warn.
pub fn init_tracing(verbose: bool) {
    let fallback = if verbose {
        "kap_buyback_notifier=debug,notify=debug,warn"
    } else {
        "kap_buyback_notifier=info,notify=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A second init (tests, probe binaries) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}
