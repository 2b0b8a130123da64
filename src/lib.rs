// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod classify;
pub mod config;
pub mod error;
pub mod feed;
mod http;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod scan;
pub mod state;

// ---- Re-exports for stable public API ----
pub use crate::config::Config;
pub use crate::error::{ConfigError, DeliveryError, PersistenceError, ScanError, UpstreamError};
pub use crate::scan::{RunOutcome, ScanDriver, ScanReport};

use anyhow::Context;

use crate::feed::KapClient;
use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
use crate::state::JsonFileStore;

/// Wire the HTTP feed, the chat sink (or the log sink in dry-run mode) and the
/// file cursor from `cfg`, then run one scan.
///
/// ```ignore
/// let cfg = kap_buyback_notifier::Config::from_env()?;
/// let report = kap_buyback_notifier::run_once(&cfg).await?;
/// ```
pub async fn run_once(cfg: &Config) -> anyhow::Result<ScanReport> {
    let feed = KapClient::new(&cfg.feed).context("building feed client")?;
    let notifier: Box<dyn Notifier> = if cfg.dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(TelegramNotifier::new(&cfg.telegram).context("building telegram client")?)
    };
    let store = JsonFileStore::new(&cfg.state_path);

    let mut driver = ScanDriver::new(&feed, notifier.as_ref(), &store, &cfg.filter, &cfg.scan);
    Ok(driver.run().await?)
}
