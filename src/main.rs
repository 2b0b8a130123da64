//! KAP buyback notifier: binary entrypoint.
//! Runs one scan of the disclosure feed and exits; schedule it with cron or a
//! systemd timer. Never run two instances against the same state file.
//!
//! Exit codes: 0 on success (also when single items failed), 1 when the run
//! failed (feed head unreachable, cursor not written), 2 on bad configuration.

use std::process::ExitCode;

use kap_buyback_notifier::logging::init_tracing;
use kap_buyback_notifier::metrics::Metrics;
use kap_buyback_notifier::{run_once, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env when present; no-op in production environments.
    let _ = dotenvy::dotenv();

    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(false);
            tracing::error!(error = %e, "configuration error, nothing was fetched");
            return ExitCode::from(2);
        }
    };
    init_tracing(cfg.verbose);
    tracing::debug!(config = ?cfg, "configuration loaded");

    let metrics = match cfg.metrics_textfile {
        Some(_) => match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = ?e, "metrics disabled");
                None
            }
        },
        None => None,
    };

    let code = match run_once(&cfg).await {
        Ok(report) => {
            if report.had_item_failures() {
                tracing::warn!(
                    detail_failures = report.detail_failures,
                    delivery_failures = report.delivery_failures,
                    "run finished with per-item failures"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("scan run failed: {e:#}");
            ExitCode::FAILURE
        }
    };

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_textfile) {
        if let Err(e) = m.write_textfile(path) {
            tracing::warn!(error = ?e, "metrics textfile not written");
        }
    }

    code
}
