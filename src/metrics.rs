// src/metrics.rs
//! Run counters. The binary is a one-shot job, so instead of an HTTP scrape
//! endpoint the exposition text is written to a file for a textfile collector.

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

/// One-time metrics registration (so series show up in the exposition).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "kap_disclosures_evaluated_total",
            "New disclosures evaluated by the scan driver."
        );
        describe_counter!("kap_disclosure_matches_total", "Disclosures classified as buyback filings.");
        describe_counter!("kap_notifications_sent_total", "Alerts delivered to the chat sink.");
        describe_counter!(
            "kap_notification_failures_total",
            "Alerts that could not be delivered (not retried)."
        );
        describe_counter!(
            "kap_detail_fetch_errors_total",
            "Per-item detail fetches that failed and were skipped."
        );
        describe_gauge!("kap_cursor_last_seen_index", "Cursor written at the end of the run.");
        describe_gauge!("kap_run_last_ts", "Unix ts when the scan last finished.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Replace `path` with the current exposition text.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        std::fs::write(&tmp, self.render())
            .with_context(|| format!("writing metrics to {}", path.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("renaming metrics into {}", path.display()))?;
        Ok(())
    }
}
