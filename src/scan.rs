// src/scan.rs
//! Incremental scan over the disclosure feed.
//!
//! One run: load cursor → read feed head → either seed the cursor (cold start,
//! no alerts) or walk pages forward from `cursor + 1`, classify new rows, alert
//! on matches, and finally write the cursor back. The cursor write happens
//! whatever individual items did; only a head-index or cursor-write failure
//! ends the run early. When the first page past the cursor fails, the cursor
//! holds for a bounded number of runs and then jumps to head.

use metrics::{counter, gauge};
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::classify::{Classifier, Verdict};
use crate::config::{FilterConfig, ScanConfig};
use crate::error::ScanError;
use crate::feed::{DisclosureFeed, DisclosureSummary, PageFilters};
use crate::metrics::ensure_metrics_described;
use crate::notify::{format_alert, AlertPayload, Notifier};
use crate::state::{CursorState, CursorStore, LoadOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No usable cursor: cursor set to head, nothing scanned.
    Seeded,
    /// Head has not moved past the cursor.
    NothingNew,
    Scanned,
}

/// Why the page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Empty page: the feed has nothing more.
    Exhausted,
    /// A page brought nothing at or past the walk pointer, or the index
    /// space ran out.
    Stalled,
    /// `max_items_per_run` reached; the rest waits for the next run.
    ItemLimit,
    /// A page request failed.
    PageError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub outcome: RunOutcome,
    pub head: u64,
    pub cursor_before: Option<u64>,
    pub cursor_after: u64,
    pub stop: Option<StopReason>,
    pub pages: usize,
    pub evaluated: usize,
    pub matched: usize,
    pub notified: usize,
    pub delivery_failures: usize,
    pub detail_failures: usize,
    /// Consecutive failed-first-page runs carried into the saved state.
    pub page_error_runs: u32,
}

impl ScanReport {
    fn new(outcome: RunOutcome, head: u64, cursor_before: Option<u64>) -> Self {
        Self {
            outcome,
            head,
            cursor_before,
            cursor_after: cursor_before.unwrap_or(0),
            stop: None,
            pages: 0,
            evaluated: 0,
            matched: 0,
            notified: 0,
            delivery_failures: 0,
            detail_failures: 0,
            page_error_runs: 0,
        }
    }

    pub fn had_item_failures(&self) -> bool {
        self.delivery_failures > 0 || self.detail_failures > 0
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            RunOutcome::Seeded => write!(
                f,
                "first run: cursor seeded at {}, no notifications sent",
                self.cursor_after
            ),
            RunOutcome::NothingNew => write!(
                f,
                "nothing new (head {}, cursor {})",
                self.head, self.cursor_after
            ),
            RunOutcome::Scanned => write!(
                f,
                "scanned {} new disclosures, cursor {} -> {}: {} matched, {} notified, {} delivery failures, {} detail failures",
                self.evaluated,
                self.cursor_before.unwrap_or(0),
                self.cursor_after,
                self.matched,
                self.notified,
                self.delivery_failures,
                self.detail_failures
            ),
        }
    }
}

/// Keeps at least `delay` between consecutive network calls.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    last: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

struct Walk {
    max_processed: Option<u64>,
    stop: StopReason,
}

pub struct ScanDriver<'a> {
    feed: &'a dyn DisclosureFeed,
    notifier: &'a dyn Notifier,
    store: &'a dyn CursorStore,
    classifier: Classifier,
    cfg: ScanConfig,
    filters: PageFilters,
    pacer: Pacer,
}

impl<'a> ScanDriver<'a> {
    pub fn new(
        feed: &'a dyn DisclosureFeed,
        notifier: &'a dyn Notifier,
        store: &'a dyn CursorStore,
        filter: &FilterConfig,
        cfg: &ScanConfig,
    ) -> Self {
        let filters = if cfg.server_filter {
            PageFilters {
                disclosure_type: Some(filter.target_type.clone()),
                disclosure_class: Some(filter.target_class.clone()),
            }
        } else {
            PageFilters::default()
        };
        Self {
            feed,
            notifier,
            store,
            classifier: Classifier::new(filter),
            cfg: cfg.clone(),
            filters,
            pacer: Pacer::new(cfg.request_delay),
        }
    }

    /// Execute one complete pass.
    pub async fn run(&mut self) -> Result<ScanReport, ScanError> {
        ensure_metrics_described();

        let (resume, prior_page_errors) = match self.store.load().await {
            LoadOutcome::Corrupt(reason) => {
                warn!(%reason, "cursor unreadable, treating this run as a cold start");
                (None, 0)
            }
            other => (other.resume_from(), other.page_error_runs()),
        };

        self.pacer.wait().await;
        let head = self.feed.head_index().await?;
        debug!(head, cursor = ?resume, "feed head read");

        let last_seen = match resume {
            Some(cursor) => cursor,
            None if self.cfg.first_run_lookback == 0 || head == 0 => return self.seed(head).await,
            None => {
                let from = head.saturating_sub(self.cfg.first_run_lookback);
                info!(head, from, "cold start with lookback");
                from
            }
        };

        let mut report = if head <= last_seen {
            ScanReport::new(RunOutcome::NothingNew, head, resume)
        } else {
            let mut report = ScanReport::new(RunOutcome::Scanned, head, resume);
            let walk = self.walk(last_seen, &mut report).await;
            report.stop = Some(walk.stop);
            report.cursor_after = match (walk.max_processed, walk.stop) {
                (Some(m), _) => m,
                (None, StopReason::PageError) => {
                    let failed_runs = prior_page_errors.saturating_add(1);
                    if failed_runs >= self.cfg.page_error_run_limit {
                        warn!(
                            failed_runs,
                            skipped_from = last_seen.saturating_add(1),
                            head,
                            "first page keeps failing, moving cursor to head"
                        );
                        head
                    } else {
                        report.page_error_runs = failed_runs;
                        last_seen
                    }
                }
                (None, _) => head,
            };
            report
        };
        report.cursor_after = report.cursor_after.max(last_seen);

        self.finalize(&report).await?;
        info!("{report}");
        Ok(report)
    }

    async fn seed(&mut self, head: u64) -> Result<ScanReport, ScanError> {
        let mut report = ScanReport::new(RunOutcome::Seeded, head, None);
        report.cursor_after = head;
        self.finalize(&report).await?;
        info!("{report}");
        Ok(report)
    }

    async fn finalize(&mut self, report: &ScanReport) -> Result<(), ScanError> {
        let state = CursorState::new(report.cursor_after).with_page_error_runs(report.page_error_runs);
        self.store.save(&state).await?;
        gauge!("kap_cursor_last_seen_index").set(report.cursor_after as f64);
        gauge!("kap_run_last_ts").set(chrono::Utc::now().timestamp() as f64);
        Ok(())
    }

    /// Page loop from `last_seen + 1`. Per-item problems are counted in
    /// `report` and never abort the walk.
    async fn walk(&mut self, last_seen: u64, report: &mut ScanReport) -> Walk {
        let Some(mut walk_ptr) = last_seen.checked_add(1) else {
            return Walk {
                max_processed: None,
                stop: StopReason::Stalled,
            };
        };
        let mut max_processed: Option<u64> = None;
        let mut evaluated: HashSet<u64> = HashSet::new();

        loop {
            self.pacer.wait().await;
            let page = match self.feed.page_from(walk_ptr, &self.filters).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, walk_ptr, "page fetch failed, ending scan early");
                    return Walk {
                        max_processed,
                        stop: StopReason::PageError,
                    };
                }
            };
            report.pages += 1;

            let Some(batch_max) = page.iter().map(|d| d.index).max() else {
                debug!(walk_ptr, "empty page, feed exhausted");
                return Walk {
                    max_processed,
                    stop: StopReason::Exhausted,
                };
            };

            let mut fresh: Vec<DisclosureSummary> = page
                .into_iter()
                .filter(|d| d.index > last_seen && !evaluated.contains(&d.index))
                .collect();
            fresh.sort_by_key(|d| d.index);
            fresh.dedup_by_key(|d| d.index);

            for item in fresh {
                if self
                    .cfg
                    .max_items_per_run
                    .is_some_and(|limit| report.evaluated >= limit)
                {
                    info!(limit = report.evaluated, "per-run item limit reached");
                    return Walk {
                        max_processed,
                        stop: StopReason::ItemLimit,
                    };
                }

                self.evaluate(&item, report).await;
                evaluated.insert(item.index);
                report.evaluated += 1;
                counter!("kap_disclosures_evaluated_total").increment(1);
                max_processed = Some(max_processed.map_or(item.index, |m| m.max(item.index)));
            }

            let next = batch_max.checked_add(1).filter(|_| batch_max >= walk_ptr);
            let Some(next) = next else {
                warn!(walk_ptr, batch_max, "feed did not advance, stopping");
                return Walk {
                    max_processed,
                    stop: StopReason::Stalled,
                };
            };
            walk_ptr = next;
        }
    }

    /// Classify one new row and alert on a match.
    async fn evaluate(&mut self, item: &DisclosureSummary, report: &mut ScanReport) {
        if !self.classifier.is_candidate(item) {
            debug!(index = item.index, "category mismatch, skipped");
            return;
        }

        self.pacer.wait().await;
        let detail = match self.feed.detail(item.index).await {
            Ok(d) => d,
            Err(e) => {
                warn!(index = item.index, error = %e, "detail fetch failed, skipping item");
                report.detail_failures += 1;
                counter!("kap_detail_fetch_errors_total").increment(1);
                return;
            }
        };

        let verdict = self.classifier.classify(item, &detail);
        if !verdict.is_match() {
            debug!(index = item.index, "no keyword match");
            return;
        }
        report.matched += 1;
        counter!("kap_disclosure_matches_total").increment(1);
        info!(
            index = item.index,
            stage = if verdict == Verdict::TitleMatch { "title" } else { "detail" },
            sender = detail.sender_title.as_deref().unwrap_or_default(),
            "buyback disclosure matched"
        );

        let message = format_alert(&AlertPayload::from_detail(item.index, &detail, &self.cfg.link_base));
        self.pacer.wait().await;
        match self.notifier.send(&message).await {
            Ok(()) => {
                report.notified += 1;
                counter!("kap_notifications_sent_total").increment(1);
            }
            Err(e) => {
                // Not retried and not re-queued: the cursor still moves past it.
                warn!(index = item.index, sink = self.notifier.name(), error = %e, "alert delivery failed");
                report.delivery_failures += 1;
                counter!("kap_notification_failures_total").increment(1);
            }
        }
    }
}
