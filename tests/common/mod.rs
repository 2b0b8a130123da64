// tests/common/mod.rs
// In-memory doubles for the feed, the chat sink and the cursor store.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use kap_buyback_notifier::config::{FilterConfig, ScanConfig};
use kap_buyback_notifier::error::{DeliveryError, PersistenceError, UpstreamError};
use kap_buyback_notifier::feed::{DisclosureDetail, DisclosureFeed, DisclosureSummary, Localized, PageFilters};
use kap_buyback_notifier::notify::Notifier;
use kap_buyback_notifier::state::{CursorState, CursorStore, LoadOutcome};
use kap_buyback_notifier::{ScanDriver, ScanError, ScanReport};

// ---------- feed ----------

pub fn summary(index: u64, ty: Option<&str>, class: Option<&str>, title: &str) -> DisclosureSummary {
    DisclosureSummary {
        index,
        disclosure_type: ty.map(Into::into),
        disclosure_class: class.map(Into::into),
        title: Some(title.into()),
    }
}

pub fn detail(index: u64, sender: &str, subject: &str, summary_tr: &str) -> DisclosureDetail {
    DisclosureDetail {
        index,
        sender_title: Some(sender.into()),
        subject: Localized::tr(subject),
        summary: Localized::tr(summary_tr),
        time: Some("18.10.2026 10:00:00".into()),
        link: Some(format!("https://www.kap.org.tr/tr/Bildirim/{index}")),
        html_messages: Vec::new(),
    }
}

pub struct FakeFeed {
    pub head: u64,
    pub head_fails: bool,
    pub page_fails: bool,
    pub page_size: usize,
    /// Pages start this many indices below the requested start.
    pub overlap: u64,
    /// Returned for every page request when set (misbehaving feed).
    pub fixed_page: Option<Vec<DisclosureSummary>>,
    pub failing_details: HashSet<u64>,
    items: BTreeMap<u64, (DisclosureSummary, DisclosureDetail)>,
    pub page_calls: Mutex<Vec<u64>>,
    pub detail_calls: Mutex<Vec<u64>>,
    pub last_filters: Mutex<Option<PageFilters>>,
}

impl FakeFeed {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            head_fails: false,
            page_fails: false,
            page_size: 100,
            overlap: 0,
            fixed_page: None,
            failing_details: HashSet::new(),
            items: BTreeMap::new(),
            page_calls: Mutex::new(Vec::new()),
            detail_calls: Mutex::new(Vec::new()),
            last_filters: Mutex::new(None),
        }
    }

    pub fn item(mut self, s: DisclosureSummary, d: DisclosureDetail) -> Self {
        self.items.insert(s.index, (s, d));
        self
    }

    /// Target-category rows with nothing buyback-related anywhere.
    pub fn plain(mut self, range: std::ops::RangeInclusive<u64>) -> Self {
        for i in range {
            self = self.item(
                summary(i, Some("ODA"), Some("ODA"), "Finansal Rapor"),
                detail(i, "Plain Co", "Finansal Rapor", "Dönem sonu finansal tablolar"),
            );
        }
        self
    }

    /// Target-category row with a buyback title.
    pub fn buyback(self, index: u64, sender: &str) -> Self {
        self.item(
            summary(index, Some("ODA"), Some("ODA"), "Share Buyback Program"),
            detail(index, sender, "Pay Geri Alım Programı", "Program kapsamında işlem"),
        )
    }

    pub fn set_head(&mut self, head: u64) {
        self.head = head;
    }

    pub fn page_call_count(&self) -> usize {
        self.page_calls.lock().len()
    }
}

fn status(endpoint: &str, status: u16) -> UpstreamError {
    UpstreamError::Status {
        endpoint: endpoint.into(),
        status,
        body: "fake".into(),
    }
}

#[async_trait]
impl DisclosureFeed for FakeFeed {
    async fn head_index(&self) -> Result<u64, UpstreamError> {
        if self.head_fails {
            return Err(status("lastDisclosureIndex", 503));
        }
        Ok(self.head)
    }

    async fn page_from(
        &self,
        start_index: u64,
        filters: &PageFilters,
    ) -> Result<Vec<DisclosureSummary>, UpstreamError> {
        self.page_calls.lock().push(start_index);
        *self.last_filters.lock() = Some(filters.clone());
        if self.page_fails {
            return Err(status("disclosures", 500));
        }
        if let Some(page) = &self.fixed_page {
            return Ok(page.clone());
        }
        let from = start_index.saturating_sub(self.overlap);
        Ok(self
            .items
            .range(from..)
            .take(self.page_size)
            .map(|(_, (s, _))| s.clone())
            .collect())
    }

    async fn detail(&self, index: u64) -> Result<DisclosureDetail, UpstreamError> {
        self.detail_calls.lock().push(index);
        if self.failing_details.contains(&index) {
            return Err(status("disclosureDetail", 500));
        }
        self.items
            .get(&index)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| status("disclosureDetail", 404))
    }
}

// ---------- notifier ----------

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    /// Deliveries whose text contains this fail.
    pub fail_when_contains: Option<String>,
}

impl RecordingNotifier {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_when_contains: Some(needle.into()),
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        if let Some(needle) = &self.fail_when_contains {
            if message.contains(needle.as_str()) {
                return Err(DeliveryError::Rejected {
                    status: 400,
                    body: "chat not found".into(),
                });
            }
        }
        self.sent.lock().push(message.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// ---------- store ----------

#[derive(Default)]
pub struct MemoryStore {
    pub state: Mutex<Option<CursorState>>,
    pub corrupt: bool,
    pub fail_saves: bool,
    pub saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_cursor(index: u64) -> Self {
        Self {
            state: Mutex::new(Some(CursorState::new(index))),
            ..Self::default()
        }
    }

    pub fn cursor(&self) -> Option<u64> {
        self.state.lock().as_ref().map(|s| s.last_seen_index)
    }

    pub fn page_error_runs(&self) -> u32 {
        self.state.lock().as_ref().map_or(0, |s| s.page_error_runs)
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn load(&self) -> LoadOutcome {
        if self.corrupt {
            return LoadOutcome::Corrupt("expected value at line 1 column 1".into());
        }
        match *self.state.lock() {
            Some(s) => LoadOutcome::Loaded(s),
            None => LoadOutcome::Absent,
        }
    }

    async fn save(&self, state: &CursorState) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError {
                path: "memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        *self.state.lock() = Some(*state);
        *self.saves.lock() += 1;
        Ok(())
    }
}

// ---------- driver ----------

pub fn scan_cfg() -> ScanConfig {
    ScanConfig {
        request_delay: Duration::ZERO,
        ..ScanConfig::default()
    }
}

pub async fn run_scan(
    feed: &FakeFeed,
    notifier: &RecordingNotifier,
    store: &MemoryStore,
    cfg: &ScanConfig,
) -> Result<ScanReport, ScanError> {
    let mut driver = ScanDriver::new(feed, notifier, store, &FilterConfig::default(), cfg);
    driver.run().await
}
