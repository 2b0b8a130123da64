// src/feed/mod.rs
pub mod kap;
pub mod types;

pub use kap::KapClient;
pub use types::{DisclosureDetail, DisclosureSummary, Localized};

use crate::error::UpstreamError;

/// Optional server-side narrowing for the page endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFilters {
    pub disclosure_type: Option<String>,
    pub disclosure_class: Option<String>,
}

/// Read access to the append-only disclosure feed.
///
/// Page size is decided upstream. A page may contain rows below the requested
/// start index and an empty page means there is nothing more to read.
#[async_trait::async_trait]
pub trait DisclosureFeed: Send + Sync {
    /// Highest disclosure index the feed currently knows about.
    async fn head_index(&self) -> Result<u64, UpstreamError>;

    async fn page_from(
        &self,
        start_index: u64,
        filters: &PageFilters,
    ) -> Result<Vec<DisclosureSummary>, UpstreamError>;

    async fn detail(&self, index: u64) -> Result<DisclosureDetail, UpstreamError>;
}
