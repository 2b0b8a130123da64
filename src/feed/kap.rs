// src/feed/kap.rs
//! HTTP client for the KAP disclosure API (HTTP Basic auth, JSON responses).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use super::types::{decode_detail, decode_head, decode_page, DisclosureDetail, DisclosureSummary};
use super::{DisclosureFeed, PageFilters};
use crate::config::FeedConfig;
use crate::error::{snippet, UpstreamError};
use crate::http::{send_with_retry, USER_AGENT};

pub struct KapClient {
    http: Client,
    cfg: FeedConfig,
}

impl KapClient {
    pub fn new(cfg: &FeedConfig) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.timeout)
            .build()
            .map_err(|source| UpstreamError::Transport {
                endpoint: "client".into(),
                source,
            })?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(format!("{}{}", self.cfg.base_url, path))
            .basic_auth(&self.cfg.api_key, Some(&self.cfg.api_secret))
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.cfg.timeout)
    }

    /// Send, require 2xx, and return the body text.
    async fn fetch(&self, endpoint: &str, req: RequestBuilder) -> Result<String, UpstreamError> {
        let rsp = send_with_retry(req, self.cfg.attempts, endpoint)
            .await
            .map_err(|source| UpstreamError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = rsp.status();
        let body = rsp.text().await.map_err(|source| UpstreamError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: snippet(&body),
            });
        }
        Ok(body)
    }
}

fn decode_err(endpoint: &str, e: serde_json::Error) -> UpstreamError {
    UpstreamError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl DisclosureFeed for KapClient {
    async fn head_index(&self) -> Result<u64, UpstreamError> {
        const EP: &str = "lastDisclosureIndex";
        let body = self.fetch(EP, self.get("/lastDisclosureIndex")).await?;
        decode_head(&body).map_err(|e| decode_err(EP, e))
    }

    async fn page_from(
        &self,
        start_index: u64,
        filters: &PageFilters,
    ) -> Result<Vec<DisclosureSummary>, UpstreamError> {
        const EP: &str = "disclosures";
        let mut query = vec![("disclosureIndex", start_index.to_string())];
        if let Some(t) = &filters.disclosure_type {
            query.push(("disclosureType", t.clone()));
        }
        if let Some(c) = &filters.disclosure_class {
            query.push(("disclosureClass", c.clone()));
        }
        let req = self.get("/disclosures").query(&query);
        let body = self.fetch(EP, req).await?;
        let items = decode_page(&body).map_err(|e| decode_err(EP, e))?;
        tracing::debug!(start_index, returned = items.len(), "page fetched");
        Ok(items)
    }

    async fn detail(&self, index: u64) -> Result<DisclosureDetail, UpstreamError> {
        const EP: &str = "disclosureDetail";
        let req = self
            .get(&format!("/disclosureDetail/{index}"))
            .query(&[("fileType", "html")]);
        let body = self.fetch(EP, req).await?;
        let mut detail = decode_detail(&body).map_err(|e| decode_err(EP, e))?;
        if detail.index == 0 {
            detail.index = index;
        }
        Ok(detail)
    }
}
