// src/feed/types.rs
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Lightweight row from the page listing, used for the first-pass filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureSummary {
    /// 0 when the upstream row carried no usable index.
    #[serde(rename = "disclosureIndex", default, deserialize_with = "de_index")]
    pub index: u64,
    #[serde(rename = "disclosureType", default, deserialize_with = "de_opt_text")]
    pub disclosure_type: Option<String>,
    #[serde(rename = "disclosureClass", default, deserialize_with = "de_opt_text")]
    pub disclosure_class: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub title: Option<String>,
}

/// Full record for one disclosure, fetched only for candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureDetail {
    #[serde(rename = "disclosureIndex", default, deserialize_with = "de_index")]
    pub index: u64,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub sender_title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: Localized,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: Localized,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub html_messages: Vec<Localized>,
}

/// Text in Turkish and English. Upstream sends either a `{tr, en}` map or a bare
/// string, which is taken as Turkish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LocalizedRepr")]
pub struct Localized {
    pub tr: Option<String>,
    pub en: Option<String>,
}

impl Localized {
    pub fn tr(text: impl Into<String>) -> Self {
        Self {
            tr: Some(text.into()),
            en: None,
        }
    }

    /// Turkish if present and non-blank, else English.
    pub fn preferred(&self) -> Option<&str> {
        [self.tr.as_deref(), self.en.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LocalizedRepr {
    Text(String),
    Map {
        #[serde(default, alias = "TR")]
        tr: Option<String>,
        #[serde(default, alias = "EN")]
        en: Option<String>,
    },
}

impl From<LocalizedRepr> for Localized {
    fn from(r: LocalizedRepr) -> Self {
        match r {
            LocalizedRepr::Text(s) => Localized::tr(s),
            LocalizedRepr::Map { tr, en } => Localized { tr, en },
        }
    }
}

// --- response envelopes ---

#[derive(Deserialize)]
struct HeadResponse {
    #[serde(rename = "lastDisclosureIndex", deserialize_with = "de_index")]
    last: u64,
}

/// Largest index accepted from the feed (2^53 - 1). Anything above it cannot
/// have come through a JSON number intact.
pub const MAX_DISCLOSURE_INDEX: u64 = (1 << 53) - 1;

// The page endpoint answers with a bare list or wraps it under one known key.
// Rows stay raw here so one bad row cannot sink the page.
#[derive(Deserialize)]
#[serde(untagged)]
enum PageEnvelope {
    List(Vec<serde_json::Value>),
    Wrapped(WrappedPage),
}

#[derive(Deserialize)]
struct WrappedPage {
    #[serde(alias = "items", alias = "result", alias = "disclosures")]
    data: Vec<serde_json::Value>,
}

pub fn decode_head(body: &str) -> Result<u64, serde_json::Error> {
    serde_json::from_str::<HeadResponse>(body).map(|h| h.last)
}

/// Decode a page into one canonical list. Only an unrecognized envelope is an
/// error; rows without a usable index are logged and dropped.
pub fn decode_page(body: &str) -> Result<Vec<DisclosureSummary>, serde_json::Error> {
    let rows = match serde_json::from_str::<PageEnvelope>(body)? {
        PageEnvelope::List(v) => v,
        PageEnvelope::Wrapped(w) => w.data,
    };
    Ok(rows.into_iter().filter_map(decode_row).collect())
}

fn decode_row(row: serde_json::Value) -> Option<DisclosureSummary> {
    match DisclosureSummary::deserialize(&row) {
        Ok(d) if d.index == 0 => None,
        Ok(d) if d.index > MAX_DISCLOSURE_INDEX => {
            tracing::warn!(index = d.index, "disclosure index out of range, row dropped");
            None
        }
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!(error = %e, row = %crate::error::snippet(&row.to_string()), "unreadable page row dropped");
            None
        }
    }
}

pub fn decode_detail(body: &str) -> Result<DisclosureDetail, serde_json::Error> {
    serde_json::from_str(body)
}

// --- field helpers ---

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexRepr {
    Num(u64),
    Text(String),
}

fn de_index<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match Option::<IndexRepr>::deserialize(d)? {
        None => Ok(0),
        Some(IndexRepr::Num(n)) => Ok(n),
        Some(IndexRepr::Text(s)) if s.trim().is_empty() => Ok(0),
        Some(IndexRepr::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("disclosure index {s:?} is not a number"))),
    }
}

// Strings and numbers both become text; anything else is treated as absent.
fn de_opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<serde_json::Value>::deserialize(d)? {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}
