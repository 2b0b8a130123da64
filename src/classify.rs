// src/classify.rs
//! Buyback classifier: a cheap category + title check on the page row, then a
//! keyword pass over assembled detail text when the title alone is not enough.
//!
//! Matching is lowercase substring search. No diacritic folding: `alım` and
//! `alim` are different keywords and both ship in the default list.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::FilterConfig;
use crate::feed::{DisclosureDetail, DisclosureSummary};

/// How many embedded HTML blocks contribute to the detail text.
pub const MAX_HTML_BLOCKS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Type and class both equal the configured target.
    Target,
    /// At least one of type/class is present and differs.
    Other,
    /// Upstream omitted type or class.
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TitleMatch,
    DetailMatch,
    NoMatch,
}

impl Verdict {
    pub fn is_match(self) -> bool {
        !matches!(self, Verdict::NoMatch)
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    target_type: String,
    target_class: String,
    keywords: Vec<String>,
}

impl Classifier {
    pub fn new(cfg: &FilterConfig) -> Self {
        Self {
            target_type: cfg.target_type.trim().to_string(),
            target_class: cfg.target_class.trim().to_string(),
            keywords: cfg.keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn category(&self, s: &DisclosureSummary) -> Category {
        let ty = s.disclosure_type.as_deref().map(str::trim);
        let class = s.disclosure_class.as_deref().map(str::trim);
        let differs = |got: Option<&str>, want: &str| got.is_some_and(|g| g != want);

        if differs(ty, &self.target_type) || differs(class, &self.target_class) {
            return Category::Other;
        }
        match (ty, class) {
            (Some(_), Some(_)) => Category::Target,
            _ => Category::Unknown,
        }
    }

    pub fn keyword_hit(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// Stage 1: target category and a keyword in the title.
    pub fn title_match(&self, s: &DisclosureSummary) -> bool {
        self.category(s) == Category::Target && self.keyword_hit(s.title.as_deref().unwrap_or_default())
    }

    /// Whether the row can still match and so deserves a detail fetch.
    pub fn is_candidate(&self, s: &DisclosureSummary) -> bool {
        self.category(s) != Category::Other
    }

    /// Decide on a page row plus already assembled detail text.
    pub fn matches(&self, s: &DisclosureSummary, detail_text: &str) -> bool {
        match self.category(s) {
            Category::Other => false,
            Category::Target if self.title_match(s) => true,
            Category::Target | Category::Unknown => self.keyword_hit(detail_text),
        }
    }

    /// Same as [`Classifier::matches`] but assembles the detail text only when
    /// the title did not already decide, and reports which stage hit.
    pub fn classify(&self, s: &DisclosureSummary, detail: &DisclosureDetail) -> Verdict {
        match self.category(s) {
            Category::Other => Verdict::NoMatch,
            Category::Target if self.title_match(s) => Verdict::TitleMatch,
            _ if self.keyword_hit(&detail_text(detail)) => Verdict::DetailMatch,
            _ => Verdict::NoMatch,
        }
    }
}

/// Concatenate subject, summary and the first few HTML blocks (TR and EN each).
pub fn detail_text(d: &DisclosureDetail) -> String {
    let mut parts: Vec<String> = Vec::new();
    for loc in [&d.subject, &d.summary] {
        parts.extend(loc.tr.iter().cloned());
        parts.extend(loc.en.iter().cloned());
    }
    for block in d.html_messages.iter().take(MAX_HTML_BLOCKS) {
        parts.extend(block.tr.as_deref().map(html_to_text));
        parts.extend(block.en.as_deref().map(html_to_text));
    }
    parts.retain(|p| !p.trim().is_empty());
    parts.join("\n")
}

/// Decode entities, drop tags, collapse whitespace.
pub fn html_to_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>|</?[^>]+>").expect("static regex"));
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("static regex"));

    // Tags go first so an encoded `&lt;` in the text survives as a literal.
    let stripped = re_tags.replace_all(s, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    re_ws.replace_all(&decoded, " ").trim().to_string()
}
