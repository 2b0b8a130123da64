// src/config/keywords.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Buyback vocabulary used when neither `KEYWORDS` nor `KEYWORDS_PATH` is set.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "geri al",
    "geri alım",
    "geri alin",
    "geri alim",
    "geri alınan pay",
    "geri alinan pay",
    "payların geri alımı",
    "paylarin geri alimi",
    "share buyback",
    "buyback",
];

/// Accepted file contents: a bare list (JSON) or a `keywords` table (TOML or JSON).
#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordFile {
    List(Vec<String>),
    Table { keywords: Vec<String> },
}

impl KeywordFile {
    fn into_list(self) -> Vec<String> {
        match self {
            KeywordFile::List(v) | KeywordFile::Table { keywords: v } => clean_list(v),
        }
    }
}

/// Load keywords from `path`. `.toml` files are read as TOML, `.json` as JSON;
/// any other extension is tried as JSON first.
pub fn load_keywords_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading keywords from {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    let file = match ext.as_deref() {
        Some("toml") => toml::from_str::<KeywordFile>(&content)?,
        Some("json") => serde_json::from_str::<KeywordFile>(&content)?,
        _ => serde_json::from_str::<KeywordFile>(&content)
            .or_else(|_| toml::from_str::<KeywordFile>(&content))
            .map_err(|e| anyhow!("neither a JSON list nor a TOML `keywords` table: {e}"))?,
    };
    Ok(file.into_list())
}

/// Split a comma-separated list, e.g. from the `KEYWORDS` variable.
pub fn parse_keyword_csv(s: &str) -> Vec<String> {
    clean_list(s.split(',').map(str::to_string))
}

/// Trim, lowercase, drop empties, dedup. Order of first appearance is kept so
/// log output mirrors the configured list.
pub(crate) fn clean_list<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_is_trimmed_lowercased_and_deduped() {
        let v = parse_keyword_csv(" Buyback, ,SHARE BUYBACK,buyback ");
        assert_eq!(v, vec!["buyback".to_string(), "share buyback".to_string()]);
    }

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn file_forms_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml = write(&dir, "kw.toml", r#"keywords = [" Share Buyback ", "", "buyback"]"#);
        assert_eq!(load_keywords_from(&toml).unwrap(), vec!["share buyback", "buyback"]);

        let json = write(&dir, "kw.json", r#"["geri alım", "  geri alım  "]"#);
        assert_eq!(load_keywords_from(&json).unwrap(), vec!["geri alım"]);

        let table = write(&dir, "kw.json", r#"{"keywords": ["Repurchase"]}"#);
        assert_eq!(load_keywords_from(&table).unwrap(), vec!["repurchase"]);

        let bare = write(&dir, "keywords", r#"keywords = ["buyback"]"#);
        assert_eq!(load_keywords_from(&bare).unwrap(), vec!["buyback"]);
    }

    #[test]
    fn garbage_and_missing_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let txt = write(&dir, "kw.txt", "not a list");
        assert!(load_keywords_from(&txt).is_err());

        let wrong_shape = write(&dir, "kw.toml", r#"words = ["buyback"]"#);
        assert!(load_keywords_from(&wrong_shape).is_err());

        assert!(load_keywords_from(&dir.path().join("absent.toml")).is_err());
    }
}
