// src/state.rs
//! The persisted scan cursor: one small JSON record, read at the start of a run
//! and overwritten at the end.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub last_seen_index: u64,
    pub updated_at_unix: i64,
    /// Consecutive runs whose first page request after the cursor failed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub page_error_runs: u32,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

impl CursorState {
    pub fn new(last_seen_index: u64) -> Self {
        Self {
            last_seen_index,
            updated_at_unix: Utc::now().timestamp(),
            page_error_runs: 0,
        }
    }

    pub fn with_page_error_runs(mut self, runs: u32) -> Self {
        self.page_error_runs = runs;
        self
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.updated_at_unix, 0)
    }
}

/// Result of reading the cursor. Loading never fails the caller; an unreadable
/// record is reported so the driver can decide how to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Absent,
    Loaded(CursorState),
    Corrupt(String),
}

impl LoadOutcome {
    /// Cursor to resume from, if there is a usable non-zero one.
    pub fn resume_from(&self) -> Option<u64> {
        match self {
            LoadOutcome::Loaded(s) if s.last_seen_index > 0 => Some(s.last_seen_index),
            _ => None,
        }
    }

    pub fn page_error_runs(&self) -> u32 {
        match self {
            LoadOutcome::Loaded(s) => s.page_error_runs,
            _ => 0,
        }
    }
}

#[async_trait]
pub trait CursorStore: Send + Sync {
    async fn load(&self) -> LoadOutcome;
    async fn save(&self, state: &CursorState) -> Result<(), PersistenceError>;
}

// Older state files were `{"last_seen": n}` with `null` before the first run.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRepr {
    Current {
        last_seen_index: u64,
        #[serde(default)]
        updated_at_unix: i64,
        #[serde(default)]
        page_error_runs: u32,
    },
    Legacy {
        #[serde(deserialize_with = "present_option")]
        last_seen: Option<u64>,
    },
}

// Unlike a plain `Option` field, the key itself must be there.
fn present_option<'de, D: serde::Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Option::<u64>::deserialize(d)
}

pub fn decode_state(raw: &str) -> LoadOutcome {
    if raw.trim().is_empty() {
        return LoadOutcome::Absent;
    }
    match serde_json::from_str::<StoredRepr>(raw) {
        Ok(StoredRepr::Current {
            last_seen_index,
            updated_at_unix,
            page_error_runs,
        }) => LoadOutcome::Loaded(CursorState {
            last_seen_index,
            updated_at_unix,
            page_error_runs,
        }),
        Ok(StoredRepr::Legacy { last_seen: Some(n) }) => LoadOutcome::Loaded(CursorState {
            last_seen_index: n,
            updated_at_unix: 0,
            page_error_runs: 0,
        }),
        Ok(StoredRepr::Legacy { last_seen: None }) => LoadOutcome::Absent,
        Err(e) => LoadOutcome::Corrupt(e.to_string()),
    }
}

/// Cursor kept in a JSON file, replaced atomically via temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn err(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CursorStore for JsonFileStore {
    async fn load(&self) -> LoadOutcome {
        match fs::read_to_string(&self.path).await {
            Ok(s) => decode_state(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LoadOutcome::Absent,
            Err(e) => LoadOutcome::Corrupt(format!("read {}: {e}", self.path.display())),
        }
    }

    async fn save(&self, state: &CursorState) -> Result<(), PersistenceError> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await.map_err(|e| self.err(e))?;
        }
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| self.err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let tmp = self.tmp_path();
        let mut f = fs::File::create(&tmp).await.map_err(|e| self.err(e))?;
        f.write_all(&bytes).await.map_err(|e| self.err(e))?;
        f.sync_all().await.map_err(|e| self.err(e))?;
        drop(f);
        fs::rename(&tmp, &self.path).await.map_err(|e| self.err(e))?;
        Ok(())
    }
}
