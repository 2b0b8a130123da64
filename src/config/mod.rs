// src/config/mod.rs
//! Process configuration, read once at startup and passed by reference afterwards.

pub mod keywords;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_KAP_BASE_URL: &str = "https://apigwdev.mkk.com.tr/api/vyk";
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_LINK_BASE: &str = "https://www.kap.org.tr/Bildirim/";
pub const DEFAULT_STATE_FILE: &str = "kap_state.json";
pub const DEFAULT_TARGET_CATEGORY: &str = "ODA";
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 300;
pub const DEFAULT_PAGE_ERROR_RUN_LIMIT: u32 = 3;

/// Upstream disclosure feed settings.
#[derive(Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
    /// Max attempts per call; 1 disables retry.
    pub attempts: u8,
    /// Send type/class to the page endpoint instead of filtering only locally.
    pub server_filter: bool,
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("attempts", &self.attempts)
            .field("server_filter", &self.server_filter)
            .finish()
    }
}

/// Chat sink settings.
#[derive(Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
    pub attempts: u8,
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("timeout", &self.timeout)
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// What counts as a buyback filing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub target_type: String,
    pub target_class: String,
    /// Already lowercased and deduplicated.
    pub keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            target_type: DEFAULT_TARGET_CATEGORY.to_string(),
            target_class: DEFAULT_TARGET_CATEGORY.to_string(),
            keywords: keywords::clean_list(
                keywords::DEFAULT_KEYWORDS.iter().map(|s| s.to_string()),
            ),
        }
    }
}

/// Knobs of the scan driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Idle time between consecutive network calls.
    pub request_delay: Duration,
    /// Stop after evaluating this many new items; the rest waits for the next run.
    pub max_items_per_run: Option<usize>,
    /// On cold start, scan this many indices below head instead of seeding.
    pub first_run_lookback: u64,
    /// Link prefix used when a detail record carries no link.
    pub link_base: String,
    pub server_filter: bool,
    /// After this many consecutive runs fail on the first page past the
    /// cursor, the cursor jumps to head.
    pub page_error_run_limit: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            max_items_per_run: None,
            first_run_lookback: 0,
            link_base: DEFAULT_LINK_BASE.to_string(),
            server_filter: false,
            page_error_run_limit: DEFAULT_PAGE_ERROR_RUN_LIMIT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub telegram: TelegramConfig,
    pub filter: FilterConfig,
    pub scan: ScanConfig,
    pub state_path: PathBuf,
    pub dry_run: bool,
    pub verbose: bool,
    pub metrics_textfile: Option<PathBuf>,
}

impl Config {
    /// Build from the process environment. Call after `dotenvy::dotenv()`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let server_filter = parse_bool(&get, "FEED_SERVER_FILTER")?.unwrap_or(false);

        let feed = FeedConfig {
            base_url: trim_slash(get("KAP_BASE_URL").unwrap_or_else(|| DEFAULT_KAP_BASE_URL.into())),
            api_key: required("KAP_API_KEY")?,
            api_secret: required("KAP_API_SECRET")?,
            timeout: Duration::from_secs(parse_num(&get, "HTTP_TIMEOUT_SECS")?.unwrap_or(30)),
            attempts: parse_attempts(&get, "HTTP_RETRIES")?,
            server_filter,
        };

        let telegram = TelegramConfig {
            api_base: trim_slash(
                get("TELEGRAM_API_BASE").unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.into()),
            ),
            bot_token: required("TELEGRAM_BOT_TOKEN")?,
            chat_id: required("TELEGRAM_CHAT_ID")?,
            timeout: Duration::from_secs(parse_num(&get, "NOTIFY_TIMEOUT_SECS")?.unwrap_or(20)),
            attempts: parse_attempts(&get, "NOTIFY_RETRIES")?,
        };

        let keywords = if let Some(path) = get("KEYWORDS_PATH") {
            let path = PathBuf::from(path);
            keywords::load_keywords_from(&path).map_err(|e| ConfigError::Keywords {
                path: path.clone(),
                reason: format!("{e:#}"),
            })?
        } else if let Some(csv) = get("KEYWORDS") {
            keywords::parse_keyword_csv(&csv)
        } else {
            FilterConfig::default().keywords
        };
        if keywords.is_empty() {
            return Err(ConfigError::NoKeywords);
        }

        let filter = FilterConfig {
            target_type: get("TARGET_TYPE").unwrap_or_else(|| DEFAULT_TARGET_CATEGORY.into()),
            target_class: get("TARGET_CLASS").unwrap_or_else(|| DEFAULT_TARGET_CATEGORY.into()),
            keywords,
        };

        let max_items_per_run = match parse_num::<usize>(&get, "MAX_ITEMS_PER_RUN")? {
            Some(0) => {
                return Err(ConfigError::Invalid {
                    key: "MAX_ITEMS_PER_RUN",
                    reason: "must be at least 1".into(),
                })
            }
            other => other,
        };

        let scan = ScanConfig {
            request_delay: Duration::from_millis(
                parse_num(&get, "REQUEST_DELAY_MS")?.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            ),
            max_items_per_run,
            first_run_lookback: parse_num(&get, "FIRST_RUN_LOOKBACK")?.unwrap_or(0),
            link_base: get("DISCLOSURE_LINK_BASE").unwrap_or_else(|| DEFAULT_LINK_BASE.into()),
            server_filter,
            page_error_run_limit: parse_num(&get, "PAGE_ERROR_RUN_LIMIT")?
                .unwrap_or(DEFAULT_PAGE_ERROR_RUN_LIMIT)
                .max(1),
        };

        Ok(Self {
            feed,
            telegram,
            filter,
            scan,
            state_path: PathBuf::from(get("STATE_FILE").unwrap_or_else(|| DEFAULT_STATE_FILE.into())),
            dry_run: parse_bool(&get, "DRY_RUN")?.unwrap_or(false),
            verbose: parse_bool(&get, "VERBOSE")?.unwrap_or(false),
            metrics_textfile: get("METRICS_TEXTFILE").map(PathBuf::from),
        })
    }
}

fn trim_slash(s: String) -> String {
    s.trim_end_matches('/').to_string()
}

fn parse_num<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: format!("{raw:?}: {e}"),
            })
        })
        .transpose()
}

fn parse_attempts(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<u8, ConfigError> {
    Ok(parse_num::<u8>(get, key)?.unwrap_or(1).max(1))
}

fn parse_bool(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            key,
            reason: format!("{raw:?} is not a boolean"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    const CREDS: &[(&str, &str)] = &[
        ("KAP_API_KEY", "key"),
        ("KAP_API_SECRET", "secret"),
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("TELEGRAM_CHAT_ID", "42"),
    ];

    #[test]
    fn defaults_fill_everything_but_credentials() {
        let cfg = Config::from_lookup(lookup(CREDS)).unwrap();
        assert_eq!(cfg.feed.base_url, DEFAULT_KAP_BASE_URL);
        assert_eq!(cfg.filter, FilterConfig::default());
        assert!(cfg.filter.keywords.contains(&"buyback".to_string()));
        assert_eq!(cfg.scan.request_delay, Duration::from_millis(300));
        assert_eq!(cfg.feed.attempts, 1);
        assert_eq!(cfg.scan.page_error_run_limit, 3);
        assert_eq!(cfg.state_path, PathBuf::from(DEFAULT_STATE_FILE));
        assert!(!cfg.dry_run);
    }

    #[test]
    fn missing_feed_secret_is_fatal() {
        let pairs: Vec<_> = CREDS
            .iter()
            .copied()
            .filter(|(k, _)| *k != "KAP_API_SECRET")
            .collect();
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("KAP_API_SECRET")));
    }

    #[test]
    fn blank_chat_id_counts_as_missing() {
        let mut pairs = CREDS.to_vec();
        pairs.retain(|(k, _)| *k != "TELEGRAM_CHAT_ID");
        pairs.push(("TELEGRAM_CHAT_ID", "   "));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TELEGRAM_CHAT_ID")));
    }

    #[test]
    fn bad_numbers_and_booleans_are_rejected() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("REQUEST_DELAY_MS", "soon"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::Invalid { key: "REQUEST_DELAY_MS", .. }
        ));

        let mut pairs = CREDS.to_vec();
        pairs.push(("VERBOSE", "maybe"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::Invalid { key: "VERBOSE", .. }
        ));

        let mut pairs = CREDS.to_vec();
        pairs.push(("MAX_ITEMS_PER_RUN", "0"));
        assert!(Config::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn keyword_csv_overrides_defaults() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("KEYWORDS", "Buyback, repurchase"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.filter.keywords, vec!["buyback", "repurchase"]);

        let mut pairs = CREDS.to_vec();
        pairs.push(("KEYWORDS", " , ,"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)).unwrap_err(),
            ConfigError::NoKeywords
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = Config::from_lookup(lookup(CREDS)).unwrap();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("secret\""));
        assert!(!dbg.contains("123:abc"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn bases_are_trimmed_and_counts_clamped_to_one() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("KAP_BASE_URL", "http://localhost:8080/api/"));
        pairs.push(("HTTP_RETRIES", "0"));
        pairs.push(("PAGE_ERROR_RUN_LIMIT", "0"));
        let cfg = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.feed.base_url, "http://localhost:8080/api");
        assert_eq!(cfg.feed.attempts, 1);
        assert_eq!(cfg.scan.page_error_run_limit, 1);
    }
}
