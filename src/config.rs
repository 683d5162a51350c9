// src/config.rs

use crate::notifier::RetryPolicy;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Rental search, newest first, prices in rubles.
const DEFAULT_BASE_URL: &str = "https://www.cian.ru/cat.php?currency=2&engine_version=2&type=4&deal_type=rent&sort=creation_date_desc";
const DEFAULT_MAX_PAGES: usize = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Invalid search URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Search filters. Anything not listed here is passed through as `key=value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub district: Vec<u32>,
    #[serde(default)]
    pub street: Vec<u32>,
    #[serde(default)]
    pub rooms: Vec<u8>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            district: Vec::new(),
            street: Vec::new(),
            rooms: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub request_timeout_secs: u64,
    /// Pause before every page after the first.
    pub page_delay_ms: u64,
    /// Download attempts per page before the crawl gives up.
    pub attempts: u32,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            page_delay_ms: 2000,
            attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: Option<String>,
    #[serde(default, deserialize_with = "ids_as_strings")]
    pub chat_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            max_pages: DEFAULT_MAX_PAGES,
            fetch: FetchSettings::default(),
            telegram: TelegramSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

/// Chat ids show up as numbers or strings depending on who wrote the file.
fn ids_as_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(value_to_param).collect())
}

fn value_to_param(v: Value) -> String {
    match v {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

impl AppConfig {
    /// Reads the JSON config, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&text)?
            }
            None => AppConfig::default(),
        };
        Ok(cfg)
    }

    /// `BOT_TOKEN` and `TELEGRAM_CHAT_IDS` (comma separated) win over the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("BOT_TOKEN").filter(|t| !t.trim().is_empty()) {
            log::info!("🔑 Using bot token from BOT_TOKEN environment variable");
            self.telegram.token = Some(token.trim().to_string());
        }
        if let Some(ids) = lookup("TELEGRAM_CHAT_IDS") {
            let ids: Vec<String> = ids
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !ids.is_empty() {
                self.telegram.chat_ids = ids;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }
        search_url(&self.search)?;
        Ok(())
    }
}

/// Builds the first-page search URL from the filters.
pub fn search_url(search: &SearchConfig) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&search.base_url)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (i, district) in search.district.iter().enumerate() {
            pairs.append_pair(&format!("district[{i}]"), &district.to_string());
        }
        for (i, street) in search.street.iter().enumerate() {
            pairs.append_pair(&format!("street[{i}]"), &street.to_string());
        }
        for room in &search.rooms {
            pairs.append_pair(&format!("room{room}"), "1");
        }
        for (key, value) in &search.extra {
            pairs.append_pair(key, &value_to_param(value.clone()));
        }
    }
    Ok(url)
}

/// Same search, page `page` (1-based).
pub fn page_url(query: &str, page: usize) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(query)?;
    url.query_pairs_mut().append_pair("p", &page.to_string());
    Ok(url)
}
