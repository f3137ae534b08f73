use std::env;

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

fn default_store_path() -> String {
    "saya-dictionaries.sqlite3".to_string()
}

fn default_parse_batch_size() -> usize {
    1000
}

fn default_persist_batch_size() -> usize {
    250
}

fn default_fast_search_limit() -> usize {
    50
}

fn default_bulk_lookup_limit() -> usize {
    100
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DictionaryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// SQLite file holding every imported dictionary
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Records handed to the import handler per parser batch
    #[serde(default = "default_parse_batch_size")]
    pub parse_batch_size: usize,
    /// Rows per insert transaction, kept below the parser batch size
    #[serde(default = "default_persist_batch_size")]
    pub persist_batch_size: usize,
    #[serde(default = "default_fast_search_limit")]
    pub fast_search_limit: usize,
    #[serde(default = "default_bulk_lookup_limit")]
    pub bulk_lookup_limit: usize,
}

impl DictionaryConfig {
    pub fn new() -> Self {
        let parse_batch_size = env_or("SAYA_PARSE_BATCH_SIZE", default_parse_batch_size()).max(1);
        let persist_batch_size = env_or("SAYA_PERSIST_BATCH_SIZE", default_persist_batch_size())
            .clamp(1, parse_batch_size);

        Self {
            enabled: default_enabled(),
            store_path: env::var("SAYA_STORE_PATH").unwrap_or_else(|_| default_store_path()),
            parse_batch_size,
            persist_batch_size,
            fast_search_limit: env_or("SAYA_FAST_SEARCH_LIMIT", default_fast_search_limit()),
            bulk_lookup_limit: env_or("SAYA_BULK_LOOKUP_LIMIT", default_bulk_lookup_limit()),
        }
    }

    /// Persist batches never exceed parser batches
    pub fn effective_persist_batch_size(&self) -> usize {
        self.persist_batch_size.clamp(1, self.parse_batch_size.max(1))
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            store_path: default_store_path(),
            parse_batch_size: default_parse_batch_size(),
            persist_batch_size: default_persist_batch_size(),
            fast_search_limit: default_fast_search_limit(),
            bulk_lookup_limit: default_bulk_lookup_limit(),
        }
    }
}
