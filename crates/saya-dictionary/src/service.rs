use std::path::PathBuf;
use std::sync::Arc;

use saya_config::dictionary::DictionaryConfig;
use saya_core::dictionary::{DictionaryLookup, SearchOptions};
use saya_types::{DictionaryEntry, DictionaryMetadata, ImportProgress, SearchMode, TermAnnotations};
use tokio_util::sync::CancellationToken;

use crate::error::{ImportError, StoreError};
use crate::import::{ImportOutcome, ImportPipeline};
use crate::search::SearchEngine;
use crate::store::DictionaryStore;

/// Async entry point to the dictionary store.
///
/// Every call runs its blocking SQLite or parser work on the blocking pool,
/// so callers on the event loop never stall. Imports must be serialized by
/// the caller.
#[derive(Clone)]
pub struct DictionaryService {
    store: Arc<DictionaryStore>,
    engine: Arc<SearchEngine>,
    pipeline: Arc<ImportPipeline>,
}

impl DictionaryService {
    pub fn open(config: &DictionaryConfig) -> Result<Self, StoreError> {
        let store = Arc::new(DictionaryStore::open(&config.store_path)?);
        Ok(Self::with_store(store, config))
    }

    pub fn with_store(store: Arc<DictionaryStore>, config: &DictionaryConfig) -> Self {
        Self {
            engine: Arc::new(SearchEngine::new(store.clone(), config)),
            pipeline: Arc::new(ImportPipeline::new(store.clone(), config)),
            store,
        }
    }

    pub fn store(&self) -> &Arc<DictionaryStore> {
        &self.store
    }

    async fn blocking<T, F>(&self, task: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&DictionaryStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || task(&store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub async fn import_archive<P>(
        &self,
        bytes: Vec<u8>,
        mut progress: P,
        cancel: CancellationToken,
    ) -> Result<ImportOutcome, ImportError>
    where
        P: FnMut(ImportProgress) + Send + 'static,
    {
        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || pipeline.import_archive(&bytes, &mut progress, &cancel))
            .await
            .map_err(|e| ImportError::Join(e.to_string()))?
    }

    pub async fn import_archive_file<P>(
        &self,
        path: PathBuf,
        mut progress: P,
        cancel: CancellationToken,
    ) -> Result<ImportOutcome, ImportError>
    where
        P: FnMut(ImportProgress) + Send + 'static,
    {
        let pipeline = self.pipeline.clone();
        tokio::task::spawn_blocking(move || pipeline.import_file(&path, &mut progress, &cancel))
            .await
            .map_err(|e| ImportError::Join(e.to_string()))?
    }

    /// Never fails; see [`SearchEngine::search`]
    pub async fn search(
        &self,
        query: &str,
        profile_id: Option<i64>,
        mode: SearchMode,
    ) -> Vec<DictionaryEntry> {
        let engine = self.engine.clone();
        let query = query.to_string();
        match tokio::task::spawn_blocking(move || engine.search(&query, profile_id, mode)).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[SEARCH] Search task failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn bulk_exact_match(
        &self,
        terms: &[String],
        profile_id: Option<i64>,
    ) -> Vec<DictionaryEntry> {
        if terms.is_empty() {
            return Vec::new();
        }
        let engine = self.engine.clone();
        let terms: Vec<String> = terms.iter().take(engine.bulk_limit()).cloned().collect();
        match tokio::task::spawn_blocking(move || engine.bulk_exact_match(&terms, profile_id)).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[SEARCH] Bulk lookup task failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn delete_dictionary(&self, dictionary_id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .blocking(move |store| store.delete_dictionary(dictionary_id))
            .await?;
        if deleted {
            tracing::info!("[STORE] Deleted dictionary {}", dictionary_id);
        } else {
            tracing::warn!("[STORE] Dictionary {} not found for deletion", dictionary_id);
        }
        Ok(deleted)
    }

    /// Changes ranking only; the entry count is checked before and after and a
    /// mismatch is logged, not returned
    pub async fn update_dictionary_priority(
        &self,
        dictionary_id: i64,
        priority: i64,
    ) -> Result<(), StoreError> {
        self.blocking(move |store| {
            let before = store.entry_count(Some(dictionary_id))?;
            store.update_priority(dictionary_id, priority)?;
            let after = store.entry_count(Some(dictionary_id))?;
            if before != after {
                tracing::warn!(
                    "[STORE] Entry count of dictionary {} changed from {} to {} during a priority update",
                    dictionary_id,
                    before,
                    after
                );
            }
            Ok(())
        })
        .await
    }

    pub async fn get_entry_count(&self, dictionary_id: Option<i64>) -> Result<i64, StoreError> {
        self.blocking(move |store| store.entry_count(dictionary_id)).await
    }

    pub async fn list_dictionaries(&self) -> Result<Vec<DictionaryMetadata>, StoreError> {
        self.blocking(|store| store.list_dictionaries()).await
    }

    pub async fn term_annotations(&self, word: &str) -> Result<TermAnnotations, StoreError> {
        let word = word.to_string();
        self.blocking(move |store| {
            Ok(TermAnnotations {
                frequencies: store.frequencies_for(&word)?,
                pitch_accents: store.pitch_accents_for(&word)?,
            })
        })
        .await
    }
}

#[async_trait::async_trait]
impl DictionaryLookup for DictionaryService {
    async fn search(&self, query: &str, options: SearchOptions) -> Vec<DictionaryEntry> {
        DictionaryService::search(self, query, options.profile_id, options.mode).await
    }

    async fn bulk_exact_match(
        &self,
        terms: &[String],
        profile_id: Option<i64>,
    ) -> Vec<DictionaryEntry> {
        DictionaryService::bulk_exact_match(self, terms, profile_id).await
    }

    async fn entry_count(&self, dictionary_id: Option<i64>) -> i64 {
        self.get_entry_count(dictionary_id).await.unwrap_or_else(|e| {
            tracing::error!("[STORE] Entry count failed: {}", e);
            0
        })
    }

    async fn annotations(&self, word: &str) -> TermAnnotations {
        self.term_annotations(word).await.unwrap_or_else(|e| {
            tracing::error!("[STORE] Annotations for '{}' failed: {}", word, e);
            TermAnnotations::default()
        })
    }

    fn bulk_limit(&self) -> usize {
        self.engine.bulk_limit()
    }
}
