use saya_types::{DictionaryEntry, SearchMode, TermAnnotations};

/// Read side of the dictionary store, as seen by the OCR flow and the browser UI.
///
/// Every method is best-effort: failures are logged by the implementation and
/// surface as empty results so a live-typing loop never sees an error.
#[async_trait::async_trait]
pub trait DictionaryLookup: Send + Sync {
    /// Ranked search over term, reading and (full mode) definition
    async fn search(&self, query: &str, options: SearchOptions) -> Vec<DictionaryEntry>;

    /// Exact term equality for a batch of words, unranked
    async fn bulk_exact_match(
        &self,
        terms: &[String],
        profile_id: Option<i64>,
    ) -> Vec<DictionaryEntry>;

    /// Entry rows for one dictionary, or across all of them
    async fn entry_count(&self, dictionary_id: Option<i64>) -> i64;

    /// Frequency and pitch-accent facts for one word
    async fn annotations(&self, word: &str) -> TermAnnotations;

    /// Largest term batch accepted by `bulk_exact_match`
    fn bulk_limit(&self) -> usize {
        100
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Restrict to the dictionaries of one profile
    pub profile_id: Option<i64>,
    pub mode: SearchMode,
}

impl SearchOptions {
    pub fn fast(profile_id: Option<i64>) -> Self {
        Self {
            profile_id,
            mode: SearchMode::Fast,
        }
    }

    pub fn full(profile_id: Option<i64>) -> Self {
        Self {
            profile_id,
            mode: SearchMode::Full,
        }
    }
}
