use std::collections::{HashMap, HashSet};

use saya_core::dictionary::DictionaryLookup;
use saya_core::language::{LanguageProcessor, Token};
use saya_types::{DictionaryEntry, DisplayResult, TermAnnotations};
use unicode_normalization::UnicodeNormalization;

use crate::{frequency, pitch_accent};

/// Longest substring tried as a dictionary word
const DEFAULT_MAX_WORD_CHARS: usize = 10;

/// Japanese language processor
pub struct JapaneseProcessor {
    max_word_chars: usize,
}

impl Default for JapaneseProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl JapaneseProcessor {
    pub fn new() -> Self {
        Self {
            max_word_chars: DEFAULT_MAX_WORD_CHARS,
        }
    }

    pub fn with_max_word_chars(max_word_chars: usize) -> Self {
        Self {
            max_word_chars: max_word_chars.max(1),
        }
    }

    /// Distinct substrings worth looking up, by position then longest first
    pub fn candidate_words(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tokenize(text)
            .into_iter()
            .map(|token| token.normalized)
            .filter(|word| is_word_like(word))
            .filter(|word| seen.insert(word.clone()))
            .collect()
    }

    /// Match every candidate word of an OCR pass with batched exact lookups.
    ///
    /// Candidates are chunked to the lookup's bulk limit; results are
    /// de-duplicated by entry id and ordered like the candidates.
    pub async fn match_words(
        &self,
        text: &str,
        lookup: &dyn DictionaryLookup,
        profile_id: Option<i64>,
    ) -> Vec<DictionaryEntry> {
        let candidates = self.candidate_words(text);
        if candidates.is_empty() {
            return Vec::new();
        }
        let order: HashMap<&str, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, word)| (word.as_str(), i))
            .collect();

        let mut seen_ids = HashSet::new();
        let mut matched = Vec::new();
        for chunk in candidates.chunks(lookup.bulk_limit().max(1)) {
            for entry in lookup.bulk_exact_match(chunk, profile_id).await {
                if seen_ids.insert(entry.id) {
                    matched.push(entry);
                }
            }
        }

        matched.sort_by_key(|entry| order.get(entry.term.as_str()).copied().unwrap_or(usize::MAX));
        tracing::debug!(
            "[OCR] {} candidates -> {} entries",
            candidates.len(),
            matched.len()
        );
        matched
    }

    /// Entries joined with frequency and pitch-accent notation for display
    pub async fn display_results(
        &self,
        entries: Vec<DictionaryEntry>,
        lookup: &dyn DictionaryLookup,
    ) -> Vec<DisplayResult> {
        let mut annotations: HashMap<String, TermAnnotations> = HashMap::new();
        let mut results = Vec::with_capacity(entries.len());

        for entry in entries {
            if !annotations.contains_key(&entry.term) {
                let notes = lookup.annotations(&entry.term).await;
                annotations.insert(entry.term.clone(), notes);
            }
            let notes = annotations.get(&entry.term);
            let frequency = notes.and_then(|n| frequency::describe(&n.frequencies));
            let pitch_accent = notes.and_then(|n| pitch_accent::describe(&n.pitch_accents, &entry.reading));

            results.push(DisplayResult {
                term: entry.term,
                reading: entry.reading,
                definition: entry.definition,
                is_html: entry.is_html_content,
                part_of_speech: entry.part_of_speech,
                frequency,
                pitch_accent,
            });
        }

        results
    }
}

/// Contains a letter or digit, not only punctuation
fn is_word_like(word: &str) -> bool {
    !word.is_empty()
        && !word.chars().any(char::is_whitespace)
        && word.chars().any(char::is_alphanumeric)
}

impl LanguageProcessor for JapaneseProcessor {
    fn language_code(&self) -> &str {
        "ja"
    }

    fn normalize(&self, text: &str) -> String {
        text.nfkc()
            .collect::<String>()
            .chars()
            .filter(|c| !c.is_whitespace() || *c == ' ')
            .collect()
    }

    fn tokenize(&self, text: &str) -> Vec<Token> {
        let normalized = self.normalize(text);
        let chars: Vec<char> = normalized.chars().collect();
        let mut tokens = Vec::new();

        for i in 0..chars.len() {
            for len in (1..=chars.len().saturating_sub(i).min(self.max_word_chars)).rev() {
                let surface: String = chars[i..i + len].iter().collect();
                tokens.push(Token {
                    surface: surface.clone(),
                    normalized: surface,
                    position: i,
                });
            }
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use saya_core::dictionary::SearchOptions;
    use saya_types::{WordFrequency, WordPitchAccent};

    use super::*;

    struct FakeLookup {
        entries: Vec<DictionaryEntry>,
        limit: usize,
        chunks: Mutex<Vec<usize>>,
    }

    impl FakeLookup {
        fn new(terms: &[(&str, &str)], limit: usize) -> Self {
            let entries = terms
                .iter()
                .enumerate()
                .map(|(i, (term, reading))| DictionaryEntry {
                    id: i as i64 + 1,
                    dictionary_id: 1,
                    term: term.to_string(),
                    reading: reading.to_string(),
                    definition: format!("def of {}", term),
                    part_of_speech: "n".to_string(),
                    tags: vec!["n".to_string()],
                    is_html_content: false,
                })
                .collect();
            Self {
                entries,
                limit,
                chunks: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl DictionaryLookup for FakeLookup {
        async fn search(&self, _query: &str, _options: SearchOptions) -> Vec<DictionaryEntry> {
            Vec::new()
        }

        async fn bulk_exact_match(&self, terms: &[String], _profile_id: Option<i64>) -> Vec<DictionaryEntry> {
            assert!(terms.len() <= self.limit);
            self.chunks.lock().unwrap().push(terms.len());
            self.entries
                .iter()
                .filter(|e| terms.contains(&e.term))
                .cloned()
                .collect()
        }

        async fn entry_count(&self, _dictionary_id: Option<i64>) -> i64 {
            self.entries.len() as i64
        }

        async fn annotations(&self, word: &str) -> TermAnnotations {
            if word != "箸" {
                return TermAnnotations::default();
            }
            TermAnnotations {
                frequencies: vec![WordFrequency {
                    id: 1,
                    dictionary_id: 1,
                    word: word.to_string(),
                    frequency: 2500,
                }],
                pitch_accents: vec![WordPitchAccent {
                    id: 1,
                    dictionary_id: 1,
                    word: word.to_string(),
                    reading: "はし".to_string(),
                    pitch_accent: "1".to_string(),
                }],
            }
        }

        fn bulk_limit(&self) -> usize {
            self.limit
        }
    }

    #[test]
    fn test_normalize_folds_width() {
        let processor = JapaneseProcessor::new();
        assert_eq!(processor.normalize("ＡＢＣ\n食べる"), "ABC食べる");
    }

    #[test]
    fn test_candidates_distinct_and_ordered() {
        let processor = JapaneseProcessor::with_max_word_chars(3);
        let words = processor.candidate_words("猫が猫");
        assert_eq!(words, vec!["猫が猫", "猫が", "猫", "が猫", "が"]);

        let punctuation = processor.candidate_words("。、 ！");
        assert!(punctuation.is_empty());
    }

    #[tokio::test]
    async fn test_match_words_chunks_by_bulk_limit() {
        let lookup = FakeLookup::new(&[("食べる", "たべる"), ("猫", "ねこ"), ("食べ", "たべ")], 4);
        let processor = JapaneseProcessor::with_max_word_chars(3);

        let matched = processor.match_words("猫が食べる", &lookup, None).await;
        let terms: Vec<&str> = matched.iter().map(|e| e.term.as_str()).collect();
        assert_eq!(terms, vec!["猫", "食べる", "食べ"]);

        let chunks = lookup.chunks.lock().unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|&n| n <= 4));
    }

    #[tokio::test]
    async fn test_match_words_empty_text_skips_lookup() {
        let lookup = FakeLookup::new(&[("猫", "ねこ")], 100);
        let matched = JapaneseProcessor::new().match_words("  ", &lookup, None).await;
        assert!(matched.is_empty());
        assert!(lookup.chunks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_display_results_enriched() {
        let lookup = FakeLookup::new(&[("箸", "はし"), ("猫", "ねこ")], 100);
        let entries = lookup.entries.clone();

        let results = JapaneseProcessor::new().display_results(entries, &lookup).await;
        assert_eq!(results[0].frequency.as_deref(), Some("★★★ Common (#2500)"));
        assert_eq!(results[0].pitch_accent.as_deref(), Some("①"));
        assert_eq!(results[1].frequency, None);
        assert_eq!(results[1].pitch_accent, None);
        assert_eq!(results[1].definition, "def of 猫");
    }
}
