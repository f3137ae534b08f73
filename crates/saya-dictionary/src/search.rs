//! Ranked search over the entry table.
//!
//! Candidate rows come from SQL (predicate, scope, frequency and priority
//! joins); the final order is always applied by [`compare`], so fast and full
//! mode agree on ranking for the rows they both return.

use std::cmp::Ordering;
use std::sync::Arc;

use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use saya_config::dictionary::DictionaryConfig;
use saya_core::preprocess::{DefaultPreprocessor, Preprocessor};
use saya_types::{DictionaryEntry, SearchMode};

use crate::error::StoreError;
use crate::store::{entry_from_row, DictionaryStore, ENTRY_COLUMNS};

pub const DEFAULT_FAST_LIMIT: usize = 50;
pub const DEFAULT_BULK_LIMIT: usize = 100;

/// Tier of a row that matched only through a substring or the definition
const TIER_OTHER: u8 = 4;

/// A candidate row with everything the comparator looks at
#[derive(Debug, Clone)]
pub struct RankedRow {
    pub entry: DictionaryEntry,
    /// Rank from the entry's own dictionary, if it has one for this term
    pub frequency: Option<i64>,
    pub priority: i64,
    pub tier: u8,
    term_chars: usize,
}

impl RankedRow {
    pub fn new(entry: DictionaryEntry, frequency: Option<i64>, priority: i64, folded_query: &str) -> Self {
        let tier = match_tier(&entry, folded_query);
        let term_chars = entry.term.chars().count();
        Self {
            entry,
            frequency,
            priority,
            tier,
            term_chars,
        }
    }
}

/// 0 exact term, 1 term prefix, 2 exact reading, 3 reading prefix, 4 anything else.
/// `folded_query` must already be folded with [`Preprocessor::fold`].
pub fn match_tier(entry: &DictionaryEntry, folded_query: &str) -> u8 {
    let pre = DefaultPreprocessor;
    let term = pre.fold(&entry.term);
    if term == folded_query {
        return 0;
    }
    if term.starts_with(folded_query) {
        return 1;
    }
    if entry.reading.is_empty() {
        return TIER_OTHER;
    }
    let reading = pre.fold(&entry.reading);
    if reading == folded_query {
        2
    } else if reading.starts_with(folded_query) {
        3
    } else {
        TIER_OTHER
    }
}

/// Total order: tier, term length, known frequency (ascending) before unknown,
/// dictionary priority descending, entry id descending
pub fn compare(a: &RankedRow, b: &RankedRow) -> Ordering {
    a.tier
        .cmp(&b.tier)
        .then_with(|| a.term_chars.cmp(&b.term_chars))
        .then_with(|| match (a.frequency, b.frequency) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.entry.id.cmp(&a.entry.id))
}

/// `%` and `_` are LIKE wildcards; `\` is the declared escape
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct SearchEngine {
    store: Arc<DictionaryStore>,
    fast_limit: usize,
    bulk_limit: usize,
    preprocessor: DefaultPreprocessor,
}

impl SearchEngine {
    pub fn new(store: Arc<DictionaryStore>, config: &DictionaryConfig) -> Self {
        Self::with_limits(store, config.fast_search_limit, config.bulk_lookup_limit)
    }

    pub fn with_limits(store: Arc<DictionaryStore>, fast_limit: usize, bulk_limit: usize) -> Self {
        Self {
            store,
            fast_limit: fast_limit.max(1),
            bulk_limit: bulk_limit.max(1),
            preprocessor: DefaultPreprocessor,
        }
    }

    pub fn bulk_limit(&self) -> usize {
        self.bulk_limit
    }

    /// Best-effort search: store failures are logged and come back empty
    pub fn search(&self, query: &str, profile_id: Option<i64>, mode: SearchMode) -> Vec<DictionaryEntry> {
        match self.try_search(query, profile_id, mode) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[SEARCH] '{}' ({:?}) failed: {}", query, mode, e);
                Vec::new()
            }
        }
    }

    pub fn try_search(
        &self,
        query: &str,
        profile_id: Option<i64>,
        mode: SearchMode,
    ) -> Result<Vec<DictionaryEntry>, StoreError> {
        let normalized = self.preprocessor.process(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let folded = self.preprocessor.fold(&normalized);

        let mut rows = match mode {
            SearchMode::Fast => self.fast_candidates(&normalized, &folded, profile_id)?,
            SearchMode::Full => self.full_candidates(&normalized, &folded, profile_id)?,
        };
        rows.sort_by(compare);

        tracing::debug!("[SEARCH] '{}' ({:?}) -> {} rows", normalized, mode, rows.len());
        Ok(rows.into_iter().map(|row| row.entry).collect())
    }

    /// Term/reading substring match, pre-ordered in SQL so the cap keeps the best rows.
    /// Stored text is lowered on the SQL side as well as the query.
    fn fast_candidates(
        &self,
        normalized: &str,
        folded: &str,
        profile_id: Option<i64>,
    ) -> Result<Vec<RankedRow>, StoreError> {
        let mut params = vec![
            SqlValue::Text(normalized.to_string()),
            SqlValue::Text(folded.to_string()),
        ];
        let scope = self.scope_clause(profile_id, &mut params);
        params.push(SqlValue::Integer(self.fast_limit as i64));
        let limit = params.len();

        let sql = format!(
            "SELECT {cols}, wf.frequency, d.priority \
             FROM entries e \
             JOIN dictionaries d ON d.id = e.dictionary_id \
             LEFT JOIN word_frequencies wf ON wf.dictionary_id = e.dictionary_id AND wf.word = e.term \
             {scope} \
             WHERE instr(e.term, ?1) > 0 OR instr(e.reading, ?1) > 0 \
                OR instr(lower(e.term), ?2) > 0 OR instr(lower(e.reading), ?2) > 0 \
             ORDER BY CASE \
                 WHEN e.term = ?1 OR lower(e.term) = ?2 THEN 0 \
                 WHEN substr(e.term, 1, length(?1)) = ?1 \
                   OR substr(lower(e.term), 1, length(?2)) = ?2 THEN 1 \
                 WHEN e.reading = ?1 OR lower(e.reading) = ?2 THEN 2 \
                 WHEN substr(e.reading, 1, length(?1)) = ?1 \
                   OR substr(lower(e.reading), 1, length(?2)) = ?2 THEN 3 \
                 ELSE 4 END, \
               length(e.term), wf.frequency IS NULL, wf.frequency, d.priority DESC, e.id DESC \
             LIMIT ?{limit}",
            cols = ENTRY_COLUMNS,
        );
        self.ranked_rows(&sql, params, folded)
    }

    /// Term, reading or definition; every match is returned
    fn full_candidates(
        &self,
        normalized: &str,
        folded: &str,
        profile_id: Option<i64>,
    ) -> Result<Vec<RankedRow>, StoreError> {
        let mut params = vec![SqlValue::Text(like_pattern(normalized))];
        let scope = self.scope_clause(profile_id, &mut params);

        let sql = format!(
            "SELECT {cols}, wf.frequency, d.priority \
             FROM entries e \
             JOIN dictionaries d ON d.id = e.dictionary_id \
             LEFT JOIN word_frequencies wf ON wf.dictionary_id = e.dictionary_id AND wf.word = e.term \
             {scope} \
             WHERE e.term LIKE ?1 ESCAPE '\\' \
                OR e.reading LIKE ?1 ESCAPE '\\' \
                OR e.definition LIKE ?1 ESCAPE '\\'",
            cols = ENTRY_COLUMNS,
        );
        self.ranked_rows(&sql, params, folded)
    }

    fn scope_clause(&self, profile_id: Option<i64>, params: &mut Vec<SqlValue>) -> String {
        match profile_id {
            Some(profile_id) => {
                params.push(SqlValue::Integer(profile_id));
                format!(
                    "JOIN profile_dictionaries pd ON pd.dictionary_id = e.dictionary_id AND pd.profile_id = ?{}",
                    params.len()
                )
            }
            None => String::new(),
        }
    }

    fn ranked_rows(&self, sql: &str, params: Vec<SqlValue>, folded: &str) -> Result<Vec<RankedRow>, StoreError> {
        let conn = self.store.reader()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| {
            let entry = entry_from_row(row)?;
            let frequency: Option<i64> = row.get(8)?;
            let priority: i64 = row.get(9)?;
            Ok((entry, frequency, priority))
        })?;

        let mut ranked = Vec::new();
        for row in rows {
            let (entry, frequency, priority) = row?;
            ranked.push(RankedRow::new(entry, frequency, priority, folded));
        }
        Ok(ranked)
    }

    /// Exact term equality for up to `bulk_limit` terms, at most `bulk_limit` rows.
    /// Extra terms are ignored; callers chunk larger batches.
    pub fn bulk_exact_match(&self, terms: &[String], profile_id: Option<i64>) -> Vec<DictionaryEntry> {
        match self.try_bulk_exact_match(terms, profile_id) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[SEARCH] Bulk lookup of {} terms failed: {}", terms.len(), e);
                Vec::new()
            }
        }
    }

    pub fn try_bulk_exact_match(
        &self,
        terms: &[String],
        profile_id: Option<i64>,
    ) -> Result<Vec<DictionaryEntry>, StoreError> {
        if terms.len() > self.bulk_limit {
            tracing::warn!(
                "[SEARCH] Bulk lookup got {} terms, only the first {} are used",
                terms.len(),
                self.bulk_limit
            );
        }
        let mut params: Vec<SqlValue> = Vec::new();
        for term in terms.iter().take(self.bulk_limit) {
            let term = term.trim();
            if !term.is_empty() {
                params.push(SqlValue::Text(term.to_string()));
            }
        }
        if params.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=params.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let scope = self.scope_clause(profile_id, &mut params);
        params.push(SqlValue::Integer(self.bulk_limit as i64));

        let sql = format!(
            "SELECT {cols} FROM entries e {scope} WHERE e.term IN ({placeholders}) LIMIT ?{limit}",
            cols = ENTRY_COLUMNS,
            limit = params.len(),
        );

        let conn = self.store.reader()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), entry_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use saya_types::WordFrequency;

    use super::*;
    use crate::store::tests::{dictionary, entry};

    fn engine(store: &Arc<DictionaryStore>) -> SearchEngine {
        SearchEngine::with_limits(store.clone(), DEFAULT_FAST_LIMIT, DEFAULT_BULK_LIMIT)
    }

    fn terms(entries: &[DictionaryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.term.as_str()).collect()
    }

    fn frequency(dictionary_id: i64, word: &str, frequency: i64) -> WordFrequency {
        WordFrequency {
            id: 0,
            dictionary_id,
            word: word.to_string(),
            frequency,
        }
    }

    #[test]
    fn test_exact_then_prefix_then_definition() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "EN", 0);
        store
            .insert_entries(&[
                entry(id, "hello", "", "to be or not"),
                entry(id, "beautiful", "", "pretty"),
                entry(id, "be", "", "exist"),
            ])
            .unwrap();
        let engine = engine(&store);

        for query in ["be", "BE", "ｂｅ"] {
            let full = engine.search(query, None, SearchMode::Full);
            assert_eq!(terms(&full), vec!["be", "beautiful", "hello"], "{query}");
        }

        let fast = engine.search("be", None, SearchMode::Fast);
        assert_eq!(terms(&fast), vec!["be", "beautiful"]);
    }

    #[test]
    fn test_fast_mode_ignores_stored_case() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "EN", 0);
        store
            .insert_entries(&[
                entry(id, "Beautiful", "", "pretty"),
                entry(id, "BE", "", "exist"),
                entry(id, "hello", "", "greeting"),
            ])
            .unwrap();
        let engine = engine(&store);

        for query in ["be", "Be", "ＢＥ"] {
            let fast = engine.search(query, None, SearchMode::Fast);
            let full = engine.search(query, None, SearchMode::Full);
            assert_eq!(terms(&fast), vec!["BE", "Beautiful"], "{query}");
            assert_eq!(terms(&fast), terms(&full), "{query}");
        }
    }

    #[test]
    fn test_reading_tiers_after_term_tiers() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "JA", 0);
        store
            .insert_entries(&[
                entry(id, "食べ物", "たべもの", ""),
                entry(id, "食べる", "たべる", ""),
                entry(id, "たべる", "", ""),
            ])
            .unwrap();

        let results = engine(&store).search("たべる", None, SearchMode::Full);
        assert_eq!(terms(&results), vec!["たべる", "食べる"]);
    }

    #[test]
    fn test_known_frequency_before_unknown() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let rare = dictionary(&store, "rare", 0);
        let common = dictionary(&store, "common", 0);
        let unranked = dictionary(&store, "unranked", 0);
        store
            .insert_entries(&[
                entry(rare, "犬", "いぬ", "dog"),
                entry(common, "犬", "いぬ", "dog"),
                entry(unranked, "犬", "いぬ", "dog"),
            ])
            .unwrap();
        store
            .insert_frequencies(&[frequency(rare, "犬", 5000), frequency(common, "犬", 50)])
            .unwrap();

        for mode in [SearchMode::Fast, SearchMode::Full] {
            let ids: Vec<i64> = engine(&store)
                .search("犬", None, mode)
                .iter()
                .map(|e| e.dictionary_id)
                .collect();
            assert_eq!(ids, vec![common, rare, unranked]);
        }
    }

    #[test]
    fn test_priority_beats_recency() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let preferred = dictionary(&store, "preferred", 5);
        let newer = dictionary(&store, "newer", 0);
        store.insert_entries(&[entry(preferred, "猫", "", "")]).unwrap();
        store.insert_entries(&[entry(newer, "猫", "", "")]).unwrap();

        let results = engine(&store).search("猫", None, SearchMode::Full);
        assert_eq!(results[0].dictionary_id, preferred);
        assert_eq!(results[1].dictionary_id, newer);
    }

    #[test]
    fn test_id_descending_is_final_tie_break() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "D", 0);
        store
            .insert_entries(&[entry(id, "本", "ほん", "book"), entry(id, "本", "もと", "origin")])
            .unwrap();

        let results = engine(&store).search("本", None, SearchMode::Full);
        assert!(results[0].id > results[1].id);
    }

    #[test]
    fn test_profile_scope_hides_other_dictionaries() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let inside = dictionary(&store, "inside", 0);
        let outside = dictionary(&store, "outside", 0);
        store
            .insert_entries(&[entry(inside, "水", "みず", ""), entry(outside, "水", "みず", "")])
            .unwrap();
        let profile = store.create_profile("reading", false).unwrap();
        store.add_dictionary_to_profile(profile, inside).unwrap();
        let engine = engine(&store);

        for mode in [SearchMode::Fast, SearchMode::Full] {
            let scoped = engine.search("水", Some(profile), mode);
            assert_eq!(scoped.len(), 1);
            assert_eq!(scoped[0].dictionary_id, inside);
        }
        assert_eq!(engine.search("水", None, SearchMode::Full).len(), 2);

        let bulk = engine.bulk_exact_match(&["水".to_string()], Some(profile));
        assert_eq!(bulk.len(), 1);
        assert_eq!(bulk[0].dictionary_id, inside);

        let empty_profile = store.create_profile("empty", false).unwrap();
        assert!(engine.search("水", Some(empty_profile), SearchMode::Full).is_empty());
    }

    #[test]
    fn test_fast_mode_is_capped() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "D", 0);
        let entries: Vec<DictionaryEntry> = (0..60).map(|i| entry(id, &format!("語{}", i), "", "")).collect();
        store.insert_entries(&entries).unwrap();
        let engine = engine(&store);

        assert_eq!(engine.search("語", None, SearchMode::Fast).len(), DEFAULT_FAST_LIMIT);
        assert_eq!(engine.search("語", None, SearchMode::Full).len(), 60);
    }

    #[test]
    fn test_like_wildcards_are_literal() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "D", 0);
        store
            .insert_entries(&[entry(id, "100%", "", ""), entry(id, "1000", "", "")])
            .unwrap();

        let results = engine(&store).search("100%", None, SearchMode::Full);
        assert_eq!(terms(&results), vec!["100%"]);
    }

    #[test]
    fn test_bulk_lookup_caps_terms() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "D", 0);
        let words: Vec<String> = (0..250).map(|i| format!("w{}", i)).collect();
        let entries: Vec<DictionaryEntry> = words.iter().map(|w| entry(id, w, "", "")).collect();
        store.insert_entries(&entries).unwrap();
        let engine = engine(&store);

        let results = engine.bulk_exact_match(&words, None);
        assert_eq!(results.len(), 100);
        let first_hundred = &words[..100];
        assert!(results.iter().all(|e| first_hundred.contains(&e.term)));

        assert!(engine.bulk_exact_match(&[], None).is_empty());
        assert!(engine.bulk_exact_match(&["  ".to_string()], None).is_empty());
    }

    #[test]
    fn test_store_failure_surfaces_as_empty() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        let id = dictionary(&store, "D", 0);
        store.insert_entries(&[entry(id, "a", "", "")]).unwrap();
        store.writer().execute_batch("DROP TABLE entries").unwrap();
        let engine = engine(&store);

        assert!(engine.try_search("a", None, SearchMode::Full).is_err());
        assert!(engine.search("a", None, SearchMode::Full).is_empty());
        assert!(engine.bulk_exact_match(&["a".to_string()], None).is_empty());
    }

    #[test]
    fn test_blank_query_is_empty() {
        let store = Arc::new(DictionaryStore::open_in_memory().unwrap());
        assert!(engine(&store).search("  \n", None, SearchMode::Full).is_empty());
    }
}
