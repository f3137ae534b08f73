use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One imported dictionary archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryMetadata {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: String,
    pub source_language: String,
    pub target_language: String,
    /// Maintained count, re-derivable by counting entry rows
    pub entry_count: i64,
    /// Higher sorts first
    pub priority: i64,
    /// Unix seconds
    pub import_date: i64,
}

/// A persisted headword record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub id: i64,
    pub dictionary_id: i64,
    pub term: String,
    pub reading: String,
    pub definition: String,
    /// Comma-joined tag string
    pub part_of_speech: String,
    pub tags: Vec<String>,
    pub is_html_content: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordFrequency {
    pub id: i64,
    pub dictionary_id: i64,
    pub word: String,
    /// Rank, lower = more common
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordPitchAccent {
    pub id: i64,
    pub dictionary_id: i64,
    pub word: String,
    pub reading: String,
    /// Bare mora-drop position ("2") or a pattern string with a drop marker
    pub pitch_accent: String,
}

/// Side-table facts for one word, used only for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermAnnotations {
    /// Most common first
    pub frequencies: Vec<WordFrequency>,
    pub pitch_accents: Vec<WordPitchAccent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    /// Keystroke-driven: term/reading only, capped row count
    Fast,
    /// Explicit search: definitions included, complete ranking, no cap
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStage {
    Extracting,
    ReadingIndex,
    TermBanks,
    MetaBanks,
    Finalizing,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportProgress {
    pub job_id: Uuid,
    /// 0.0..=100.0, never decreases within a job
    pub percent: f32,
    pub stage: ImportStage,
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    ConfigChanged,
    ImportArchive {
        path: String,
    },
    ImportProgress(ImportProgress),
    ImportFinished {
        dictionary_id: Option<i64>,
        message: String,
    },
    CancelImport,
    TextInput(String),
    Search {
        query: String,
        profile_id: Option<i64>,
        mode: SearchMode,
    },
    OcrText {
        text: String,
        profile_id: Option<i64>,
    },
    ShowResults(Vec<DisplayResult>),
    DeleteDictionary(i64),
    UpdateDictionaryPriority {
        dictionary_id: i64,
        priority: i64,
    },
    ListDictionaries,
    ShowDictionaries(Vec<DictionaryMetadata>),
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayResult {
    pub term: String,
    pub reading: String,
    pub definition: String,
    pub is_html: bool,
    pub part_of_speech: String,
    pub frequency: Option<String>,
    pub pitch_accent: Option<String>,
}
