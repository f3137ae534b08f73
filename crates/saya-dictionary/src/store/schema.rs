//! Database Schema
//!
//! Every dependent table cascades on its dictionary id, so deleting a
//! dictionaries row is the only cleanup a removal needs.

/// Applied to every connection; SQLite does not persist it
pub const CONNECTION_PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
"#;

pub const CREATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS dictionaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    revision TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    source_language TEXT NOT NULL DEFAULT '',
    target_language TEXT NOT NULL DEFAULT '',
    entry_count INTEGER NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 0,
    import_date INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dictionary_id INTEGER NOT NULL,
    term TEXT NOT NULL CHECK (length(trim(term)) > 0),
    reading TEXT NOT NULL DEFAULT '',
    definition TEXT NOT NULL DEFAULT '',
    part_of_speech TEXT NOT NULL DEFAULT '',
    tags TEXT NOT NULL DEFAULT '[]',  -- JSON Array
    is_html_content INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (dictionary_id) REFERENCES dictionaries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_entries_dictionary ON entries(dictionary_id);
CREATE INDEX IF NOT EXISTS idx_entries_term ON entries(term);
CREATE INDEX IF NOT EXISTS idx_entries_reading ON entries(reading);

CREATE TABLE IF NOT EXISTS word_frequencies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dictionary_id INTEGER NOT NULL,
    word TEXT NOT NULL,
    frequency INTEGER NOT NULL,
    UNIQUE (dictionary_id, word),
    FOREIGN KEY (dictionary_id) REFERENCES dictionaries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_word_frequencies_word ON word_frequencies(word);

CREATE TABLE IF NOT EXISTS word_pitch_accents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    dictionary_id INTEGER NOT NULL,
    word TEXT NOT NULL,
    reading TEXT NOT NULL DEFAULT '',
    pitch_accent TEXT NOT NULL,
    FOREIGN KEY (dictionary_id) REFERENCES dictionaries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_word_pitch_accents_word ON word_pitch_accents(word);
CREATE INDEX IF NOT EXISTS idx_word_pitch_accents_dictionary ON word_pitch_accents(dictionary_id);

CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    is_default INTEGER NOT NULL DEFAULT 0
);

-- Profile <-> dictionary membership (N:M)
CREATE TABLE IF NOT EXISTS profile_dictionaries (
    profile_id INTEGER NOT NULL,
    dictionary_id INTEGER NOT NULL,
    PRIMARY KEY (profile_id, dictionary_id),
    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (dictionary_id) REFERENCES dictionaries(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_profile_dictionaries_dictionary ON profile_dictionaries(dictionary_id);
"#;
