use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use saya_types::{DictionaryEntry, DictionaryMetadata, Profile, WordFrequency, WordPitchAccent};

use crate::error::StoreError;

pub mod schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const ENTRY_COLUMNS: &str =
    "e.id, e.dictionary_id, e.term, e.reading, e.definition, e.part_of_speech, e.tags, e.is_html_content";

const DICTIONARY_COLUMNS: &str = "id, title, author, description, source_language, target_language, \
     entry_count, priority, import_date";

/// Metadata for a dictionary about to be imported
#[derive(Debug, Clone, Default)]
pub struct NewDictionary {
    pub title: String,
    pub revision: String,
    pub author: String,
    pub description: String,
    pub source_language: String,
    pub target_language: String,
    pub priority: i64,
}

/// Rows referencing one dictionary id, per dependent table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependentRows {
    pub entries: i64,
    pub frequencies: i64,
    pub pitch_accents: i64,
    pub memberships: i64,
}

impl DependentRows {
    pub fn total(&self) -> i64 {
        self.entries + self.frequencies + self.pitch_accents + self.memberships
    }
}

/// Handle to the SQLite store holding every imported dictionary.
///
/// One writer connection behind a mutex; reads open their own connection on
/// file stores so searches do not queue behind an import. In-memory stores
/// share the writer connection.
pub struct DictionaryStore {
    path: Option<PathBuf>,
    writer: Mutex<Connection>,
}

pub(crate) enum Reader<'a> {
    Owned(Connection),
    Shared(MutexGuard<'a, Connection>),
}

impl Deref for Reader<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Reader::Owned(conn) => conn,
            Reader::Shared(guard) => guard,
        }
    }
}

fn configure(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(schema::CONNECTION_PRAGMAS)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<DictionaryEntry> {
    let tags: String = row.get(6)?;
    let tags: Vec<String> = serde_json::from_str(&tags)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(DictionaryEntry {
        id: row.get(0)?,
        dictionary_id: row.get(1)?,
        term: row.get(2)?,
        reading: row.get(3)?,
        definition: row.get(4)?,
        part_of_speech: row.get(5)?,
        tags,
        is_html_content: row.get(7)?,
    })
}

fn dictionary_from_row(row: &Row<'_>) -> rusqlite::Result<DictionaryMetadata> {
    Ok(DictionaryMetadata {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        description: row.get(3)?,
        source_language: row.get(4)?,
        target_language: row.get(5)?,
        entry_count: row.get(6)?,
        priority: row.get(7)?,
        import_date: row.get(8)?,
    })
}

impl DictionaryStore {
    /// Open or create the store file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        configure(&conn)?;
        conn.execute_batch(schema::CREATE_SCHEMA)?;

        tracing::info!("[STORE] Opened {} (journal_mode={})", path.display(), mode);
        Ok(Self {
            path: Some(path),
            writer: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        conn.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(Self {
            path: None,
            writer: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn writer(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves the connection itself usable
        self.writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn reader(&self) -> Result<Reader<'_>, StoreError> {
        match &self.path {
            Some(path) => {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?;
                configure(&conn)?;
                Ok(Reader::Owned(conn))
            }
            None => Ok(Reader::Shared(self.writer())),
        }
    }

    // ---- dictionaries ----

    pub fn insert_dictionary(&self, dictionary: &NewDictionary) -> Result<i64, StoreError> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO dictionaries (title, revision, author, description, source_language, \
             target_language, entry_count, priority, import_date) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
            params![
                dictionary.title,
                dictionary.revision,
                dictionary.author,
                dictionary.description,
                dictionary.source_language,
                dictionary.target_language,
                dictionary.priority,
                now_unix(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_dictionary(&self, id: i64) -> Result<Option<DictionaryMetadata>, StoreError> {
        let conn = self.reader()?;
        let sql = format!("SELECT {} FROM dictionaries WHERE id = ?1", DICTIONARY_COLUMNS);
        Ok(conn.query_row(&sql, [id], dictionary_from_row).optional()?)
    }

    /// Highest priority first
    pub fn list_dictionaries(&self) -> Result<Vec<DictionaryMetadata>, StoreError> {
        let conn = self.reader()?;
        let sql = format!(
            "SELECT {} FROM dictionaries ORDER BY priority DESC, id ASC",
            DICTIONARY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], dictionary_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn set_entry_count(&self, id: i64, entry_count: i64) -> Result<(), StoreError> {
        let conn = self.writer();
        let changed = conn.execute(
            "UPDATE dictionaries SET entry_count = ?2 WHERE id = ?1",
            params![id, entry_count],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub fn update_priority(&self, id: i64, priority: i64) -> Result<(), StoreError> {
        let conn = self.writer();
        let changed = conn.execute(
            "UPDATE dictionaries SET priority = ?2 WHERE id = ?1",
            params![id, priority],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Remove a dictionary and, through the cascade, every row that references it.
    /// Returns false when no such dictionary exists.
    pub fn delete_dictionary(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.writer();
        let deleted = conn.execute("DELETE FROM dictionaries WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Counts entry rows; `None` counts across every dictionary
    pub fn entry_count(&self, dictionary_id: Option<i64>) -> Result<i64, StoreError> {
        let conn = self.reader()?;
        let count = match dictionary_id {
            Some(id) => conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE dictionary_id = ?1",
                [id],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?,
        };
        Ok(count)
    }

    pub fn dependent_rows(&self, dictionary_id: i64) -> Result<DependentRows, StoreError> {
        let conn = self.reader()?;
        let count = |table: &str| -> rusqlite::Result<i64> {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE dictionary_id = ?1", table),
                [dictionary_id],
                |row| row.get(0),
            )
        };
        Ok(DependentRows {
            entries: count("entries")?,
            frequencies: count("word_frequencies")?,
            pitch_accents: count("word_pitch_accents")?,
            memberships: count("profile_dictionaries")?,
        })
    }

    // ---- bulk inserts ----

    /// Insert one sub-batch in a single transaction, replacing on primary key
    /// conflict. Entries with id 0 get a fresh id.
    pub fn insert_entries(&self, entries: &[DictionaryEntry]) -> Result<usize, StoreError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO entries \
                 (id, dictionary_id, term, reading, definition, part_of_speech, tags, is_html_content) \
                 VALUES (NULLIF(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for entry in entries {
                let tags = serde_json::to_string(&entry.tags)?;
                stmt.execute(params![
                    entry.id,
                    entry.dictionary_id,
                    entry.term,
                    entry.reading,
                    entry.definition,
                    entry.part_of_speech,
                    tags,
                    entry.is_html_content,
                ])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    /// One fact per (dictionary, word); later duplicates overwrite
    pub fn insert_frequencies(&self, frequencies: &[WordFrequency]) -> Result<usize, StoreError> {
        if frequencies.is_empty() {
            return Ok(0);
        }
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO word_frequencies (dictionary_id, word, frequency) VALUES (?1, ?2, ?3) \
                 ON CONFLICT (dictionary_id, word) DO UPDATE SET frequency = excluded.frequency",
            )?;
            for frequency in frequencies {
                stmt.execute(params![
                    frequency.dictionary_id,
                    frequency.word,
                    frequency.frequency
                ])?;
            }
        }
        tx.commit()?;
        Ok(frequencies.len())
    }

    pub fn insert_pitch_accents(&self, accents: &[WordPitchAccent]) -> Result<usize, StoreError> {
        if accents.is_empty() {
            return Ok(0);
        }
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO word_pitch_accents (dictionary_id, word, reading, pitch_accent) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for accent in accents {
                stmt.execute(params![
                    accent.dictionary_id,
                    accent.word,
                    accent.reading,
                    accent.pitch_accent
                ])?;
            }
        }
        tx.commit()?;
        Ok(accents.len())
    }

    // ---- side tables ----

    /// Most common first
    pub fn frequencies_for(&self, word: &str) -> Result<Vec<WordFrequency>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, dictionary_id, word, frequency FROM word_frequencies \
             WHERE word = ?1 ORDER BY frequency ASC",
        )?;
        let rows = stmt.query_map([word], |row| {
            Ok(WordFrequency {
                id: row.get(0)?,
                dictionary_id: row.get(1)?,
                word: row.get(2)?,
                frequency: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn pitch_accents_for(&self, word: &str) -> Result<Vec<WordPitchAccent>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, dictionary_id, word, reading, pitch_accent FROM word_pitch_accents \
             WHERE word = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([word], |row| {
            Ok(WordPitchAccent {
                id: row.get(0)?,
                dictionary_id: row.get(1)?,
                word: row.get(2)?,
                reading: row.get(3)?,
                pitch_accent: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ---- profiles ----

    /// A new default profile clears the flag on every other profile
    pub fn create_profile(&self, name: &str, is_default: bool) -> Result<i64, StoreError> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        if is_default {
            tx.execute("UPDATE profiles SET is_default = 0", [])?;
        }
        tx.execute(
            "INSERT INTO profiles (name, is_default) VALUES (?1, ?2)",
            params![name, is_default],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare("SELECT id, name, is_default FROM profiles ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Profile {
                id: row.get(0)?,
                name: row.get(1)?,
                is_default: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn delete_profile(&self, profile_id: i64) -> Result<bool, StoreError> {
        let conn = self.writer();
        Ok(conn.execute("DELETE FROM profiles WHERE id = ?1", [profile_id])? > 0)
    }

    pub fn add_dictionary_to_profile(
        &self,
        profile_id: i64,
        dictionary_id: i64,
    ) -> Result<(), StoreError> {
        let conn = self.writer();
        conn.execute(
            "INSERT OR IGNORE INTO profile_dictionaries (profile_id, dictionary_id) VALUES (?1, ?2)",
            params![profile_id, dictionary_id],
        )?;
        Ok(())
    }

    pub fn remove_dictionary_from_profile(
        &self,
        profile_id: i64,
        dictionary_id: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.writer();
        let removed = conn.execute(
            "DELETE FROM profile_dictionaries WHERE profile_id = ?1 AND dictionary_id = ?2",
            params![profile_id, dictionary_id],
        )?;
        Ok(removed > 0)
    }

    pub fn profile_dictionaries(&self, profile_id: i64) -> Result<Vec<i64>, StoreError> {
        let conn = self.reader()?;
        let mut stmt = conn.prepare(
            "SELECT dictionary_id FROM profile_dictionaries WHERE profile_id = ?1 ORDER BY dictionary_id",
        )?;
        let rows = stmt.query_map([profile_id], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<i64>>>()?)
    }
}
