//! Archive import: extract, register metadata, stream every bank through the
//! normalizer and persist in sub-batches.
//!
//! Runs synchronously; the async service moves it onto a blocking thread.

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use saya_config::dictionary::DictionaryConfig;
use saya_types::{DictionaryEntry, ImportProgress, ImportStage, WordFrequency, WordPitchAccent};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ImportError, ParseError};
use crate::loaders::yomitan::{self, ArchiveIndex, ExtractedArchive};
use crate::parser::{ParseProgress, StreamingArrayParser};
use crate::record::{self, MetaRecord};
use crate::store::{DictionaryStore, NewDictionary};

const EXTRACT_DONE: f32 = 5.0;
const INDEX_DONE: f32 = 10.0;
const BANKS_DONE: f32 = 95.0;

/// Result of a successful import
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub job_id: Uuid,
    pub dictionary_id: i64,
    pub title: String,
    /// Entry rows actually persisted, also written back as `entry_count`
    pub entries: i64,
    pub frequencies: usize,
    pub pitch_accents: usize,
    pub records_seen: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    records_seen: usize,
    skipped: usize,
    entries: usize,
    frequencies: usize,
    pitch_accents: usize,
}

impl Counters {
    fn persisted(&self) -> usize {
        self.entries + self.frequencies + self.pitch_accents
    }
}

/// Forwards progress to the caller, never letting the percentage go backwards
struct Reporter<'a> {
    job_id: Uuid,
    last: f32,
    sink: &'a mut dyn FnMut(ImportProgress),
}

impl Reporter<'_> {
    fn report(&mut self, percent: f32, stage: ImportStage, message: impl Into<String>) {
        self.last = percent.clamp(self.last, 100.0);
        (self.sink)(ImportProgress {
            job_id: self.job_id,
            percent: self.last,
            stage,
            message: message.into(),
        });
    }
}

impl From<&ArchiveIndex> for NewDictionary {
    fn from(index: &ArchiveIndex) -> Self {
        NewDictionary {
            title: index.title.trim().to_string(),
            revision: index.revision.clone(),
            author: index.author.clone().unwrap_or_default(),
            description: index.description.clone().unwrap_or_default(),
            source_language: index.source_language.clone().unwrap_or_default(),
            target_language: index.target_language.clone().unwrap_or_default(),
            priority: 0,
        }
    }
}

pub struct ImportPipeline {
    store: Arc<DictionaryStore>,
    parse_batch_size: usize,
    persist_batch_size: usize,
}

impl ImportPipeline {
    pub fn new(store: Arc<DictionaryStore>, config: &DictionaryConfig) -> Self {
        Self::with_batch_sizes(
            store,
            config.parse_batch_size,
            config.effective_persist_batch_size(),
        )
    }

    pub fn with_batch_sizes(
        store: Arc<DictionaryStore>,
        parse_batch_size: usize,
        persist_batch_size: usize,
    ) -> Self {
        let parse_batch_size = parse_batch_size.max(1);
        Self {
            store,
            parse_batch_size,
            persist_batch_size: persist_batch_size.clamp(1, parse_batch_size),
        }
    }

    pub fn import_file(
        &self,
        path: &Path,
        progress: &mut dyn FnMut(ImportProgress),
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, ImportError> {
        let bytes = std::fs::read(path)?;
        self.import_archive(&bytes, progress, cancel)
    }

    /// Import one archive held in memory.
    ///
    /// Fatal errors and cancellation remove the half-imported dictionary, so
    /// the store never keeps an orphaned metadata row. The scratch directory
    /// is removed on every path.
    pub fn import_archive(
        &self,
        bytes: &[u8],
        progress: &mut dyn FnMut(ImportProgress),
        cancel: &CancellationToken,
    ) -> Result<ImportOutcome, ImportError> {
        let mut reporter = Reporter {
            job_id: Uuid::new_v4(),
            last: 0.0,
            sink: progress,
        };
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        reporter.report(0.0, ImportStage::Extracting, "Extracting archive");
        let archive = yomitan::extract(bytes)?;

        reporter.report(
            EXTRACT_DONE,
            ImportStage::ReadingIndex,
            format!("Reading index of '{}'", archive.index.title),
        );
        if archive.term_banks.is_empty() && archive.meta_banks.is_empty() {
            return Err(ImportError::NoTermBanks);
        }
        if archive.term_banks.is_empty() {
            tracing::warn!(
                "[IMPORT] '{}' has no term banks, importing meta banks only",
                archive.index.title
            );
        }

        let dictionary_id = self.store.insert_dictionary(&NewDictionary::from(&archive.index))?;
        tracing::info!(
            "[IMPORT] Job {} importing '{}' as dictionary {}",
            reporter.job_id,
            archive.index.title,
            dictionary_id
        );

        let result = self
            .import_banks(&archive, dictionary_id, &mut reporter, cancel)
            .and_then(|counters| self.finalize(dictionary_id, counters, &mut reporter));

        match result {
            Ok(outcome) => {
                let title = archive.index.title.clone();
                if let Err(e) = archive.close() {
                    tracing::warn!("[IMPORT] Failed to remove scratch directory: {}", e);
                }
                reporter.report(100.0, ImportStage::Done, format!("Imported '{}'", title));
                tracing::info!(
                    "[IMPORT] '{}' done: {} entries, {} frequencies, {} pitch accents, {} skipped",
                    title,
                    outcome.entries,
                    outcome.frequencies,
                    outcome.pitch_accents,
                    outcome.skipped
                );
                Ok(ImportOutcome { title, ..outcome })
            }
            Err(e) => {
                tracing::error!("[IMPORT] '{}' failed: {}", archive.index.title, e);
                self.rollback(dictionary_id);
                Err(e)
            }
        }
    }

    fn rollback(&self, dictionary_id: i64) {
        match self.store.delete_dictionary(dictionary_id) {
            Ok(_) => tracing::info!("[IMPORT] Rolled back dictionary {}", dictionary_id),
            Err(e) => tracing::error!(
                "[IMPORT] Rollback of dictionary {} failed, delete it manually: {}",
                dictionary_id,
                e
            ),
        }
    }

    fn import_banks(
        &self,
        archive: &ExtractedArchive,
        dictionary_id: i64,
        reporter: &mut Reporter<'_>,
        cancel: &CancellationToken,
    ) -> Result<Counters, ImportError> {
        let mut counters = Counters::default();
        let banks: Vec<(&Path, bool)> = archive
            .term_banks
            .iter()
            .map(|p| (p.as_path(), true))
            .chain(archive.meta_banks.iter().map(|p| (p.as_path(), false)))
            .collect();
        let span = (BANKS_DONE - INDEX_DONE) / banks.len() as f32;
        let parser = StreamingArrayParser::new(self.parse_batch_size);

        for (i, (path, is_term_bank)) in banks.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            let base = INDEX_DONE + span * i as f32;
            let stage = if is_term_bank {
                ImportStage::TermBanks
            } else {
                ImportStage::MetaBanks
            };
            let label = bank_label(path);
            reporter.report(base, stage, format!("Processing {}", label));

            let mut ordinal = 0usize;
            let mut failure: Option<ImportError> = None;
            let parsed = parser.process_array_file(path, |batch: Vec<Value>, position: ParseProgress| {
                if cancel.is_cancelled() {
                    return ControlFlow::Break(());
                }
                let persisted = if is_term_bank {
                    self.persist_term_batch(batch, dictionary_id, &label, &mut ordinal, &mut counters)
                } else {
                    self.persist_meta_batch(batch, dictionary_id, &mut ordinal, &mut counters)
                };
                if let Err(e) = persisted {
                    failure = Some(e);
                    return ControlFlow::Break(());
                }
                reporter.report(
                    base + span * position.fraction(),
                    stage,
                    format!("{}: {} records", label, ordinal),
                );
                ControlFlow::Continue(())
            });

            match parsed {
                Ok(records) => tracing::debug!("[IMPORT] {} -> {} records", label, records),
                Err(ParseError::Interrupted { .. }) => {
                    return Err(failure.unwrap_or(ImportError::Cancelled));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(counters)
    }

    fn persist_term_batch(
        &self,
        batch: Vec<Value>,
        dictionary_id: i64,
        label: &str,
        ordinal: &mut usize,
        counters: &mut Counters,
    ) -> Result<(), ImportError> {
        let mut entries: Vec<DictionaryEntry> = Vec::with_capacity(batch.len());
        let mut frequencies: Vec<WordFrequency> = Vec::new();

        for raw in &batch {
            *ordinal += 1;
            counters.records_seen += 1;
            match record::to_entry(raw, dictionary_id) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    counters.skipped += 1;
                    tracing::warn!("[IMPORT] Skipping {} record #{}: {}", label, ordinal, e);
                    continue;
                }
            }
            if let Some(frequency) = record::term_frequency(raw, dictionary_id) {
                frequencies.push(frequency);
            }
        }
        drop(batch);

        for chunk in entries.chunks(self.persist_batch_size) {
            counters.entries += self.store.insert_entries(chunk)?;
        }
        for chunk in frequencies.chunks(self.persist_batch_size) {
            counters.frequencies += self.store.insert_frequencies(chunk)?;
        }
        Ok(())
    }

    fn persist_meta_batch(
        &self,
        batch: Vec<Value>,
        dictionary_id: i64,
        ordinal: &mut usize,
        counters: &mut Counters,
    ) -> Result<(), ImportError> {
        let mut frequencies: Vec<WordFrequency> = Vec::new();
        let mut accents: Vec<WordPitchAccent> = Vec::new();

        for raw in &batch {
            *ordinal += 1;
            counters.records_seen += 1;
            match record::to_meta(raw, dictionary_id) {
                Some(MetaRecord::Frequency(frequency)) => frequencies.push(frequency),
                Some(MetaRecord::PitchAccents(pitches)) => accents.extend(pitches),
                None => counters.skipped += 1,
            }
        }
        drop(batch);

        for chunk in frequencies.chunks(self.persist_batch_size) {
            counters.frequencies += self.store.insert_frequencies(chunk)?;
        }
        for chunk in accents.chunks(self.persist_batch_size) {
            counters.pitch_accents += self.store.insert_pitch_accents(chunk)?;
        }
        Ok(())
    }

    /// Reconcile `entry_count` with the rows that actually landed
    fn finalize(
        &self,
        dictionary_id: i64,
        counters: Counters,
        reporter: &mut Reporter<'_>,
    ) -> Result<ImportOutcome, ImportError> {
        reporter.report(BANKS_DONE, ImportStage::Finalizing, "Updating entry count");

        if counters.persisted() == 0 {
            return Err(ImportError::NoValidRecords {
                records_seen: counters.records_seen,
            });
        }

        let entries = self.store.entry_count(Some(dictionary_id))?;
        if entries != counters.entries as i64 {
            tracing::debug!(
                "[IMPORT] {} rows written, {} present (replaced on conflict)",
                counters.entries,
                entries
            );
        }
        self.store.set_entry_count(dictionary_id, entries)?;

        Ok(ImportOutcome {
            job_id: reporter.job_id,
            dictionary_id,
            title: String::new(),
            entries,
            frequencies: counters.frequencies,
            pitch_accents: counters.pitch_accents,
            records_seen: counters.records_seen,
            skipped: counters.skipped,
        })
    }
}

/// `0003-term_bank_1.json` -> `term_bank_1.json`
fn bank_label(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.split_once('-') {
        Some((_, rest)) => rest.to_string(),
        None => name,
    }
}
