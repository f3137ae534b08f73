use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tempfile::TempDir;
use zip::ZipArchive;

use crate::error::ImportError;

/// `index.json` of a Yomitan archive
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveIndex {
    pub title: String,
    #[serde(default, alias = "version")]
    pub format: Option<u32>,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub sequenced: bool,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub attribution: Option<String>,
}

impl ArchiveIndex {
    pub fn from_json(json: &str) -> Result<Self, ImportError> {
        let index: ArchiveIndex =
            serde_json::from_str(json).map_err(|e| ImportError::InvalidIndex(e.to_string()))?;
        if index.title.trim().is_empty() {
            return Err(ImportError::InvalidIndex("title is blank".to_string()));
        }
        Ok(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankKind {
    Term,
    TermMeta,
}

/// `term_bank_3.json` -> (Term, 3); other names are not banks
pub fn classify_bank(file_name: &str) -> Option<(BankKind, u32)> {
    let stem = file_name.strip_suffix(".json")?;
    let (kind, number) = if let Some(n) = stem.strip_prefix("term_meta_bank_") {
        (BankKind::TermMeta, n)
    } else if let Some(n) = stem.strip_prefix("term_bank_") {
        (BankKind::Term, n)
    } else {
        return None;
    };
    number.parse().ok().map(|n| (kind, n))
}

/// An archive unpacked into a scratch directory.
///
/// The directory is removed when this value drops, on success and failure alike.
pub struct ExtractedArchive {
    scratch: TempDir,
    pub index: ArchiveIndex,
    /// Ascending bank number
    pub term_banks: Vec<PathBuf>,
    pub meta_banks: Vec<PathBuf>,
}

impl ExtractedArchive {
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn bank_count(&self) -> usize {
        self.term_banks.len() + self.meta_banks.len()
    }

    /// Remove the scratch directory now, reporting failures
    pub fn close(self) -> io::Result<()> {
        self.scratch.close()
    }
}

/// Unpack `index.json` and the bank files of an archive held in memory
pub fn extract(bytes: &[u8]) -> Result<ExtractedArchive, ImportError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let scratch = tempfile::Builder::new().prefix("saya-import-").tempdir()?;

    let mut index_path: Option<PathBuf> = None;
    let mut term_banks: Vec<(u32, PathBuf)> = Vec::new();
    let mut meta_banks: Vec<(u32, PathBuf)> = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        // Rejects absolute paths and `..` components
        let Some(name) = file.enclosed_name() else {
            tracing::warn!("[IMPORT] Skipping unsafe archive path: {}", file.name());
            continue;
        };
        let Some(file_name) = name.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };

        let bank = classify_bank(&file_name);
        let is_index = file_name == "index.json";
        if bank.is_none() && !is_index {
            continue;
        }

        let target = scratch.path().join(format!("{:04}-{}", i, file_name));
        let mut out = File::create(&target)?;
        io::copy(&mut file, &mut out)?;

        match bank {
            Some((BankKind::Term, n)) => term_banks.push((n, target)),
            Some((BankKind::TermMeta, n)) => meta_banks.push((n, target)),
            // Shallowest index.json wins
            None if index_path.is_none() || name.components().count() == 1 => {
                index_path = Some(target)
            }
            None => {}
        }
    }

    let index_path = index_path.ok_or_else(|| {
        ImportError::InvalidIndex("index.json not found in archive".to_string())
    })?;
    let index = ArchiveIndex::from_json(&fs::read_to_string(&index_path)?)?;

    term_banks.sort_by_key(|(n, _)| *n);
    meta_banks.sort_by_key(|(n, _)| *n);

    tracing::info!(
        "[IMPORT] Extracted '{}' rev {}: {} term banks, {} meta banks",
        index.title,
        index.revision,
        term_banks.len(),
        meta_banks.len()
    );

    Ok(ExtractedArchive {
        scratch,
        index,
        term_banks: term_banks.into_iter().map(|(_, p)| p).collect(),
        meta_banks: meta_banks.into_iter().map(|(_, p)| p).collect(),
    })
}
