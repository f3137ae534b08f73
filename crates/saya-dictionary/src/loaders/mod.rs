pub mod yomitan;

pub use yomitan::{ArchiveIndex, BankKind, ExtractedArchive};
