pub mod error;
pub mod import;
pub mod loaders;
pub mod parser;
pub mod record;
pub mod search;
pub mod service;
pub mod store;
pub mod structured;

pub use error::{ImportError, ParseError, RecordError, StoreError};
pub use import::{ImportOutcome, ImportPipeline};
pub use parser::{process_array_file, ParseProgress, StreamingArrayParser};
pub use search::SearchEngine;
pub use service::DictionaryService;
pub use store::{DictionaryStore, NewDictionary};
