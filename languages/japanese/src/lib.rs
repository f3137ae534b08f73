pub mod frequency;
pub mod pitch_accent;
pub mod processor;

pub use frequency::FrequencyLevel;
pub use pitch_accent::{PatternType, PitchPattern};
pub use processor::JapaneseProcessor;
