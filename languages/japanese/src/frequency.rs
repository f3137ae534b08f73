use saya_types::WordFrequency;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyLevel {
    VeryCommon,
    Common,
    Uncommon,
    Rare,
    Unknown,
}

impl FrequencyLevel {
    /// Level of a rank (lower = more common)
    pub fn from_rank(rank: Option<i64>) -> Self {
        match rank {
            Some(rank) if rank <= 1000 => FrequencyLevel::VeryCommon,
            Some(rank) if rank <= 5000 => FrequencyLevel::Common,
            Some(rank) if rank <= 10000 => FrequencyLevel::Uncommon,
            Some(_) => FrequencyLevel::Rare,
            None => FrequencyLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyLevel::VeryCommon => "Very Common",
            FrequencyLevel::Common => "Common",
            FrequencyLevel::Uncommon => "Uncommon",
            FrequencyLevel::Rare => "Rare",
            FrequencyLevel::Unknown => "Unknown",
        }
    }
}

/// Star rating (1-5 stars based on frequency)
pub fn stars(rank: Option<i64>) -> u8 {
    match rank {
        Some(rank) if rank <= 500 => 5,
        Some(rank) if rank <= 2000 => 4,
        Some(rank) if rank <= 5000 => 3,
        Some(rank) if rank <= 10000 => 2,
        Some(_) => 1,
        None => 0,
    }
}

/// Most common rank across dictionaries
pub fn best_rank(frequencies: &[WordFrequency]) -> Option<i64> {
    frequencies.iter().map(|f| f.frequency).min()
}

/// `★★★★★ Very Common (#120)`, or `None` without any rank
pub fn describe(frequencies: &[WordFrequency]) -> Option<String> {
    let rank = best_rank(frequencies)?;
    let level = FrequencyLevel::from_rank(Some(rank));
    Some(format!(
        "{} {} (#{})",
        "★".repeat(stars(Some(rank)) as usize),
        level.as_str(),
        rank
    ))
}
