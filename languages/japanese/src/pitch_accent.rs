use saya_types::WordPitchAccent;

/// Drop markers seen in pitch pattern strings
const DROP_MARKERS: &[char] = &['＼', '\\', 'ꜜ', '↓'];

/// Small kana that merge with the previous mora
const SMALL_KANA: &[char] = &[
    'ゃ', 'ゅ', 'ょ', 'ぁ', 'ぃ', 'ぅ', 'ぇ', 'ぉ', 'ゎ', 'ャ', 'ュ', 'ョ', 'ァ', 'ィ', 'ゥ', 'ェ',
    'ォ', 'ヮ',
];

pub fn mora_count(reading: &str) -> usize {
    reading
        .chars()
        .filter(|c| !c.is_whitespace() && !SMALL_KANA.contains(c) && !DROP_MARKERS.contains(c))
        .count()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchPattern {
    /// Drop position (0 = heiban, 1 = atamadaka, 2+ = nakadaka/odaka)
    pub drop_position: u8,
    /// Pattern type
    pub pattern_type: PatternType,
}

impl PitchPattern {
    /// `mora` is the word length; a drop on the last mora is odaka
    pub fn from_drop_position(drop: u8, mora: usize) -> Self {
        let pattern_type = match drop {
            0 => PatternType::Heiban,    // 平板型 (flat)
            1 => PatternType::Atamadaka, // 頭高型 (head-high)
            d if mora > 0 && d as usize >= mora => PatternType::Odaka, // 尾高型 (tail-high)
            _ => PatternType::Nakadaka,  // 中高型 (mid-high)
        };

        Self {
            drop_position: drop,
            pattern_type,
        }
    }

    /// Parse a stored pitch value: a bare drop position (`"2"`) or a kana
    /// pattern with a drop marker (`"はし＼"`). A marker-less pattern is flat.
    pub fn parse(raw: &str, reading: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(drop) = raw.parse::<u8>() {
            return Some(Self::from_drop_position(drop, mora_count(reading)));
        }
        if raw.chars().all(|c| c.is_ascii_digit() || c == '-') {
            return None;
        }

        let mora = mora_count(raw);
        let drop = match raw.find(DROP_MARKERS) {
            Some(at) => mora_count(&raw[..at]),
            None => 0,
        };
        u8::try_from(drop)
            .ok()
            .map(|drop| Self::from_drop_position(drop, mora))
    }

    /// Circled drop position, ⓪ for flat
    pub fn to_notation(&self) -> String {
        match self.drop_position {
            0 => "⓪".to_string(),
            n @ 1..=20 => char::from_u32(0x2460 + n as u32 - 1)
                .map(String::from)
                .unwrap_or_else(|| format!("[{}]", n)),
            n => format!("[{}]", n),
        }
    }

    /// Get pattern type name
    pub fn type_name(&self) -> &'static str {
        self.pattern_type.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    Heiban,    // 平板型 - flat (no drop)
    Atamadaka, // 頭高型 - head-high (drop after 1st mora)
    Nakadaka,  // 中高型 - mid-high (drop in middle)
    Odaka,     // 尾高型 - tail-high (drop at end)
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Heiban => "Heiban (Flat)",
            PatternType::Atamadaka => "Atamadaka (Head-high)",
            PatternType::Nakadaka => "Nakadaka (Mid-high)",
            PatternType::Odaka => "Odaka (Tail-high)",
        }
    }
}

/// Notation for the accents matching `reading`, distinct and in store order.
/// Facts without a reading apply to every reading.
pub fn describe(accents: &[WordPitchAccent], reading: &str) -> Option<String> {
    let mut notations: Vec<String> = Vec::new();
    for accent in accents {
        if !accent.reading.is_empty() && !reading.is_empty() && accent.reading != reading {
            continue;
        }
        let reading = if accent.reading.is_empty() {
            reading
        } else {
            accent.reading.as_str()
        };
        let Some(pattern) = PitchPattern::parse(&accent.pitch_accent, reading) else {
            tracing::debug!("Unparseable pitch accent '{}' for {}", accent.pitch_accent, accent.word);
            continue;
        };
        let notation = pattern.to_notation();
        if !notations.contains(&notation) {
            notations.push(notation);
        }
    }

    if notations.is_empty() {
        None
    } else {
        Some(notations.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accent(reading: &str, pitch: &str) -> WordPitchAccent {
        WordPitchAccent {
            id: 0,
            dictionary_id: 1,
            word: "箸".to_string(),
            reading: reading.to_string(),
            pitch_accent: pitch.to_string(),
        }
    }

    #[test]
    fn test_mora_count_merges_small_kana() {
        assert_eq!(mora_count("きょう"), 2);
        assert_eq!(mora_count("がっこう"), 4);
        assert_eq!(mora_count("コーヒー"), 4);
    }

    #[test]
    fn test_numeric_positions() {
        let flat = PitchPattern::parse("0", "はし").unwrap();
        assert_eq!(flat.pattern_type, PatternType::Heiban);

        let head = PitchPattern::parse("1", "はし").unwrap();
        assert_eq!(head.pattern_type, PatternType::Atamadaka);

        let tail = PitchPattern::parse("2", "はし").unwrap();
        assert_eq!(tail.pattern_type, PatternType::Odaka);

        let mid = PitchPattern::parse("2", "たまご").unwrap();
        assert_eq!(mid.pattern_type, PatternType::Nakadaka);
    }

    #[test]
    fn test_marker_patterns() {
        let tail = PitchPattern::parse("はし＼", "").unwrap();
        assert_eq!(tail.drop_position, 2);
        assert_eq!(tail.pattern_type, PatternType::Odaka);

        let head = PitchPattern::parse("は\\し", "").unwrap();
        assert_eq!(head.drop_position, 1);

        let mid = PitchPattern::parse("きょꜜう", "").unwrap();
        assert_eq!(mid.drop_position, 1);

        let flat = PitchPattern::parse("はし", "").unwrap();
        assert_eq!(flat.pattern_type, PatternType::Heiban);

        assert!(PitchPattern::parse("", "").is_none());
        assert!(PitchPattern::parse("-1", "").is_none());
    }

    #[test]
    fn test_notation() {
        assert_eq!(PitchPattern::from_drop_position(0, 2).to_notation(), "⓪");
        assert_eq!(PitchPattern::from_drop_position(1, 2).to_notation(), "①");
        assert_eq!(PitchPattern::from_drop_position(3, 4).to_notation(), "③");
        assert_eq!(PitchPattern::from_drop_position(25, 30).to_notation(), "[25]");
    }

    #[test]
    fn test_describe_filters_by_reading() {
        let accents = [accent("はし", "1"), accent("はし", "1"), accent("はじ", "0"), accent("", "2")];
        assert_eq!(describe(&accents, "はし").as_deref(), Some("① ②"));
        assert_eq!(describe(&[], "はし"), None);
    }
}
