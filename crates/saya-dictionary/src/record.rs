//! Raw bank arrays -> typed rows.
//!
//! Term bank layout: `[term, reading, tags, rules, definitions, sequence,
//! termTags, readingTags]`. Yomitan v3 banks carry a numeric score at [4] and
//! the glossary at [5]; that shape is detected and read from [5] instead.
//!
//! Meta bank layout: `[term, "freq", value]` / `[term, "pitch", {..}]`, or the
//! positional frequency variant resolved by [`to_frequency`].

use serde_json::{Map, Value};

use saya_types::{DictionaryEntry, WordFrequency, WordPitchAccent};

use crate::error::RecordError;
use crate::structured;

const TERM: usize = 0;
const READING: usize = 1;
const TAGS: usize = 2;
const DEFINITIONS: usize = 4;
const SEQUENCE: usize = 5;
const TERM_TAGS: usize = 6;
const READING_TAGS: usize = 7;

const FREQUENCY_PREFIXES: &[&str] = &["rank:", "frequency:", "freq:"];

/// Part-of-speech tokens as they appear in JMdict-derived banks
const POS_TAGS: &[&str] = &[
    "n", "pn", "adv", "adv-to", "exp", "prt", "int", "conj", "aux", "aux-v", "aux-adj", "ctr",
    "pref", "suf", "num", "cop", "unc", "vs", "vk", "vz", "vi", "vt", "v1", "v1-s", "adj-i",
    "adj-ix", "adj-na", "adj-no", "adj-pn", "adj-t", "adj-f", "noun", "verb", "adjective",
    "adverb", "particle", "pronoun", "conjunction", "interjection", "expression", "prefix",
    "suffix", "counter", "auxiliary",
];

const POS_PREFIXES: &[&str] = &["v5", "v4", "v2", "vs-", "adj-", "n-", "aux-"];

/// One positional field, decoded once at the normalization boundary
#[derive(Debug, Clone, PartialEq)]
pub enum RawField {
    Absent,
    Text(String),
    Number(i64),
    List(Vec<RawField>),
    /// Structured markup, rendered by [`structured`]
    Object(Map<String, Value>),
}

impl RawField {
    pub fn decode(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawField::Absent,
            Some(Value::String(s)) => RawField::Text(s.clone()),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .map(RawField::Number)
                .unwrap_or(RawField::Absent),
            Some(Value::Bool(b)) => RawField::Text(b.to_string()),
            Some(Value::Array(items)) => {
                RawField::List(items.iter().map(|v| RawField::decode(Some(v))).collect())
            }
            Some(Value::Object(map)) => RawField::Object(map.clone()),
        }
    }

    fn text(&self) -> Option<&str> {
        match self {
            RawField::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Space-separated strings and lists of strings both count as tag lists
    fn tags(&self) -> Vec<String> {
        match self {
            RawField::Text(s) => s.split_whitespace().map(str::to_string).collect(),
            RawField::List(items) => items
                .iter()
                .filter_map(|item| item.text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn is_glossary(&self) -> bool {
        matches!(self, RawField::Text(_) | RawField::List(_) | RawField::Object(_))
    }
}

/// Normalized definition text
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub text: String,
    pub is_html: bool,
}

impl Definition {
    fn from_field(field: &RawField) -> Self {
        match field {
            RawField::Absent => Definition {
                text: String::new(),
                is_html: false,
            },
            RawField::Text(s) => Definition {
                text: s.clone(),
                is_html: false,
            },
            RawField::Number(n) => Definition {
                text: n.to_string(),
                is_html: false,
            },
            RawField::Object(map) => Definition {
                text: structured::to_html(&Value::Object(map.clone())),
                is_html: true,
            },
            RawField::List(items) => {
                let is_html = items.iter().any(|i| matches!(i, RawField::Object(_) | RawField::List(_)));
                if !is_html {
                    let lines: Vec<String> = items
                        .iter()
                        .filter_map(|item| match item {
                            RawField::Text(s) => Some(s.clone()),
                            RawField::Number(n) => Some(n.to_string()),
                            _ => None,
                        })
                        .collect();
                    return Definition {
                        text: lines.join("\n"),
                        is_html: false,
                    };
                }

                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| {
                        let html = match item {
                            RawField::Absent => return None,
                            RawField::Text(s) => structured::escape_html(s),
                            RawField::Number(n) => n.to_string(),
                            RawField::Object(map) => structured::to_html(&Value::Object(map.clone())),
                            RawField::List(_) => Definition::from_field(item).text,
                        };
                        Some(html)
                    })
                    .collect();
                Definition {
                    text: parts.join("<br>"),
                    is_html: true,
                }
            }
        }
    }
}

fn field(raw: &[Value], index: usize) -> RawField {
    RawField::decode(raw.get(index))
}

fn as_array(raw: &Value) -> Result<&[Value], RecordError> {
    raw.as_array().map(Vec::as_slice).ok_or(RecordError::NotAnArray)
}

fn required_term(raw: &[Value]) -> Result<String, RecordError> {
    match field(raw, TERM) {
        RawField::Text(term) if !term.trim().is_empty() => Ok(term.trim().to_string()),
        RawField::Number(n) => Ok(n.to_string()),
        _ => Err(RecordError::BlankTerm),
    }
}

/// `[.., score: number, glossary, ..]` instead of `[.., definitions, sequence, ..]`
fn is_yomitan_v3(raw: &[Value]) -> bool {
    matches!(field(raw, DEFINITIONS), RawField::Number(_)) && field(raw, SEQUENCE).is_glossary()
}

/// Tags of every tag-bearing field, order-preserving and de-duplicated
pub fn merged_tags(raw: &[Value]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    // v3 keeps its sequence at [6] and term tags at [7]
    let tag_fields = if is_yomitan_v3(raw) {
        vec![TAGS, READING_TAGS]
    } else {
        vec![TAGS, TERM_TAGS, READING_TAGS]
    };
    for index in tag_fields {
        for tag in field(raw, index).tags() {
            if !merged.contains(&tag) {
                merged.push(tag);
            }
        }
    }
    merged
}

fn is_pos_tag(tag: &str) -> bool {
    let lower = tag.to_lowercase();
    POS_TAGS.contains(&lower.as_str()) || POS_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Recognized part-of-speech tags, or every tag when none is recognized
pub fn part_of_speech(tags: &[String]) -> String {
    let recognized: Vec<&str> = tags
        .iter()
        .filter(|t| is_pos_tag(t))
        .map(String::as_str)
        .collect();
    if recognized.is_empty() {
        tags.join(", ")
    } else {
        recognized.join(", ")
    }
}

/// Term bank array -> entry row (id assigned by the store)
pub fn to_entry(raw: &Value, dictionary_id: i64) -> Result<DictionaryEntry, RecordError> {
    let raw = as_array(raw)?;
    let term = required_term(raw)?;

    let reading = match field(raw, READING) {
        RawField::Text(s) => s.trim().to_string(),
        _ => String::new(),
    };

    let definitions = if is_yomitan_v3(raw) {
        field(raw, SEQUENCE)
    } else {
        field(raw, DEFINITIONS)
    };
    let definition = Definition::from_field(&definitions);

    let tags = merged_tags(raw);
    let part_of_speech = part_of_speech(&tags);

    Ok(DictionaryEntry {
        id: 0,
        dictionary_id,
        term,
        reading,
        definition: definition.text,
        part_of_speech,
        tags,
        is_html_content: definition.is_html,
    })
}

/// Frequency fact from the positional layout; `None` when the record has no
/// term or carries no frequency signal at all
pub fn to_frequency(raw: &Value, dictionary_id: i64) -> Option<WordFrequency> {
    let raw = raw.as_array()?;
    let word = required_term(raw).ok()?;

    // A v3 score is popularity, not a rank
    let direct = if is_yomitan_v3(raw) {
        None
    } else {
        match field(raw, DEFINITIONS) {
            RawField::Number(n) => Some(n),
            RawField::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    };

    let frequency = direct.or_else(|| frequency_from_tags(&merged_tags(raw)))?;
    Some(WordFrequency {
        id: 0,
        dictionary_id,
        word,
        frequency,
    })
}

/// Frequency fact carried by a term-bank record's tags. Field [4] is the
/// definition there, never a rank.
pub fn term_frequency(raw: &Value, dictionary_id: i64) -> Option<WordFrequency> {
    let raw = raw.as_array()?;
    let word = required_term(raw).ok()?;
    let frequency = frequency_from_tags(&merged_tags(raw))?;
    Some(WordFrequency {
        id: 0,
        dictionary_id,
        word,
        frequency,
    })
}

/// First `rank:`/`frequency:`/`freq:` tag in field order
pub fn frequency_from_tags(tags: &[String]) -> Option<i64> {
    tags.iter().find_map(|tag| {
        let lower = tag.to_lowercase();
        FREQUENCY_PREFIXES.iter().find_map(|prefix| {
            lower
                .strip_prefix(prefix)
                .and_then(|rest| rest.trim().parse::<i64>().ok())
        })
    })
}

/// One normalized term meta bank record
#[derive(Debug, Clone, PartialEq)]
pub enum MetaRecord {
    Frequency(WordFrequency),
    PitchAccents(Vec<WordPitchAccent>),
}

/// Term meta bank array -> frequency or pitch facts
pub fn to_meta(raw: &Value, dictionary_id: i64) -> Option<MetaRecord> {
    let items = raw.as_array()?;
    let word = required_term(items).ok()?;

    match items.get(1).and_then(Value::as_str) {
        Some("freq") => {
            let frequency = meta_frequency_value(items.get(2)?)?;
            Some(MetaRecord::Frequency(WordFrequency {
                id: 0,
                dictionary_id,
                word,
                frequency,
            }))
        }
        Some("pitch") => {
            let data = items.get(2)?.as_object()?;
            let reading = data
                .get("reading")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let accents: Vec<WordPitchAccent> = data
                .get("pitches")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .filter_map(|pitch| match pitch.get("position")? {
                    Value::Number(n) => Some(n.to_string()),
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .map(|pitch_accent| WordPitchAccent {
                    id: 0,
                    dictionary_id,
                    word: word.clone(),
                    reading: reading.clone(),
                    pitch_accent,
                })
                .collect();
            if accents.is_empty() {
                None
            } else {
                Some(MetaRecord::PitchAccents(accents))
            }
        }
        Some(_) => None,
        None => to_frequency(raw, dictionary_id).map(MetaRecord::Frequency),
    }
}

/// `5`, `"5"`, `"5 (12%)"`, `{value}`, `{displayValue}`, `{reading, frequency}`
fn meta_frequency_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => leading_integer(s),
        Value::Object(map) => {
            if let Some(inner) = map.get("frequency") {
                return meta_frequency_value(inner);
            }
            map.get("value")
                .and_then(meta_frequency_value)
                .or_else(|| map.get("displayValue").and_then(meta_frequency_value))
        }
        _ => None,
    }
}

fn leading_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
