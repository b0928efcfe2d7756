//! Vocabulary filtering and dense reindexing.
//!
//! Keeps tokens that read like words (useful for analogy demos) and assigns
//! them new ids `0..K` in ascending order of their original id.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use unicode_general_category::{get_general_category, GeneralCategory};

use crate::Vocabulary;

/// Longest cleaned token (in code points) that is kept.
pub const MAX_TOKEN_CHARS: usize = 20;

/// Leading characters checked for digits.
const DIGIT_PREFIX_CHARS: usize = 3;

/// Separators allowed inside an otherwise alphabetic token.
const ALLOWED_SEPARATORS: [char; 3] = ['_', '-', '.'];

/// Retained tokens indexed by new id.
///
/// Serializes as a JSON object `token -> new_id`, emitted in new-id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredVocab {
    tokens: Vec<String>,
}

impl FilteredVocab {
    /// Number of retained tokens (K).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token with the given new id.
    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// `(token, new_id)` pairs in new-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| (token.as_str(), idx as u32))
    }

    /// Build from a `token -> new_id` mapping, checking that the ids are
    /// exactly `0..len` with no gaps or repeats.
    pub fn from_ids(ids: impl IntoIterator<Item = (String, u32)>) -> Result<Self, String> {
        let mut by_id: BTreeMap<u32, String> = BTreeMap::new();
        for (token, id) in ids {
            if let Some(existing) = by_id.insert(id, token.clone()) {
                return Err(format!(
                    "id {} assigned to both {:?} and {:?}",
                    id, existing, token
                ));
            }
        }
        for (expected, &id) in by_id.keys().enumerate() {
            if id as usize != expected {
                return Err(format!("ids are not contiguous: missing {}", expected));
            }
        }
        Ok(Self {
            tokens: by_id.into_values().collect(),
        })
    }
}

impl Serialize for FilteredVocab {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for FilteredVocab {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VocabVisitor;

        impl<'de> Visitor<'de> for VocabVisitor {
            type Value = FilteredVocab;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping tokens to contiguous ids")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((token, id)) = map.next_entry::<String, u32>()? {
                    entries.push((token, id));
                }
                FilteredVocab::from_ids(entries).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_map(VocabVisitor)
    }
}

/// Result of filtering a vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Original ids of retained tokens; position is the new id.
    pub retained: Vec<u32>,
    pub vocab: FilteredVocab,
    /// Ids dropped because the embedding matrix has no such row.
    pub out_of_range: usize,
}

/// Strip leading and trailing space markers from `token`.
pub fn clean_token(token: &str, space_marker: char) -> &str {
    token.trim_matches(space_marker)
}

/// Whether `token` (original id `id`) should be kept.
///
/// A letter is any character in a Unicode letter category (Lu, Ll, Lt, Lm,
/// Lo), so accented and non-Latin words are kept. Combining marks and
/// letter numbers are not letters. Digits are judged with `char::is_numeric`.
pub fn is_retained(token: &str, id: u32, space_marker: char, row_count: usize) -> bool {
    if token.starts_with('<') {
        return false;
    }
    let cleaned = clean_token(token, space_marker);
    if cleaned.is_empty() || id as usize >= row_count {
        return false;
    }
    looks_like_word(cleaned)
}

fn looks_like_word(cleaned: &str) -> bool {
    if cleaned.chars().count() > MAX_TOKEN_CHARS {
        return false;
    }
    if cleaned
        .chars()
        .take(DIGIT_PREFIX_CHARS)
        .any(|c| c.is_numeric())
    {
        return false;
    }
    // Separators alone (e.g. "--") do not make a word.
    let mut letters = cleaned.chars().filter(|c| !ALLOWED_SEPARATORS.contains(c));
    let mut any = false;
    let all_alphabetic = letters.all(|c| {
        any = true;
        is_letter(c)
    });
    any && all_alphabetic
}

fn is_letter(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::UppercaseLetter
            | GeneralCategory::LowercaseLetter
            | GeneralCategory::TitlecaseLetter
            | GeneralCategory::ModifierLetter
            | GeneralCategory::OtherLetter
    )
}

/// Select usable tokens from `vocab` and reindex them densely.
///
/// Tokens are visited in ascending original id. When several strings share
/// an id, the lexicographically smallest one is used.
pub fn filter_vocab(vocab: &Vocabulary, space_marker: char, row_count: usize) -> FilterOutcome {
    let mut by_id: BTreeMap<u32, &str> = BTreeMap::new();
    for (token, &id) in vocab {
        by_id
            .entry(id)
            .and_modify(|existing| {
                if token.as_str() < *existing {
                    *existing = token.as_str();
                }
            })
            .or_insert(token.as_str());
    }

    let mut outcome = FilterOutcome::default();
    for (id, token) in by_id {
        if id as usize >= row_count {
            outcome.out_of_range += 1;
            continue;
        }
        if is_retained(token, id, space_marker, row_count) {
            outcome.retained.push(id);
            outcome.vocab.tokens.push(token.to_string());
        }
    }

    if outcome.out_of_range > 0 {
        tracing::debug!(
            "Skipped {} token(s) with no embedding row (matrix has {} rows)",
            outcome.out_of_range,
            row_count
        );
    }

    outcome
}
