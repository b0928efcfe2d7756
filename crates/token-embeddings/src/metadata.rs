use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::vocab::FilteredVocab;

/// Encoding tag written to `dtype`: 16-bit truncated floats.
pub const DTYPE_TAG: &str = "bf16";

/// Role name → token string, e.g. `bos_token -> "<s>"`.
pub type SpecialTokens = BTreeMap<String, String>;

/// JSON sidecar describing `embeddings.bin`.
///
/// Consumers should access fields by key; field order is not part of the
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Token string → new id (row index in the binary).
    pub vocab: FilteredVocab,
    /// Number of rows (K).
    pub vocab_size: usize,
    /// Values per row (D).
    pub embedding_dim: usize,
    pub dtype: String,
    /// Word-boundary marker used by the source tokenizer.
    pub space_string: String,
    pub special_tokens: SpecialTokens,
    /// Model the table was extracted from.
    pub original_model: String,
}

impl Metadata {
    pub fn new(
        vocab: FilteredVocab,
        embedding_dim: usize,
        space_marker: char,
        special_tokens: SpecialTokens,
        original_model: impl Into<String>,
    ) -> Self {
        Self {
            vocab_size: vocab.len(),
            vocab,
            embedding_dim,
            dtype: DTYPE_TAG.to_string(),
            space_string: space_marker.to_string(),
            special_tokens,
            original_model: original_model.into(),
        }
    }

    /// Check internal consistency of a record read back from disk.
    ///
    /// Id contiguity is enforced while deserializing `vocab`.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size != self.vocab.len() {
            return Err(Error::InvalidMetadata(format!(
                "vocab_size is {} but vocab has {} entries",
                self.vocab_size,
                self.vocab.len()
            )));
        }
        if self.dtype != DTYPE_TAG {
            return Err(Error::InvalidMetadata(format!(
                "unsupported dtype {:?}, expected {:?}",
                self.dtype, DTYPE_TAG
            )));
        }
        Ok(())
    }

    /// Expected length of the matching binary, in bytes.
    pub fn expected_bytes(&self) -> usize {
        self.vocab_size * self.embedding_dim * 2
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let metadata: Self = serde_json::from_str(json)?;
        metadata.validate()?;
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SPACE_MARKER;

    fn sample() -> Metadata {
        let vocab =
            FilteredVocab::from_ids([("▁cat".to_string(), 0), ("dog".to_string(), 1)]).unwrap();
        let special = SpecialTokens::from([
            ("bos_token".to_string(), "<s>".to_string()),
            ("eos_token".to_string(), "</s>".to_string()),
        ]);
        Metadata::new(vocab, 4096, SPACE_MARKER, special, "mistralai/Mistral-7B-v0.1")
    }

    #[test]
    fn test_fields() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();

        assert_eq!(json["vocab"]["▁cat"], 0);
        assert_eq!(json["vocab"]["dog"], 1);
        assert_eq!(json["vocab_size"], 2);
        assert_eq!(json["embedding_dim"], 4096);
        assert_eq!(json["dtype"], "bf16");
        assert_eq!(json["space_string"], "\u{2581}");
        assert_eq!(json["special_tokens"]["bos_token"], "<s>");
        assert_eq!(json["original_model"], "mistralai/Mistral-7B-v0.1");
    }

    #[test]
    fn test_reads_back() {
        let metadata = sample();
        let parsed = Metadata::from_json(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(parsed, metadata);
        assert_eq!(parsed.expected_bytes(), 2 * 4096 * 2);
    }

    #[test]
    fn test_rejects_inconsistent_size() {
        let mut metadata = sample();
        metadata.vocab_size = 3;
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(matches!(
            Metadata::from_json(&json),
            Err(Error::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_dtype() {
        let mut metadata = sample();
        metadata.dtype = "f16".to_string();
        assert!(metadata.validate().is_err());
    }
}
