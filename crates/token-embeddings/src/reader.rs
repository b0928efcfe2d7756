//! Reading an exported artifact pair back, the way a client would.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::bf16;
use crate::error::{Error, Result};
use crate::metadata::Metadata;
use crate::writer::ArtifactPaths;

/// Decoded view over `embeddings.bin` + `metadata.json`.
pub struct CompactEmbeddings {
    metadata: Metadata,
    codes: Vec<u16>,
    index: HashMap<String, u32>,
}

impl CompactEmbeddings {
    /// Read and validate the artifacts under `root/public/`.
    pub fn open(root: &Path) -> Result<Self> {
        let paths = ArtifactPaths::under(root);

        let json = fs::read_to_string(&paths.metadata).map_err(|e| Error::io(&paths.metadata, e))?;
        let metadata = Metadata::from_json(&json)?;

        let bytes = fs::read(&paths.embeddings).map_err(|e| Error::io(&paths.embeddings, e))?;
        Self::from_parts(metadata, &bytes)
    }

    /// Build from metadata and the raw little-endian binary.
    pub fn from_parts(metadata: Metadata, bytes: &[u8]) -> Result<Self> {
        let expected = metadata.expected_bytes();
        if bytes.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        let codes = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let index = metadata
            .vocab
            .iter()
            .map(|(token, id)| (token.to_string(), id))
            .collect();

        Ok(Self {
            metadata,
            codes,
            index,
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Raw codes of row `id`.
    pub fn codes(&self, id: u32) -> Option<&[u16]> {
        let dim = self.metadata.embedding_dim;
        let start = id as usize * dim;
        self.codes.get(start..start + dim)
    }

    /// Decoded vector for `token`.
    ///
    /// A bare word is also looked up with a leading space marker, since most
    /// whole words are stored that way.
    pub fn vector(&self, token: &str) -> Option<Vec<f32>> {
        self.id(token)
            .and_then(|id| self.codes(id))
            .map(bf16::decode_row)
    }

    fn id(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied().or_else(|| {
            let marked = format!("{}{}", self.metadata.space_string, token);
            self.index.get(&marked).copied()
        })
    }

    /// Tokens most similar to `token` by cosine similarity, excluding itself.
    ///
    /// Returns `(token, similarity)` sorted by similarity (descending).
    pub fn most_similar(&self, token: &str, top_k: usize) -> Result<Vec<(String, f32)>> {
        let Some(query_id) = self.id(token) else {
            return Ok(vec![]);
        };
        let query = self.vector(token).unwrap_or_default();

        let mut similarities = Vec::with_capacity(self.metadata.vocab_size);
        for (candidate, id) in self.metadata.vocab.iter() {
            if id == query_id {
                continue;
            }
            let row = bf16::decode_row(self.codes(id).unwrap_or_default());
            similarities.push((candidate, cosine_similarity(&query, &row)?));
        }

        similarities.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let k = top_k.min(similarities.len());
        Ok(similarities[..k]
            .iter()
            .map(|(token, sim)| (token.to_string(), *sim))
            .collect())
    }
}

/// Compute cosine similarity between two embedding vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::LengthMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    if a.is_empty() {
        return Ok(0.0);
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot_product / (magnitude_a * magnitude_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FilteredVocab, SpecialTokens, SPACE_MARKER};

    fn toy() -> CompactEmbeddings {
        let vocab = FilteredVocab::from_ids([
            ("▁cat".to_string(), 0),
            ("▁dog".to_string(), 1),
            ("car".to_string(), 2),
        ])
        .unwrap();
        let metadata = Metadata::new(vocab, 2, SPACE_MARKER, SpecialTokens::new(), "toy");
        let rows: [[f32; 2]; 3] = [[1.0, 0.0], [0.75, 0.25], [0.0, 1.0]];
        let bytes: Vec<u8> = rows
            .iter()
            .flatten()
            .flat_map(|&x| bf16::encode(x).to_le_bytes())
            .collect();
        CompactEmbeddings::from_parts(metadata, &bytes).unwrap()
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6, "Identical vectors should have similarity 1.0");
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_vector_lookup_with_space_marker() {
        let embeddings = toy();
        assert_eq!(embeddings.vector("cat"), Some(vec![1.0, 0.0]));
        assert_eq!(embeddings.vector("▁dog"), Some(vec![0.75, 0.25]));
        assert_eq!(embeddings.vector("car"), Some(vec![0.0, 1.0]));
        assert_eq!(embeddings.vector("bird"), None);
    }

    #[test]
    fn test_most_similar_excludes_query() {
        let embeddings = toy();
        let similar = embeddings.most_similar("cat", 5).unwrap();

        let tokens: Vec<&str> = similar.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens, vec!["▁dog", "car"]);
        assert!(embeddings.most_similar("bird", 5).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_truncated_binary() {
        let vocab = FilteredVocab::from_ids([("cat".to_string(), 0)]).unwrap();
        let metadata = Metadata::new(vocab, 4, SPACE_MARKER, SpecialTokens::new(), "toy");
        let result = CompactEmbeddings::from_parts(metadata, &[0u8; 7]);
        assert!(matches!(
            result,
            Err(Error::LengthMismatch {
                expected: 8,
                actual: 7
            })
        ));
    }
}
