use std::path::Path;

use crate::compact::compact_rows;
use crate::error::Result;
use crate::metadata::{Metadata, DTYPE_TAG};
use crate::model::ModelInputs;
use crate::vocab::filter_vocab;
use crate::writer::{write_artifacts, ArtifactPaths};

/// Summary of one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub original_vocab_size: usize,
    /// Retained tokens (K).
    pub vocab_size: usize,
    pub embedding_dim: usize,
    pub bytes_written: usize,
    pub paths: ArtifactPaths,
}

/// Filter, compact and write `inputs` under `root/public/`.
///
/// Running twice on the same inputs produces byte-identical artifacts.
pub fn export(inputs: &ModelInputs, root: &Path) -> Result<ExportReport> {
    tracing::info!("Filtering vocabulary...");
    let outcome = filter_vocab(
        &inputs.vocabulary,
        inputs.space_marker,
        inputs.embedding.rows(),
    );

    tracing::info!("Converting to {} format...", DTYPE_TAG);
    let blob = compact_rows(&inputs.embedding, &outcome.retained)?;

    tracing::info!("Original vocab size: {}", inputs.vocabulary.len());
    tracing::info!("Filtered vocab size: {}", outcome.vocab.len());
    tracing::info!("Embedding shape: ({}, {})", blob.rows(), blob.dim());
    tracing::info!("Data type: {} (stored as little-endian u16)", DTYPE_TAG);

    let metadata = Metadata::new(
        outcome.vocab,
        inputs.embedding.dim(),
        inputs.space_marker,
        inputs.special_tokens.clone(),
        inputs.model_name.clone(),
    );

    let paths = write_artifacts(root, &blob, &metadata)?;

    Ok(ExportReport {
        original_vocab_size: inputs.vocabulary.len(),
        vocab_size: metadata.vocab_size,
        embedding_dim: metadata.embedding_dim,
        bytes_written: blob.byte_len(),
        paths,
    })
}
