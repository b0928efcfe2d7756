//! Writing the binary + JSON artifact pair.

use std::fs;
use std::path::{Path, PathBuf};

use crate::compact::CompactBlob;
use crate::error::{Error, Result};
use crate::metadata::Metadata;

/// Directory (relative to the output root) holding both artifacts.
pub const OUTPUT_DIR: &str = "public";
pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const METADATA_FILE: &str = "metadata.json";

/// Locations of a written artifact pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub embeddings: PathBuf,
    pub metadata: PathBuf,
}

impl ArtifactPaths {
    /// Fixed artifact locations under `root`.
    pub fn under(root: &Path) -> Self {
        let dir = root.join(OUTPUT_DIR);
        Self {
            embeddings: dir.join(EMBEDDINGS_FILE),
            metadata: dir.join(METADATA_FILE),
        }
    }
}

/// Write `blob` and `metadata` to `root/public/`, creating the directory.
///
/// The binary is written first. Any failure aborts; an interrupted run can
/// leave a stale or truncated pair behind and must be rerun from scratch.
pub fn write_artifacts(root: &Path, blob: &CompactBlob, metadata: &Metadata) -> Result<ArtifactPaths> {
    if blob.rows() != metadata.vocab_size || blob.dim() != metadata.embedding_dim {
        return Err(Error::InvalidMetadata(format!(
            "blob is {}x{} but metadata describes {}x{}",
            blob.rows(),
            blob.dim(),
            metadata.vocab_size,
            metadata.embedding_dim
        )));
    }

    let paths = ArtifactPaths::under(root);
    let dir = root.join(OUTPUT_DIR);
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    fs::write(&paths.embeddings, blob.to_le_bytes()).map_err(|e| Error::io(&paths.embeddings, e))?;
    tracing::info!("Saved embeddings to {}", paths.embeddings.display());

    fs::write(&paths.metadata, metadata.to_json()?).map_err(|e| Error::io(&paths.metadata, e))?;
    tracing::info!("Saved metadata to {}", paths.metadata.display());

    tracing::info!(
        "Total size: {:.1} MB",
        blob.byte_len() as f64 / 1024.0 / 1024.0
    );

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compact_rows, EmbeddingMatrix, FilteredVocab, SpecialTokens, SPACE_MARKER};
    use tempfile::TempDir;

    fn sample() -> (CompactBlob, Metadata) {
        let matrix = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let blob = compact_rows(&matrix, &[1]).unwrap();
        let vocab = FilteredVocab::from_ids([("dog".to_string(), 0)]).unwrap();
        let metadata = Metadata::new(vocab, 3, SPACE_MARKER, SpecialTokens::new(), "toy");
        (blob, metadata)
    }

    #[test]
    fn test_creates_output_dir() {
        let temp_dir = TempDir::new().unwrap();
        let (blob, metadata) = sample();

        let paths = write_artifacts(temp_dir.path(), &blob, &metadata).unwrap();

        assert_eq!(paths.embeddings, temp_dir.path().join("public/embeddings.bin"));
        assert_eq!(paths.metadata, temp_dir.path().join("public/metadata.json"));
        assert_eq!(fs::read(&paths.embeddings).unwrap().len(), 3 * 2);
        let json = fs::read_to_string(&paths.metadata).unwrap();
        assert_eq!(Metadata::from_json(&json).unwrap(), metadata);
    }

    #[test]
    fn test_overwrites_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let (blob, metadata) = sample();
        let paths = ArtifactPaths::under(temp_dir.path());
        fs::create_dir_all(temp_dir.path().join(OUTPUT_DIR)).unwrap();
        fs::write(&paths.embeddings, vec![0u8; 1000]).unwrap();

        write_artifacts(temp_dir.path(), &blob, &metadata).unwrap();

        assert_eq!(fs::read(&paths.embeddings).unwrap().len(), 6);
    }

    #[test]
    fn test_unwritable_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the output directory should go.
        fs::write(temp_dir.path().join(OUTPUT_DIR), b"not a dir").unwrap();
        let (blob, metadata) = sample();

        let err = write_artifacts(temp_dir.path(), &blob, &metadata).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let (blob, mut metadata) = sample();
        metadata.embedding_dim = 4;

        let err = write_artifacts(temp_dir.path(), &blob, &metadata).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadata(_)));
        assert!(!temp_dir.path().join(OUTPUT_DIR).exists());
    }
}
