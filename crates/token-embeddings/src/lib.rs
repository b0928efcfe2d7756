#![deny(clippy::all)]

pub mod bf16;
mod compact;
mod error;
mod matrix;
mod metadata;
mod model;
mod pipeline;
mod reader;
mod vocab;
mod writer;

// Re-export for external use
pub use compact::{compact_rows, CompactBlob, BYTE_ORDER};
pub use error::{Error, Result};
pub use matrix::EmbeddingMatrix;
pub use metadata::{Metadata, SpecialTokens, DTYPE_TAG};
pub use model::{load_model_inputs, shard_for_tensor, ModelInputs, ModelSource, EMBED_TOKENS_TENSOR};
pub use pipeline::{export, ExportReport};
pub use reader::{cosine_similarity, CompactEmbeddings};
pub use vocab::{clean_token, filter_vocab, is_retained, FilterOutcome, FilteredVocab, MAX_TOKEN_CHARS};
pub use writer::{write_artifacts, ArtifactPaths, EMBEDDINGS_FILE, METADATA_FILE, OUTPUT_DIR};

/// Word-boundary marker used by SentencePiece-derived tokenizers.
///
/// Mistral inherits "▁" (U+2581 LOWER ONE EIGHTH BLOCK) from Google's
/// SentencePiece; a leading marker means the token starts a new word.
pub const SPACE_MARKER: char = '\u{2581}';

/// Default model whose embedding table is exported.
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-v0.1";

/// Type alias for a token-string → id mapping as produced by a tokenizer.
pub type Vocabulary = std::collections::HashMap<String, u32>;
