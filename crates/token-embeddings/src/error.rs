use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing model file: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to load tokenizer: {0}")]
    Tokenizer(String),

    #[error("Failed to read weights: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Row {id} is outside the embedding matrix ({rows} rows)")]
    RowOutOfRange { id: u32, rows: usize },

    #[error("Embedding data has {actual} values, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
