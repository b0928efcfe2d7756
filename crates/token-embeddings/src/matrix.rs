use crate::error::{Error, Result};

/// Row-major f32 embedding table of shape (rows, dim).
///
/// Row `r` holds the embedding for original token id `r`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    rows: usize,
    dim: usize,
}

impl EmbeddingMatrix {
    /// Wrap flat row-major data. Fails unless `data.len() == rows * dim`.
    pub fn new(data: Vec<f32>, rows: usize, dim: usize) -> Result<Self> {
        let expected = rows * dim;
        if data.len() != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, dim })
    }

    /// Build from per-row vectors, all of which must share one length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        let count = rows.len();
        let mut data = Vec::with_capacity(count * dim);
        for row in rows {
            if row.len() != dim {
                return Err(Error::LengthMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend(row);
        }
        Ok(Self {
            data,
            rows: count,
            dim,
        })
    }

    /// Number of rows (V, the original vocabulary size).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Embedding dimensionality (D).
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, id: u32) -> Option<&[f32]> {
        let id = id as usize;
        if id >= self.rows {
            return None;
        }
        let start = id * self.dim;
        Some(&self.data[start..start + self.dim])
    }
}
