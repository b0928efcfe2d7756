use crate::bf16;
use crate::error::{Error, Result};
use crate::matrix::EmbeddingMatrix;

/// Byte order of every code in the binary artifact.
///
/// The file carries no endianness tag; readers must assume this.
pub const BYTE_ORDER: &str = "little";

/// bf16 codes for the retained rows, row-major, row `i` = new id `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactBlob {
    codes: Vec<u16>,
    rows: usize,
    dim: usize,
}

impl CompactBlob {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    /// Size of the serialized blob: `rows * dim * 2`.
    pub fn byte_len(&self) -> usize {
        self.codes.len() * 2
    }

    /// Serialize as consecutive little-endian `u16`s.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.byte_len());
        for code in &self.codes {
            bytes.extend_from_slice(&code.to_le_bytes());
        }
        bytes
    }
}

/// Encode rows `retained[0], retained[1], ...` of `matrix` into one blob.
///
/// Every id must have a row; the vocabulary filter guarantees this when it
/// was run against the same matrix.
pub fn compact_rows(matrix: &EmbeddingMatrix, retained: &[u32]) -> Result<CompactBlob> {
    let mut codes = Vec::with_capacity(retained.len() * matrix.dim());
    for &id in retained {
        let row = matrix.row(id).ok_or(Error::RowOutOfRange {
            id,
            rows: matrix.rows(),
        })?;
        bf16::encode_row(row, &mut codes);
    }

    Ok(CompactBlob {
        codes,
        rows: retained.len(),
        dim: matrix.dim(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_matrix() -> EmbeddingMatrix {
        EmbeddingMatrix::from_rows(vec![
            vec![0.0, 0.5],
            vec![1.0, -1.0],
            vec![2.0, 4.0],
            vec![-0.5, 8.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_compacts_retained_rows_in_order() {
        let blob = compact_rows(&toy_matrix(), &[3, 1]).unwrap();

        assert_eq!(blob.rows(), 2);
        assert_eq!(blob.dim(), 2);
        assert_eq!(blob.codes(), &[0xBF00, 0x4100, 0x3F80, 0xBF80]);
    }

    #[test]
    fn test_byte_length_and_order() {
        let blob = compact_rows(&toy_matrix(), &[1, 2, 3]).unwrap();
        let bytes = blob.to_le_bytes();

        assert_eq!(bytes.len(), 3 * 2 * 2);
        assert_eq!(bytes.len(), blob.byte_len());
        // 1.0 -> 0x3F80, low byte first.
        assert_eq!(&bytes[..2], &[0x80, 0x3F]);
    }

    #[test]
    fn test_empty_selection() {
        let blob = compact_rows(&toy_matrix(), &[]).unwrap();
        assert_eq!(blob.rows(), 0);
        assert!(blob.to_le_bytes().is_empty());
    }

    #[test]
    fn test_missing_row_is_an_error() {
        let err = compact_rows(&toy_matrix(), &[0, 9]).unwrap_err();
        assert!(matches!(err, Error::RowOutOfRange { id: 9, rows: 4 }));
    }
}
