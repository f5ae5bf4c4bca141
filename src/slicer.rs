//! Fixed-size slicing of the framed input into source symbols.
//!
//! Slicing is a pure function of `(total_bytes, slice_size)`, so the
//! receiver recovers the exact geometry from the session alone.

use crate::error::{FountainError, Result};

/// Number of symbols for `total_bytes` of input, `ceil(total / slice)`.
pub fn symbol_count(total_bytes: usize, slice_size: usize) -> usize {
    if slice_size == 0 {
        return 0;
    }
    total_bytes.div_ceil(slice_size)
}

/// True length of symbol `index`; only the last one may be short.
pub fn symbol_len(total_bytes: usize, slice_size: usize, index: usize) -> usize {
    let start = index.saturating_mul(slice_size);
    total_bytes.saturating_sub(start).min(slice_size)
}

/// XOR `src` into the front of `dst`; bytes past `src.len()` are left as is.
pub(crate) fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Immutable symbol table owned by the sender.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    data: Vec<u8>,
    slice_size: usize,
    count: u32,
}

impl SymbolTable {
    pub fn new(data: Vec<u8>, slice_size: usize) -> Result<Self> {
        if slice_size == 0 {
            return Err(FountainError::EncoderMisuse(
                "slice size must be positive".into(),
            ));
        }
        if data.is_empty() {
            return Err(FountainError::EncoderMisuse("input is empty".into()));
        }
        if u32::try_from(data.len()).is_err() {
            return Err(FountainError::EncoderMisuse(format!(
                "input of {} bytes exceeds the 32-bit length field",
                data.len()
            )));
        }
        let count = symbol_count(data.len(), slice_size) as u32;
        Ok(Self {
            data,
            slice_size,
            count,
        })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn slice_size(&self) -> usize {
        self.slice_size
    }

    pub fn total_bytes(&self) -> usize {
        self.data.len()
    }

    /// The framed bytes the table was built from.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Symbol `index`, unpadded. Empty for indices past the end.
    pub fn symbol(&self, index: u32) -> &[u8] {
        let start = (index as usize).saturating_mul(self.slice_size);
        if start >= self.data.len() {
            return &[];
        }
        let end = (start + self.slice_size).min(self.data.len());
        &self.data[start..end]
    }

    /// XOR of the referenced symbols into a `slice_size` buffer, short
    /// symbols zero-padded.
    pub fn combine(&self, indices: &[u32]) -> Vec<u8> {
        let mut payload = vec![0u8; self.slice_size];
        for &index in indices {
            xor_into(&mut payload, self.symbol(index));
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        assert_eq!(symbol_count(0, 4), 0);
        assert_eq!(symbol_count(1, 4), 1);
        assert_eq!(symbol_count(8, 4), 2);
        assert_eq!(symbol_count(9, 4), 3);
        assert_eq!(symbol_len(9, 4, 0), 4);
        assert_eq!(symbol_len(9, 4, 2), 1);
        assert_eq!(symbol_len(9, 4, 3), 0);
    }

    #[test]
    fn test_slicing_last_symbol_short() {
        let table = SymbolTable::new(b"abcdefghij".to_vec(), 4).unwrap();
        assert_eq!(table.count(), 3);
        assert_eq!(table.symbol(0), b"abcd");
        assert_eq!(table.symbol(1), b"efgh");
        assert_eq!(table.symbol(2), b"ij");
        assert!(table.symbol(3).is_empty());
    }

    #[test]
    fn test_combine_zero_pads_short_symbol() {
        let table = SymbolTable::new(vec![0x0F, 0xF0, 0xAA], 2).unwrap();
        assert_eq!(table.combine(&[1]), vec![0xAA, 0x00]);
        assert_eq!(table.combine(&[0, 1]), vec![0x0F ^ 0xAA, 0xF0]);
    }

    #[test]
    fn test_rejects_misuse() {
        assert!(matches!(
            SymbolTable::new(Vec::new(), 10),
            Err(FountainError::EncoderMisuse(_))
        ));
        assert!(matches!(
            SymbolTable::new(vec![1, 2, 3], 0),
            Err(FountainError::EncoderMisuse(_))
        ));
    }
}
