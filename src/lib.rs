use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

pub mod checksum;
pub mod compress;
pub mod config;
pub mod container;
pub mod content_type;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod router;
pub mod slicer;
pub mod soliton;
pub mod transport;

pub use config::EncoderConfig;
pub use container::{Container, ContentEncoding, FileMeta};
pub use decoder::{DecodeState, DecoderSnapshot, FountainDecoder, Ingested, Progress};
pub use encoder::FountainEncoder;
pub use error::{FountainError, Result};
pub use router::{Routed, SessionRouter};

/// Fixed header bytes around the index list: degree, k, total_bytes, checksum.
pub const BLOCK_OVERHEAD: usize = 16;

/// Identity of one logical transfer.
///
/// Blocks carrying a different triple belong to another transfer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodingSession {
    /// Source symbol count.
    pub k: u32,
    /// Length of the framed input before slicing.
    pub total_bytes: u32,
    /// `CRC32(framed) ^ k`, see [`checksum::session_checksum`].
    pub checksum: u32,
}

impl CodingSession {
    /// Session for `data` sliced at `slice_size`.
    pub fn for_data(data: &[u8], slice_size: usize) -> Result<Self> {
        if slice_size == 0 {
            return Err(FountainError::EncoderMisuse(
                "slice size must be positive".into(),
            ));
        }
        let total_bytes = u32::try_from(data.len()).map_err(|_| {
            FountainError::EncoderMisuse(format!(
                "input of {} bytes exceeds the 32-bit length field",
                data.len()
            ))
        })?;
        let k = slicer::symbol_count(data.len(), slice_size) as u32;
        Ok(Self {
            k,
            total_bytes,
            checksum: checksum::session_checksum(data, k),
        })
    }
}

/// One XOR combination of source symbols, as carried on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodedBlock {
    /// Strictly increasing symbol indices; the degree is their count.
    pub indices: Vec<u32>,
    pub session: CodingSession,
    /// XOR of the referenced symbols, `slice_size` bytes.
    pub payload: Vec<u8>,
}

/// Exact wire length of a block with `degree` indices.
pub fn block_len(degree: usize, slice_size: usize) -> Option<usize> {
    degree
        .checked_mul(4)?
        .checked_add(BLOCK_OVERHEAD)?
        .checked_add(slice_size)
}

impl CodedBlock {
    pub fn degree(&self) -> usize {
        self.indices.len()
    }

    /// Check the block invariants: non-zero degree, sorted distinct indices
    /// below `k`, and a payload whose length reproduces `k` from
    /// `total_bytes`.
    pub fn validate(&self) -> Result<()> {
        let k = self.session.k;
        if k == 0 {
            return Err(FountainError::MalformedBlock("symbol count is zero".into()));
        }
        if self.indices.is_empty() {
            return Err(FountainError::MalformedBlock("degree is zero".into()));
        }
        if self.indices.len() > k as usize {
            return Err(FountainError::MalformedBlock(format!(
                "degree {} exceeds symbol count {}",
                self.indices.len(),
                k
            )));
        }
        if self.indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FountainError::MalformedBlock(
                "indices not strictly increasing".into(),
            ));
        }
        if let Some(&last) = self.indices.last() {
            if last >= k {
                return Err(FountainError::MalformedBlock(format!(
                    "index {last} out of range for {k} symbols"
                )));
            }
        }
        if self.payload.is_empty() {
            return Err(FountainError::MalformedBlock("empty payload".into()));
        }
        let expected_k = slicer::symbol_count(self.session.total_bytes as usize, self.payload.len());
        if expected_k != k as usize {
            return Err(FountainError::MalformedBlock(format!(
                "{} bytes in {}-byte slices is {} symbols, block claims {}",
                self.session.total_bytes,
                self.payload.len(),
                expected_k,
                k
            )));
        }
        Ok(())
    }

    /// Encode block to its little-endian wire form
    pub fn encode(&self) -> Result<Vec<u8>> {
        let len = block_len(self.degree(), self.payload.len())
            .ok_or_else(|| FountainError::MalformedBlock("block too large".into()))?;
        let mut buf = Vec::with_capacity(len);

        buf.write_u32::<LittleEndian>(self.degree() as u32)?;
        for &index in &self.indices {
            buf.write_u32::<LittleEndian>(index)?;
        }
        buf.write_u32::<LittleEndian>(self.session.k)?;
        buf.write_u32::<LittleEndian>(self.session.total_bytes)?;
        buf.write_u32::<LittleEndian>(self.session.checksum)?;
        buf.extend_from_slice(&self.payload);

        Ok(buf)
    }

    /// Decode a block whose payload is `slice_size` bytes.
    ///
    /// The buffer must be exactly `16 + 4 * degree + slice_size` bytes for
    /// the degree it declares.
    pub fn decode(data: &[u8], slice_size: usize) -> Result<Self> {
        if data.len() < 4 {
            return Err(FountainError::MalformedBlock(format!(
                "{} bytes is shorter than the degree field",
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);

        let degree = cursor.read_u32::<LittleEndian>()? as usize;
        let expected = block_len(degree, slice_size)
            .ok_or_else(|| FountainError::MalformedBlock(format!("degree {degree} overflows")))?;
        if data.len() != expected {
            return Err(FountainError::MalformedBlock(format!(
                "degree {degree} needs {expected} bytes, got {}",
                data.len()
            )));
        }

        let mut indices = Vec::with_capacity(degree);
        for _ in 0..degree {
            indices.push(cursor.read_u32::<LittleEndian>()?);
        }
        let k = cursor.read_u32::<LittleEndian>()?;
        let total_bytes = cursor.read_u32::<LittleEndian>()?;
        let checksum = cursor.read_u32::<LittleEndian>()?;

        let mut payload = vec![0u8; slice_size];
        cursor.read_exact(&mut payload)?;

        let block = CodedBlock {
            indices,
            session: CodingSession {
                k,
                total_bytes,
                checksum,
            },
            payload,
        };
        block.validate()?;
        Ok(block)
    }
}
