//! zstd content encoding for container payloads.

use std::io::{Cursor, Read};

use zstd::stream::{encode_all, read::Decoder};

use crate::error::{FountainError, Result};

/// Level used when the sender asks for compression without naming one.
pub const DEFAULT_LEVEL: i32 = 19;

/// Compress file content before framing.
pub fn compress_content(input: &[u8], level: i32) -> Result<Vec<u8>> {
    Ok(encode_all(Cursor::new(input), level)?)
}

/// Decompress file content, refusing to inflate past `limit` bytes.
pub fn decompress_content(input: &[u8], limit: u64) -> Result<Vec<u8>> {
    let decoder = Decoder::new(Cursor::new(input))?;
    let mut out = Vec::new();
    decoder.take(limit.saturating_add(1)).read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(FountainError::Container(format!(
            "content inflates past {limit} bytes"
        )));
    }
    Ok(out)
}
