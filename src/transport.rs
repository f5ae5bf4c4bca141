//! Text form of a block for the optical channel: standard base64, with an
//! optional scheme prefix so a generic scanner app can hand the string to
//! this decoder.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;

use crate::error::Result;
use crate::CodedBlock;

pub fn encode(bytes: &[u8], prefix: &str) -> String {
    let mut text = String::with_capacity(prefix.len() + bytes.len().div_ceil(3) * 4);
    text.push_str(prefix);
    BASE64_STANDARD.encode_string(bytes, &mut text);
    text
}

/// Inverse of [`encode`]. The prefix is optional on input.
pub fn decode(text: &str, prefix: &str) -> Result<Vec<u8>> {
    let body = text.trim();
    let body = body.strip_prefix(prefix).unwrap_or(body);
    Ok(BASE64_STANDARD.decode(body)?)
}

/// Serialize and text-encode a block in one step.
pub fn encode_block(block: &CodedBlock, prefix: &str) -> Result<String> {
    Ok(encode(&block.encode()?, prefix))
}

/// Text-decode and parse a scanned block.
pub fn decode_block(text: &str, prefix: &str, slice_size: usize) -> Result<CodedBlock> {
    CodedBlock::decode(&decode(text, prefix)?, slice_size)
}
