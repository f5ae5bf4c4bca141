//! Container framing around the transferred file.
//!
//! ```text
//! [4B meta_len LE][meta_len B UTF-8 JSON {"filename","contentType"}]
//! [4B data_len LE][data_len B content]
//! ```
//!
//! The frame is what gets sliced and fountain-coded; the receiver unwraps it
//! once the decoder reports the transfer complete.

use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::compress;
use crate::content_type;
use crate::error::{FountainError, Result};

/// Upper bound on inflated content, a guard against hostile frames.
pub const MAX_CONTENT_LEN: u64 = 1 << 30;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    Zstd,
}

/// File metadata carried ahead of the content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub filename: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    /// Absent for raw content.
    #[serde(
        rename = "contentEncoding",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_encoding: Option<ContentEncoding>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Container {
    pub meta: FileMeta,
    /// Content as framed, i.e. still compressed if the meta says so.
    pub data: Vec<u8>,
}

impl Container {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            meta: FileMeta {
                filename: filename.into(),
                content_type: content_type.into(),
                content_encoding: None,
            },
            data,
        }
    }

    /// Container for a file on disk: basename, guessed content type, and
    /// zstd-compressed content when `level` is given.
    pub fn for_file(path: &Path, content: &[u8], level: Option<i32>) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FountainError::Container(format!("no usable filename in {path:?}")))?;

        let mut container = Self::new(filename, content_type::guess(filename), Vec::new());
        match level {
            Some(level) => {
                container.data = compress::compress_content(content, level)?;
                container.meta.content_encoding = Some(ContentEncoding::Zstd);
            }
            None => container.data = content.to_vec(),
        }
        Ok(container)
    }

    /// Original file content, decompressed if needed.
    pub fn content(&self) -> Result<Vec<u8>> {
        match self.meta.content_encoding {
            None => Ok(self.data.clone()),
            Some(ContentEncoding::Zstd) => compress::decompress_content(&self.data, MAX_CONTENT_LEN),
        }
    }

    /// Frame to the byte stream the slicer consumes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let meta = serde_json::to_vec(&self.meta)?;
        let meta_len = frame_len(meta.len(), "meta")?;
        let data_len = frame_len(self.data.len(), "data")?;

        let mut buf = Vec::with_capacity(8 + meta.len() + self.data.len());
        buf.write_u32::<LittleEndian>(meta_len)?;
        buf.extend_from_slice(&meta);
        buf.write_u32::<LittleEndian>(data_len)?;
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    /// Unwrap a reconstructed frame. Trailing bytes are rejected.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(frame);

        let meta = read_chunk(&mut cursor, "meta")?;
        let meta: FileMeta = serde_json::from_slice(&meta)
            .map_err(|e| FountainError::Container(format!("unreadable meta: {e}")))?;
        let data = read_chunk(&mut cursor, "data")?;

        let consumed = cursor.position() as usize;
        if consumed != frame.len() {
            return Err(FountainError::Container(format!(
                "{} trailing bytes after data",
                frame.len() - consumed
            )));
        }
        Ok(Self { meta, data })
    }
}

fn frame_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| FountainError::Container(format!("{what} of {len} bytes is too large to frame")))
}

fn read_chunk(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<Vec<u8>> {
    let len = cursor
        .read_u32::<LittleEndian>()
        .map_err(|_| FountainError::Container(format!("truncated {what} length")))? as usize;
    let available = cursor.get_ref().len() - cursor.position() as usize;
    if len > available {
        return Err(FountainError::Container(format!(
            "{what} claims {len} bytes, {available} left"
        )));
    }
    let mut chunk = vec![0u8; len];
    cursor.read_exact(&mut chunk)?;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let container = Container::new("a.txt", "text/plain", b"hi".to_vec());
        let frame = container.encode().unwrap();
        let meta = br#"{"filename":"a.txt","contentType":"text/plain"}"#;
        assert_eq!(&frame[0..4], &(meta.len() as u32).to_le_bytes());
        assert_eq!(&frame[4..4 + meta.len()], meta);
        assert_eq!(&frame[4 + meta.len()..8 + meta.len()], &[2, 0, 0, 0]);
        assert_eq!(&frame[8 + meta.len()..], b"hi");
        assert_eq!(Container::decode(&frame).unwrap(), container);
    }

    #[test]
    fn test_compressed_file() {
        let content = b"line of text\n".repeat(100);
        let container = Container::for_file(Path::new("/tmp/log.txt"), &content, Some(3)).unwrap();
        assert_eq!(container.meta.filename, "log.txt");
        assert_eq!(container.meta.content_type, "text/plain");
        assert_eq!(container.meta.content_encoding, Some(ContentEncoding::Zstd));

        let decoded = Container::decode(&container.encode().unwrap()).unwrap();
        assert_eq!(decoded.content().unwrap(), content);
    }

    #[test]
    fn test_meta_from_other_senders() {
        // Senders that never compress write only the two base fields.
        let meta = br#"{"filename":"x.bin","contentType":"application/octet-stream"}"#;
        let mut frame = (meta.len() as u32).to_le_bytes().to_vec();
        frame.extend_from_slice(meta);
        frame.extend_from_slice(&3u32.to_le_bytes());
        frame.extend_from_slice(&[7, 8, 9]);

        let container = Container::decode(&frame).unwrap();
        assert_eq!(container.meta.content_encoding, None);
        assert_eq!(container.content().unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn test_bad_meta_is_container_error() {
        let metas: [&[u8]; 3] = [&[0xFF, 0xFE, 0x7B], b"not json", br#"{"filename":"a"}"#];
        for meta in metas {
            let mut frame = (meta.len() as u32).to_le_bytes().to_vec();
            frame.extend_from_slice(meta);
            frame.extend_from_slice(&0u32.to_le_bytes());
            assert!(matches!(
                Container::decode(&frame),
                Err(FountainError::Container(_))
            ));
        }
    }

    #[test]
    fn test_truncated_and_trailing() {
        let frame = Container::new("f", "text/plain", vec![1, 2, 3]).encode().unwrap();
        for cut in [0, 2, 10, frame.len() - 1] {
            assert!(Container::decode(&frame[..cut]).is_err());
        }
        let mut long = frame.clone();
        long.push(0);
        assert!(matches!(
            Container::decode(&long),
            Err(FountainError::Container(_))
        ));
    }
}
