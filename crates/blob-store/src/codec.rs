//! Base64 chunking of binary payloads.

use std::iter::FusedIterator;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::CodecError;

/// Splits payloads into base64 text chunks and joins them back.
pub struct ChunkCodec;

impl ChunkCodec {
    /// Encodes `data` as padded standard base64 and cuts the text into
    /// pieces of at most `max_chunk_size` characters.
    ///
    /// Empty input yields no chunks. A size of zero is treated as one.
    pub fn split(data: &[u8], max_chunk_size: usize) -> Chunks {
        Chunks {
            encoded: STANDARD.encode(data),
            chunk_size: max_chunk_size.max(1),
            pos: 0,
        }
    }

    /// Concatenates `chunks` in order and decodes the result.
    pub fn join<I, S>(chunks: I) -> Result<Vec<u8>, CodecError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut encoded = String::new();
        for chunk in chunks {
            encoded.push_str(chunk.as_ref());
        }
        Ok(STANDARD.decode(encoded)?)
    }
}

/// Ordered chunks of one encoded payload.
pub struct Chunks {
    encoded: String,
    chunk_size: usize,
    pos: usize,
}

impl Chunks {
    /// Length of the whole encoded payload.
    pub fn encoded_len(&self) -> usize {
        self.encoded.len()
    }
}

impl Iterator for Chunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.pos >= self.encoded.len() {
            return None;
        }
        // Base64 text is ASCII, so every byte offset is a char boundary.
        let end = (self.pos + self.chunk_size).min(self.encoded.len());
        let chunk = self.encoded[self.pos..end].to_string();
        self.pos = end;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.encoded.len() - self.pos).div_ceil(self.chunk_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks {}

impl FusedIterator for Chunks {}
