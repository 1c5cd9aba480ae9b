//! Incremental JSONL decoding for streamed result bodies.

use serde::de::DeserializeOwned;

use crate::error::{LlmError, LlmResult};

/// Splits a chunked byte stream into JSON lines.
///
/// Chunk boundaries from the HTTP body do not line up with record
/// boundaries, so partial lines are buffered until the next newline.
#[derive(Debug, Default)]
pub struct JsonlDecoder {
    buffer: Vec<u8>,
    line_number: usize,
}

impl JsonlDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every complete record it finishes.
    pub fn push<T: DeserializeOwned>(&mut self, chunk: &[u8]) -> LlmResult<Vec<T>> {
        self.buffer.extend_from_slice(chunk);

        let buffer = std::mem::take(&mut self.buffer);
        let mut records = Vec::new();
        let mut start = 0;
        while let Some(offset) = buffer[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let decoded = self.decode_line(&buffer[start..end]);
            start = end + 1;
            match decoded {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(e) => {
                    self.buffer = buffer[start..].to_vec();
                    return Err(e);
                }
            }
        }

        self.buffer = buffer[start..].to_vec();
        Ok(records)
    }

    /// Flush a trailing record that was not newline-terminated.
    pub fn finish<T: DeserializeOwned>(&mut self) -> LlmResult<Option<T>> {
        let line = std::mem::take(&mut self.buffer);
        self.decode_line(&line)
    }

    fn decode_line<T: DeserializeOwned>(&mut self, line: &[u8]) -> LlmResult<Option<T>> {
        self.line_number += 1;
        let trimmed = trim_ascii(line);
        if trimmed.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(trimmed).map(Some).map_err(|e| {
            LlmError::invalid_response(format!("JSONL line {}: {}", self.line_number, e))
        })
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end.max(start)]
}
