//! Incremental search for the `<docId>` marker in an object stream.
//!
//! The scanner keeps every byte it has seen (the caller needs them to relocate
//! the object) but only decodes and searches the most recent chunk, optionally
//! widened by a look-back tail of earlier bytes. With no look-back a tag that
//! straddles a chunk boundary is not found.

use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
pub const DOC_ID_PATTERN: &str = r"(?s)<docId>(.*?)</docId>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Target size of each chunk pulled from the object stream.
    pub chunk_size: usize,
    /// Bytes from the end of earlier chunks prepended to the search window.
    /// Zero searches each chunk in isolation.
    pub lookback_bytes: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            lookback_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    Found { identifier: String, content: Vec<u8> },
    NotFound { content: Vec<u8> },
}

impl ScanResult {
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Found { identifier, .. } => Some(identifier),
            Self::NotFound { .. } => None,
        }
    }

    pub fn content(&self) -> &[u8] {
        match self {
            Self::Found { content, .. } | Self::NotFound { content } => content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    Continue,
    Found,
}

#[derive(Debug, Clone)]
pub struct IdentifierScanner {
    buffer: Vec<u8>,
    lookback_bytes: usize,
    identifier: Option<String>,
    chunks_seen: usize,
}

impl IdentifierScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            buffer: Vec::new(),
            lookback_bytes: options.lookback_bytes,
            identifier: None,
            chunks_seen: 0,
        }
    }

    /// Appends a chunk and searches the current window. Once an identifier has
    /// been found further chunks are ignored.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> ScanStep {
        if self.identifier.is_some() {
            return ScanStep::Found;
        }

        let window_start = self.buffer.len().saturating_sub(self.lookback_bytes);
        self.buffer.extend_from_slice(chunk);
        self.chunks_seen += 1;

        let window = String::from_utf8_lossy(&self.buffer[window_start..]);
        match find_identifier(&window) {
            Some(identifier) => {
                self.identifier = Some(identifier);
                ScanStep::Found
            }
            None => ScanStep::Continue,
        }
    }

    pub fn bytes_seen(&self) -> usize {
        self.buffer.len()
    }

    pub fn chunks_seen(&self) -> usize {
        self.chunks_seen
    }

    pub fn finish(self) -> ScanResult {
        match self.identifier {
            Some(identifier) => ScanResult::Found {
                identifier,
                content: self.buffer,
            },
            None => ScanResult::NotFound {
                content: self.buffer,
            },
        }
    }
}

fn doc_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DOC_ID_PATTERN).expect("docId pattern is a valid regex"))
}

/// Returns the first non-empty, trimmed `<docId>` value in `text`.
pub fn find_identifier(text: &str) -> Option<String> {
    doc_id_regex()
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|value| value.as_str().trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Runs the scanner over an in-memory chunk sequence, stopping at the first
/// match.
pub fn scan_chunks<I, C>(chunks: I, options: ScanOptions) -> ScanResult
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut scanner = IdentifierScanner::new(options);
    for chunk in chunks {
        if scanner.push_chunk(chunk.as_ref()) == ScanStep::Found {
            break;
        }
    }
    scanner.finish()
}
