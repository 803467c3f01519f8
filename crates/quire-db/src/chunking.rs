//! Paragraph chunking of page text for embedding.
//!
//! Pages are split at blank lines and the resulting paragraphs are packed
//! greedily into chunks of at most `max_chunk_size` characters. Paragraphs
//! are never split: one longer than the limit becomes a chunk of its own.
//! Chunking is pure, so re-indexing the same note yields the same chunks.
//!
//! # Example
//!
//! ```rust
//! use quire_db::chunking::{Chunker, ChunkerConfig, ParagraphChunker};
//! use quire_core::PdfPage;
//!
//! let chunker = ParagraphChunker::new(ChunkerConfig { max_chunk_size: 40 });
//! let page = PdfPage { page_number: 3, content: "First.\n\nSecond.".to_string() };
//! let chunks = chunker.chunk_page(&page);
//!
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "First.\n\nSecond.");
//! assert_eq!(chunks[0].page_number, 3);
//! ```

use std::sync::LazyLock;

use regex::Regex;

use quire_core::{defaults, PdfPage};

/// A blank line, optionally holding whitespace, in either line-ending style.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n[ \t\r\f\v]*\n").expect("paragraph break pattern"));

/// Separator placed between paragraphs packed into one chunk.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Configuration for chunking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum size of a multi-paragraph chunk in characters.
    pub max_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: defaults::MAX_CHUNK_SIZE,
        }
    }
}

/// A chunk of page text with its page provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChunk {
    pub text: String,
    pub page_number: i32,
}

impl PageChunk {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Common trait for chunking strategies.
pub trait Chunker: Send + Sync {
    /// Chunk one page.
    fn chunk_page(&self, page: &PdfPage) -> Vec<PageChunk>;

    /// Get the configuration used by this chunker.
    fn config(&self) -> &ChunkerConfig;

    /// Chunk pages in order into one sequence.
    fn chunk_pages(&self, pages: &[PdfPage]) -> Vec<PageChunk> {
        pages.iter().flat_map(|page| self.chunk_page(page)).collect()
    }
}

/// Splits text at blank lines and packs paragraphs up to the size limit.
#[derive(Debug, Clone, Default)]
pub struct ParagraphChunker {
    config: ChunkerConfig,
}

impl ParagraphChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Non-blank, trimmed paragraphs in document order.
    pub fn paragraphs(text: &str) -> Vec<&str> {
        PARAGRAPH_BREAK
            .split(text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}

impl Chunker for ParagraphChunker {
    fn chunk_page(&self, page: &PdfPage) -> Vec<PageChunk> {
        let max = self.config.max_chunk_size;
        let separator_len = PARAGRAPH_SEPARATOR.len();
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        let mut flush = |buffer: &mut String, buffer_len: &mut usize| {
            if !buffer.is_empty() {
                chunks.push(PageChunk {
                    text: std::mem::take(buffer),
                    page_number: page.page_number,
                });
                *buffer_len = 0;
            }
        };

        for para in Self::paragraphs(&page.content) {
            let para_len = para.chars().count();
            if !buffer.is_empty() && buffer_len + separator_len + para_len > max {
                flush(&mut buffer, &mut buffer_len);
            }

            if !buffer.is_empty() {
                buffer.push_str(PARAGRAPH_SEPARATOR);
                buffer_len += separator_len;
            }
            buffer.push_str(para);
            buffer_len += para_len;
        }
        flush(&mut buffer, &mut buffer_len);

        chunks
    }

    fn config(&self) -> &ChunkerConfig {
        &self.config
    }
}
