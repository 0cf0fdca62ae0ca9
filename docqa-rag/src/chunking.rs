//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`] — splits by character count with configurable overlap
//! - [`RecursiveChunker`] — splits hierarchically by paragraphs, sentences, then words
//!
//! Sizes and overlaps are counted in characters, so chunk boundaries never
//! fall inside a multi-byte code point regardless of what the extractors emit.

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the pipeline, which also re-keys chunks
/// with a sequence spanning all of an upload's page segments.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split_by_size(&document.text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| make_chunk(document, i, text))
            .collect()
    }
}

/// Splits text hierarchically: paragraphs → sentences → words.
///
/// First splits by paragraph separators (`\n\n`). If a paragraph exceeds
/// `chunk_size`, splits by sentence boundaries (`. `, `! `, `? `). If a
/// sentence still exceeds `chunk_size`, splits by word boundaries, falling
/// back to plain character windows as a last resort.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` — maximum number of characters per chunk
    /// * `chunk_overlap` — number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }

        let separators = ["\n\n", ". ", "! ", "? ", " "];
        let raw_chunks =
            split_and_merge(&document.text, self.chunk_size, self.chunk_overlap, &separators);

        raw_chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| make_chunk(document, i, text))
            .collect()
    }
}

fn make_chunk(document: &Document, index: usize, text: String) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert("chunk_index".to_string(), index.to_string());
    if let Some(page) = document.page {
        metadata.insert("page".to_string(), page.to_string());
    }

    Chunk {
        id: format!("{}_{index}", document.id),
        text,
        embedding: Vec::new(),
        metadata,
        document_id: document.id.clone(),
    }
}

/// Split text by a separator, then merge segments into chunks that respect
/// `chunk_size`. If a merged segment exceeds `chunk_size`, it is split further
/// using the next-level separator. Each merged chunk after the first starts
/// with the trailing `chunk_overlap` characters of its predecessor.
fn split_and_merge(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    if text.chars().count() <= chunk_size || separators.is_empty() {
        return split_by_size(text, chunk_size, chunk_overlap);
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    // Word segments lose their separator in the split, so it is re-added
    // when merging; sentence and paragraph segments keep theirs attached.
    let (segments, joiner): (Vec<&str>, &str) = if separator == " " {
        (text.split(' ').collect(), " ")
    } else {
        (split_keeping_separator(text, separator), "")
    };

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for segment in segments {
        let segment_len = segment.chars().count();
        if current.is_empty() {
            current = segment.to_string();
            current_len = segment_len;
        } else if current_len + joiner.len() + segment_len <= chunk_size {
            current.push_str(joiner);
            current.push_str(segment);
            current_len += joiner.len() + segment_len;
        } else {
            let tail = overlap_tail(&current, chunk_overlap);
            flush_segment(current, chunk_size, chunk_overlap, remaining_separators, &mut chunks);
            if tail.is_empty() {
                current = segment.to_string();
            } else {
                current = format!("{tail}{joiner}{segment}");
            }
            current_len = current.chars().count();
        }
    }

    if !current.is_empty() {
        flush_segment(current, chunk_size, chunk_overlap, remaining_separators, &mut chunks);
    }

    chunks
}

/// Trailing `chunk_overlap` characters of a finished chunk, used to seed the
/// next one so consecutive chunks share context across the boundary.
fn overlap_tail(text: &str, chunk_overlap: usize) -> String {
    if chunk_overlap == 0 {
        return String::new();
    }
    let total = text.chars().count();
    if total <= chunk_overlap {
        return text.to_string();
    }
    let byte_start =
        text.char_indices().nth(total - chunk_overlap).map(|(i, _)| i).unwrap_or(0);
    text[byte_start..].to_string()
}

fn flush_segment(
    segment: String,
    chunk_size: usize,
    chunk_overlap: usize,
    separators: &[&str],
    out: &mut Vec<String>,
) {
    if segment.chars().count() > chunk_size {
        out.extend(split_and_merge(&segment, chunk_size, chunk_overlap, separators));
    } else {
        out.push(segment);
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

/// Character-window splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    let total_chars = boundaries.len();

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let byte_start = boundaries[start];
        let byte_end = if end == total_chars { text.len() } else { boundaries[end] };
        chunks.push(text[byte_start..byte_end].to_string());

        let step = chunk_size.saturating_sub(chunk_overlap);
        if step == 0 {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn doc(text: &str) -> Document {
        Document {
            id: "doc".to_string(),
            text: text.to_string(),
            metadata: HashMap::new(),
            source_uri: None,
            page: Some(2),
        }
    }

    #[test]
    fn fixed_size_respects_size_and_overlap() {
        let text = "a".repeat(1000);
        let chunks = FixedSizeChunker::new(500, 100).chunk(&doc(&text));

        // windows start at 0, 400, 800
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 500);
        assert_eq!(chunks[2].text.len(), 200);
        assert_eq!(chunks[0].id, "doc_0");
        assert_eq!(chunks[2].id, "doc_2");
    }

    #[test]
    fn fixed_size_never_splits_inside_a_code_point() {
        let text = "é".repeat(30);
        let chunks = FixedSizeChunker::new(8, 2).chunk(&doc(&text));

        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 8);
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        assert!(FixedSizeChunker::new(100, 10).chunk(&doc("")).is_empty());
        assert!(RecursiveChunker::new(100, 10).chunk(&doc("")).is_empty());
    }

    #[test]
    fn recursive_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "first paragraph here.", "second paragraph here.");
        let chunks = RecursiveChunker::new(30, 5).chunk(&doc(&text));

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("first paragraph"));
        assert!(chunks[1].text.ends_with("second paragraph here."));
    }

    #[test]
    fn recursive_overlap_carries_across_merged_chunks() {
        let text = "aaaa. bbbb. cccc. dddd.";
        let chunks = RecursiveChunker::new(12, 6).chunk(&doc(text));

        // each chunk opens with the trailing sentence of its predecessor
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].text.starts_with("aaaa."));
        assert!(chunks[0].text.contains("bbbb."));
        assert!(chunks[1].text.starts_with("bbbb."));
        assert!(chunks[1].text.contains("cccc."));
        assert!(chunks[2].text.starts_with("cccc."));
        assert!(chunks[2].text.ends_with("dddd."));
    }

    #[test]
    fn recursive_splits_oversized_sentences_by_words() {
        let text = "word ".repeat(100);
        let chunks = RecursiveChunker::new(40, 10).chunk(&doc(&text));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 40);
        }
    }

    #[test]
    fn chunks_inherit_metadata_and_page() {
        let chunks = FixedSizeChunker::new(100, 10).chunk(&doc("short text"));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.get("chunk_index").map(String::as_str), Some("0"));
        assert_eq!(chunks[0].metadata.get("page").map(String::as_str), Some("2"));
        assert_eq!(chunks[0].document_id, "doc");
    }
}
