//! Boundary-aware text chunker.
//!
//! Splits document text into segments (sentences, paragraphs, or fixed
//! character windows) and greedily accumulates them into chunks bounded by
//! [`ChunkingOptions`]. The minimum-size floor takes priority over the size
//! ceiling: a chunk that has not yet reached `min_chunk_size` keeps growing
//! even past `chunk_size`.
//!
//! # Algorithm
//!
//! 1. Normalize the text: unify line endings, collapse 3+ newlines to 2,
//!    collapse runs of spaces/tabs, trim.
//! 2. Split into segments according to `split_on`.
//! 3. Accumulate segments into a running chunk, flushing at `chunk_size`
//!    and replaying the last `chunk_overlap` characters into the next
//!    chunk. Segments larger than `max_chunk_size` are hard-split on
//!    character windows.
//! 4. Flush the final chunk if it reaches `min_chunk_size`, then filter
//!    out anything below the floor.
//!
//! All sizes are measured in characters and every cut lands on a UTF-8
//! boundary — the engine is routinely fed accented French text.

use crate::models::{ChunkingOptions, SplitStrategy};

/// Window of characters inspected when pulling a character-mode cut back to
/// a natural boundary.
const BOUNDARY_SEARCH_WINDOW: usize = 100;

/// Sentences at or below this length are discarded as noise.
const MIN_SENTENCE_CHARS: usize = 10;

/// Paragraphs at or below this length are discarded as noise.
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Split text into chunks according to `options`.
///
/// Returns chunks in source order. Empty or all-whitespace input yields an
/// empty vector.
pub fn chunk_text(text: &str, options: &ChunkingOptions) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let segments = match options.split_on {
        SplitStrategy::Sentence => split_sentences(&cleaned),
        SplitStrategy::Paragraph => split_paragraphs(&cleaned),
        SplitStrategy::Character => split_characters(&cleaned, options.chunk_size),
    };

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for segment in segments {
        let segment_len = char_len(&segment);

        // A single oversized segment is force-split regardless of natural
        // boundaries.
        if segment_len > options.max_chunk_size {
            if !current.trim().is_empty() && current_len >= options.min_chunk_size {
                chunks.push(current.trim().to_string());
            }
            chunks.extend(split_characters(&segment, options.chunk_size));
            current.clear();
            current_len = 0;
            continue;
        }

        if current_len + segment_len > options.chunk_size && !current.trim().is_empty() {
            if current_len >= options.min_chunk_size {
                chunks.push(current.trim().to_string());
                if options.chunk_overlap > 0 {
                    let overlap = tail_chars(&current, options.chunk_overlap);
                    let overlap_len = char_len(overlap);
                    current = format!("{} {}", overlap, segment);
                    current_len = overlap_len + segment_len + 1;
                } else {
                    current = segment;
                    current_len = segment_len;
                }
            } else {
                // Still below the floor: keep extending past the ceiling.
                current.push(' ');
                current.push_str(&segment);
                current_len += segment_len + 1;
            }
        } else if current.trim().is_empty() {
            current = segment;
            current_len = segment_len;
        } else {
            current.push(' ');
            current.push_str(&segment);
            current_len += segment_len + 1;
        }
    }

    if !current.trim().is_empty() && current_len >= options.min_chunk_size {
        chunks.push(current.trim().to_string());
    }

    chunks.retain(|chunk| char_len(chunk) >= options.min_chunk_size);
    chunks
}

/// Normalize line endings and whitespace runs.
fn clean_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut chars = unified.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                let mut run = 1usize;
                while chars.peek() == Some(&'\n') {
                    chars.next();
                    run += 1;
                }
                out.push('\n');
                if run >= 2 {
                    out.push('\n');
                }
            }
            ' ' | '\t' => {
                let mut run = 1usize;
                while matches!(chars.peek(), Some(' ') | Some('\t')) {
                    chars.next();
                    run += 1;
                }
                if run >= 2 {
                    out.push(' ');
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}

/// Split on runs of sentence enders (`.!?`), discarding candidates at or
/// below [`MIN_SENTENCE_CHARS`]. Any trailing remainder above the floor is
/// kept as a final sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0usize;

    let mut iter = text.char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if matches!(c, '.' | '!' | '?') {
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = iter.peek() {
                if matches!(next, '.' | '!' | '?') {
                    end = j + next.len_utf8();
                    iter.next();
                } else {
                    break;
                }
            }
            let sentence = text[last..end].trim();
            if char_len(sentence) > MIN_SENTENCE_CHARS {
                sentences.push(sentence.to_string());
            }
            last = end;
        }
    }

    let remaining = text[last..].trim();
    if char_len(remaining) > MIN_SENTENCE_CHARS {
        sentences.push(remaining.to_string());
    }

    sentences
}

/// Split on blank-line boundaries, discarding paragraphs at or below
/// [`MIN_PARAGRAPH_CHARS`].
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_paragraph(&mut paragraphs, &mut current);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    flush_paragraph(&mut paragraphs, &mut current);

    paragraphs
}

fn flush_paragraph(paragraphs: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if char_len(trimmed) > MIN_PARAGRAPH_CHARS {
        paragraphs.push(trimmed.to_string());
    }
    current.clear();
}

/// Split into windows of `chunk_size` characters, pulling each window's
/// right edge back to the nearest whitespace or sentence ender within the
/// last [`BOUNDARY_SEARCH_WINDOW`] characters, except at text end.
fn split_characters(text: &str, chunk_size: usize) -> Vec<String> {
    let positions: Vec<(usize, char)> = text.char_indices().collect();
    let total = positions.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < total {
        let mut end = (start + chunk_size).min(total);

        if end < total {
            let floor = start.max(end.saturating_sub(BOUNDARY_SEARCH_WINDOW));
            let mut k = end;
            while k > floor {
                let c = positions[k - 1].1;
                if c.is_whitespace() || matches!(c, '.' | '!' | '?') {
                    end = k;
                    break;
                }
                k -= 1;
            }
        }

        let byte_start = positions[start].0;
        let byte_end = if end < total {
            positions[end].0
        } else {
            text.len()
        };
        let piece = text[byte_start..byte_end].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        start = end;
    }

    chunks
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` characters of `s`, on a UTF-8 boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    let count = char_len(s);
    if count <= n {
        return s;
    }
    s.char_indices()
        .nth(count - n)
        .map(|(i, _)| &s[i..])
        .unwrap_or(s)
}
