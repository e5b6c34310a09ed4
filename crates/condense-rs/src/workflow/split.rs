//! Token-budgeted sub-chunk splitter.
//!
//! Splits a chunk's text into sub-chunks that respect the map-stage input
//! budget, with zero overlap. Splitting occurs on paragraph boundaries
//! (`\n\n`) when possible; a single paragraph larger than the budget is
//! hard-split at the nearest newline or space, snapping to UTF-8 char
//! boundaries. Deterministic for a given input and budget.
//!
//! # Algorithm
//!
//! 1. Convert the token budget to a character budget via the fixed
//!    chars-per-token ratio.
//! 2. Accumulate paragraphs into a buffer until the next paragraph would
//!    exceed the budget, then flush the buffer as a sub-chunk.
//! 3. Hard-split oversized paragraphs at newline/space boundaries.
//! 4. Guarantee at least one sub-chunk per chunk, so a text that fits the
//!    budget yields exactly one.

use super::state::{Chunk, SubChunk};
use super::tokens::CHARS_PER_TOKEN;

/// Split text into fragments of at most `max_tokens` each, zero overlap.
pub fn split_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_chars = (max_tokens * CHARS_PER_TOKEN).max(1);

    let mut pieces = Vec::new();
    let mut buf = String::new();

    for para in text.split("\n\n") {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        let would_be = if buf.is_empty() {
            trimmed.len()
        } else {
            buf.len() + 2 + trimmed.len()
        };

        if would_be > max_chars && !buf.is_empty() {
            pieces.push(std::mem::take(&mut buf));
        }

        if trimmed.len() > max_chars {
            if !buf.is_empty() {
                pieces.push(std::mem::take(&mut buf));
            }
            hard_split(trimmed, max_chars, &mut pieces);
        } else {
            if !buf.is_empty() {
                buf.push_str("\n\n");
            }
            buf.push_str(trimmed);
        }
    }

    if !buf.is_empty() {
        pieces.push(buf);
    }

    // A chunk always yields at least one sub-chunk, even for empty or
    // whitespace-only text.
    if pieces.is_empty() {
        pieces.push(text.trim().to_string());
    }

    pieces
}

/// Split each chunk's text into sub-chunks in place. Summaries are not
/// touched.
pub(crate) fn split_document_chunks(chunks: &mut [Chunk], max_tokens: usize) {
    for chunk in chunks.iter_mut() {
        for piece in split_text(&chunk.text, max_tokens) {
            chunk.sub_chunks.push(SubChunk::new(piece));
        }
    }
}

/// Break one oversized paragraph into budget-sized pieces, preferring
/// newline then space boundaries, snapping to char boundaries.
fn hard_split(para: &str, max_chars: usize, out: &mut Vec<String>) {
    let mut remaining = para;
    while !remaining.is_empty() {
        let limit = snap_to_char_boundary(remaining, remaining.len().min(max_chars));
        let split_at = if limit < remaining.len() {
            remaining[..limit]
                .rfind('\n')
                .or_else(|| remaining[..limit].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(limit)
        } else {
            limit
        };
        // Never emit an empty piece: advance by at least one char.
        let split_at = if split_at == 0 {
            remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len())
        } else {
            split_at
        };

        let piece = remaining[..split_at].trim();
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        remaining = &remaining[split_at..];
    }
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::Chunk;

    #[test]
    fn text_within_budget_yields_one_sub_chunk() {
        let pieces = split_text("Hello, world.", 100);
        assert_eq!(pieces, vec!["Hello, world.".to_string()]);
    }

    #[test]
    fn multiple_paragraphs_within_budget_stay_together() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let pieces = split_text(text, 100);
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].contains("First paragraph."));
        assert!(pieces[0].contains("Second paragraph."));
    }

    #[test]
    fn paragraphs_split_when_budget_exceeded() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let pieces = split_text(text, 8);
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.len() <= 8 * CHARS_PER_TOKEN);
        }
    }

    #[test]
    fn oversized_paragraph_hard_splits_at_spaces() {
        let text = "word ".repeat(100);
        let pieces = split_text(&text, 5);
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.len() <= 5 * CHARS_PER_TOKEN);
            assert!(!piece.is_empty());
        }
    }

    #[test]
    fn no_content_is_dropped_on_split() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let pieces = split_text(text, 4);
        let rejoined: Vec<&str> = pieces
            .iter()
            .flat_map(|p| p.split_whitespace())
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn empty_text_yields_one_empty_sub_chunk() {
        let pieces = split_text("", 10);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0], "");
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "┌──────────────────┐ │ box drawing │ └──────────────────┘".repeat(4);
        let pieces = split_text(&text, 3);
        assert!(!pieces.is_empty());
        // Would have panicked on a bad boundary; also verify budgets held.
        for piece in &pieces {
            assert!(piece.len() <= 3 * CHARS_PER_TOKEN + 4);
        }
    }

    #[test]
    fn deterministic_for_same_input() {
        let text = "Alpha\n\nBeta\n\nGamma\n\nDelta";
        assert_eq!(split_text(text, 2), split_text(text, 2));
    }

    #[test]
    fn split_document_chunks_fills_sub_chunks_in_place() {
        let mut chunks = vec![
            Chunk::from_fragment("short one"),
            Chunk::from_fragment("also short"),
        ];
        split_document_chunks(&mut chunks, 100);
        assert_eq!(chunks[0].sub_chunks.len(), 1);
        assert_eq!(chunks[1].sub_chunks.len(), 1);
        assert_eq!(chunks[0].sub_chunks[0].text, "short one");
        assert!(chunks[0].summary.is_none());
    }
}
