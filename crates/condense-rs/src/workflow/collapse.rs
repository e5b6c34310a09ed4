//! Collapse stage: regroup chunks at a coarser granularity.
//!
//! When the accumulated chunk summaries exceed the final context budget,
//! the chunk list is rebuilt one level coarser:
//!
//! - `None → Subsection`: group by the exact first line of each chunk's
//!   text (the verbatim heading, e.g. `"## 1.1 Definitions"`).
//! - `Subsection → Section`: group by the first digit run in the first
//!   line (`"## 1.1 Definitions"` and `"## 1.2 Scope"` both key to `"1"`);
//!   the full first line when no digits are found.
//! - `Section → *`: nothing left to group; the level becomes `Ignore` and
//!   the unchanged list is returned, so the next validation finalizes.
//!
//! A merged chunk reuses prior work: each member chunk becomes one
//! sub-chunk carrying the member's text and its already-computed summary,
//! so re-reduction merges summaries instead of re-summarizing raw text.
//! Single-member groups pass through untouched, summary intact. This stage
//! never calls the completion client.

use tracing::info;

use super::state::{Chunk, CollapseLevel, SubChunk};

/// Grouping key for the `None → Subsection` transition: the verbatim
/// first line.
pub(crate) fn subsection_key(text: &str) -> String {
    text.lines().next().unwrap_or("").trim().to_string()
}

/// Grouping key for the `Subsection → Section` transition: the first
/// contiguous digit run in the first line, or the full line when there is
/// none.
pub(crate) fn section_key(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();

    let mut digits = String::new();
    for ch in first_line.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }

    if digits.is_empty() {
        first_line.to_string()
    } else {
        digits
    }
}

/// Rebuild the chunk list at the next coarser level.
///
/// Returns the new list and the advanced [`CollapseLevel`]. Group order
/// follows each key's first appearance, so document order is preserved.
pub(crate) fn collapse_chunks(
    chunks: Vec<Chunk>,
    level: CollapseLevel,
) -> (Vec<Chunk>, CollapseLevel) {
    let key_of: fn(&str) -> String = match level {
        CollapseLevel::None => subsection_key,
        CollapseLevel::Subsection => section_key,
        CollapseLevel::Section | CollapseLevel::Ignore => {
            // Grouping budget spent; waive further length checks.
            info!("collapse: already at '{level}', setting level to 'ignore'");
            return (chunks, CollapseLevel::Ignore);
        }
    };
    let next = level.next();

    let mut groups: Vec<(String, Vec<Chunk>)> = Vec::new();
    for chunk in chunks {
        let key = key_of(&chunk.text);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(chunk),
            None => groups.push((key, vec![chunk])),
        }
    }
    info!("collapse: {} groups at level '{next}'", groups.len());

    let mut collapsed = Vec::with_capacity(groups.len());
    for (_, mut members) in groups {
        if members.len() == 1 {
            // Nothing to merge; existing summary stays valid.
            collapsed.push(members.remove(0));
            continue;
        }

        let text = members
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        // Each member becomes a leaf carrying its own chunk-level summary;
        // the merged chunk's summary is cleared to force re-reduction.
        let sub_chunks: Vec<SubChunk> = members
            .into_iter()
            .filter(|c| c.summary.is_some())
            .map(|c| SubChunk {
                text: c.text,
                summary: c.summary,
            })
            .collect();

        collapsed.push(Chunk {
            text,
            sub_chunks,
            summary: None,
        });
    }

    (collapsed, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn summarized_chunk(text: &str, summary: &str) -> Chunk {
        Chunk {
            text: text.into(),
            sub_chunks: vec![SubChunk {
                text: text.into(),
                summary: Some(summary.into()),
            }],
            summary: Some(summary.into()),
        }
    }

    fn multiset(texts: impl IntoIterator<Item = String>) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for text in texts {
            *counts.entry(text).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn subsection_key_is_verbatim_first_line() {
        assert_eq!(subsection_key("## 1.1 Definitions\nBody."), "## 1.1 Definitions");
        assert_eq!(subsection_key("single line"), "single line");
        assert_eq!(subsection_key(""), "");
    }

    #[test]
    fn section_key_extracts_leading_number() {
        assert_eq!(section_key("1.1 Definitions\nBody."), "1");
        assert_eq!(section_key("## 12.3 Scope"), "12");
        assert_eq!(section_key("Preamble without numbers"), "Preamble without numbers");
    }

    #[test]
    fn first_level_groups_by_exact_heading() {
        let chunks = vec![
            summarized_chunk("## 1.1 Scope\nfirst part", "s1"),
            summarized_chunk("## 1.1 Scope\nsecond part", "s2"),
            summarized_chunk("## 1.2 Terms\nother", "s3"),
        ];

        let (collapsed, level) = collapse_chunks(chunks, CollapseLevel::None);

        assert_eq!(level, CollapseLevel::Subsection);
        assert_eq!(collapsed.len(), 2);

        let merged = &collapsed[0];
        assert!(merged.summary.is_none(), "merged chunk must re-reduce");
        assert_eq!(merged.sub_chunks.len(), 2);
        assert_eq!(merged.sub_chunks[0].summary.as_deref(), Some("s1"));
        assert_eq!(merged.sub_chunks[1].summary.as_deref(), Some("s2"));
        assert_eq!(merged.text, "## 1.1 Scope\nfirst part\n\n## 1.1 Scope\nsecond part");

        let passthrough = &collapsed[1];
        assert_eq!(passthrough.summary.as_deref(), Some("s3"));
    }

    #[test]
    fn second_level_groups_by_section_number() {
        let chunks = vec![
            summarized_chunk("## 1.1 Scope\na", "s1"),
            summarized_chunk("## 1.2 Terms\nb", "s2"),
            summarized_chunk("## 2.1 Budget\nc", "s3"),
        ];

        let (collapsed, level) = collapse_chunks(chunks, CollapseLevel::Subsection);

        assert_eq!(level, CollapseLevel::Section);
        assert_eq!(collapsed.len(), 2);
        assert!(collapsed[0].summary.is_none());
        assert_eq!(collapsed[0].sub_chunks.len(), 2);
        assert_eq!(collapsed[1].summary.as_deref(), Some("s3"));
    }

    #[test]
    fn section_level_only_sets_ignore() {
        let chunks = vec![
            summarized_chunk("## 1 A\na", "s1"),
            summarized_chunk("## 1 A\nb", "s2"),
        ];
        let before = chunks.clone();

        let (collapsed, level) = collapse_chunks(chunks, CollapseLevel::Section);

        assert_eq!(level, CollapseLevel::Ignore);
        assert_eq!(collapsed, before, "chunk list must pass through unchanged");
    }

    #[test]
    fn collapse_preserves_content_under_grouping() {
        let chunks = vec![
            summarized_chunk("## 1.1 A\nalpha", "s1"),
            summarized_chunk("## 1.1 A\nbeta", "s2"),
            summarized_chunk("## 1.2 B\ngamma", "s3"),
            summarized_chunk("## 1.1 A\ndelta", "s4"),
        ];
        let before = multiset(chunks.iter().map(|c| c.text.clone()));

        let (collapsed, _) = collapse_chunks(chunks, CollapseLevel::None);

        // Texts reachable from the new list: merged members live on as
        // sub-chunk texts, pass-throughs as the chunk text itself.
        let after = multiset(collapsed.into_iter().flat_map(|c| {
            if c.sub_chunks.len() > 1 {
                c.sub_chunks.into_iter().map(|s| s.text).collect::<Vec<_>>()
            } else {
                vec![c.text]
            }
        }));

        assert_eq!(before, after, "no text may be dropped or duplicated");
    }

    #[test]
    fn group_order_follows_first_appearance() {
        let chunks = vec![
            summarized_chunk("## 2 Late\na", "s1"),
            summarized_chunk("## 1 Early\nb", "s2"),
            summarized_chunk("## 2 Late\nc", "s3"),
        ];

        let (collapsed, _) = collapse_chunks(chunks, CollapseLevel::None);

        assert_eq!(collapsed.len(), 2);
        assert!(collapsed[0].text.starts_with("## 2 Late"));
        assert!(collapsed[1].text.starts_with("## 1 Early"));
    }
}
