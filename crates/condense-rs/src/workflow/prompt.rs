//! Prompt templates for the map, reduce, final, and executive calls.
//!
//! Each stage has two prompt contracts — with and without user steering
//! instructions — modeled as enum variants rather than runtime branching on
//! an `Option`, so both shapes are explicit and independently testable.
//! The final synthesis reuses the reduce template (it is the same
//! consolidation task at a larger output budget); the executive path has
//! its own single-pass template.

use std::fmt::Write as _;

/// Map-stage template: compress one document fragment.
const MAP_TEMPLATE: &str = "\
Summarize the following section of a document. Capture the concrete facts \
worth acting on when present: locations, equipment, budgets, amounts, \
deadlines, and named parties. This is a summary, not an explanation; the \
goal is to shrink the text.";

/// Reduce/final template: consolidate several summaries into one.
const REDUCE_TEMPLATE: &str = "\
Combine the following section summaries into a single coherent summary. \
Keep every important point mentioned — locations, equipment, budgets, \
amounts, deadlines, named parties. This is a consolidated summary, not an \
explanation; the goal is to shrink the text while keeping the key \
information.";

/// Executive template: one-page strategic overview of a whole document.
const EXECUTIVE_TEMPLATE: &str = "\
Write a concise executive summary of the following document. Focus on the \
strategic and business aspects that matter for decision-making.

Keep it under one page and cover, as the document allows:

- **Primary objective**: what is this document trying to achieve?
- **Scope and key requirements**: what is being requested or specified?
- **Budget and financials**: amounts, payment terms, guarantees.
- **Critical deadlines**: key dates and project duration.
- **Risks and considerations**: constraints, penalties, special requirements.
- **Evaluation criteria**: how proposals or outcomes will be judged.

Include other aspects you judge important and drop headings with no
information. Keep a professional, direct tone and prioritize actionable
information.";

/// Label preceding user steering instructions in WithQuery variants.
const QUERY_HEADER: &str = "ADDITIONAL USER INSTRUCTIONS:";

/// Map-stage prompt for a single sub-chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPrompt<'a> {
    Plain { text: &'a str },
    WithQuery { text: &'a str, query: &'a str },
}

impl<'a> MapPrompt<'a> {
    pub fn new(text: &'a str, query: Option<&'a str>) -> Self {
        match query {
            Some(query) => MapPrompt::WithQuery { text, query },
            None => MapPrompt::Plain { text },
        }
    }

    pub fn render(&self) -> String {
        match self {
            MapPrompt::Plain { text } => {
                format!("{MAP_TEMPLATE}\n\nInput:\n{text}\n\nOutput:\n")
            }
            MapPrompt::WithQuery { text, query } => format!(
                "{MAP_TEMPLATE}\n\n{QUERY_HEADER}\n{query}\n\nInput:\n{text}\n\nOutput:\n"
            ),
        }
    }
}

/// Reduce-stage (and final-synthesis) prompt over a numbered summary list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducePrompt<'a> {
    Plain { summaries: &'a str },
    WithQuery { summaries: &'a str, query: &'a str },
}

impl<'a> ReducePrompt<'a> {
    pub fn new(summaries: &'a str, query: Option<&'a str>) -> Self {
        match query {
            Some(query) => ReducePrompt::WithQuery { summaries, query },
            None => ReducePrompt::Plain { summaries },
        }
    }

    pub fn render(&self) -> String {
        match self {
            ReducePrompt::Plain { summaries } => {
                format!("{REDUCE_TEMPLATE}\n\nInput:\n{summaries}\n\nOutput:\n")
            }
            ReducePrompt::WithQuery { summaries, query } => format!(
                "{REDUCE_TEMPLATE}\n\n{QUERY_HEADER}\n{query}\n\nInput:\n{summaries}\n\nOutput:\n"
            ),
        }
    }
}

/// Executive-path prompt over the full rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutivePrompt<'a> {
    pub text: &'a str,
}

impl ExecutivePrompt<'_> {
    pub fn render(&self) -> String {
        format!(
            "{EXECUTIVE_TEMPLATE}\n\nDocument:\n{}\n\nExecutive summary:\n",
            self.text
        )
    }
}

/// Format summaries as the numbered list fed to reduce and final calls.
pub fn numbered_summaries<'a>(summaries: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, summary) in summaries.into_iter().enumerate() {
        let _ = write!(out, "Summary {}:\n{}\n\n", i + 1, summary);
    }
    out.trim_end().to_string()
}
