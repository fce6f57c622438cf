//! Memory document contract.
//!
//! One memory document is written per run. Its layout is fixed: a
//! front-matter block followed by `# Key Insights`, `# Reasoning Log` and
//! `# Research Notes` bullet sections. Later runs read the insights back
//! through [`extract_insights`], so rendering and parsing must agree.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use quarry_types::source::SourceRecord;

pub const KEY_INSIGHTS_HEADING: &str = "# Key Insights";
pub const REASONING_HEADING: &str = "# Reasoning Log";
pub const NOTES_HEADING: &str = "# Research Notes";

/// Everything a finished run contributes to its memory document.
#[derive(Debug, Clone, Copy)]
pub struct RunArtifacts<'a> {
    pub topic: &'a str,
    pub notes: &'a [String],
    pub insights: &'a [String],
    pub reasoning: &'a [String],
    pub sources: &'a [SourceRecord],
    pub report_path: Option<&'a Path>,
}

/// A parsed memory document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDocument {
    /// Front-matter keys with surrounding double quotes removed.
    pub front_matter: BTreeMap<String, String>,
    pub sections: Vec<MemorySection>,
}

impl MemoryDocument {
    pub fn section(&self, heading: &str) -> Option<&MemorySection> {
        self.sections.iter().find(|s| s.heading == heading)
    }
}

/// A heading and the bullets under it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySection {
    /// Heading text without the leading `#` markers.
    pub heading: String,
    pub items: Vec<String>,
}

// ---------------------------------------------------------------------------
// Slug
// ---------------------------------------------------------------------------

/// File-name safe form of a topic.
///
/// Lowercases, maps whitespace to `-`, drops everything except ASCII
/// alphanumerics, `-` and `_`. An empty result becomes `untitled`.
pub fn slug(topic: &str) -> String {
    let slug: String = topic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

/// Collapse line breaks (and the whitespace around them) into single spaces
/// so a value fits on one bullet or front-matter line.
pub(crate) fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_bullets(lines: &mut Vec<String>, heading: &str, items: &[String]) {
    lines.push(heading.to_string());
    lines.push(String::new());
    lines.extend(items.iter().map(|item| format!("- {}", single_line(item))));
    lines.push(String::new());
}

/// Render the memory document for one run.
pub fn render_memory_document(run: &RunArtifacts<'_>, created_at: DateTime<Utc>) -> String {
    let report_path = run
        .report_path
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    let mut lines = vec![
        "---".to_string(),
        format!("topic: \"{}\"", single_line(run.topic)),
        format!("created_at: {}", created_at.to_rfc3339()),
        "type: research_run".to_string(),
        format!("notes_count: {}", run.notes.len()),
        format!("source_count: {}", run.sources.len()),
        format!("insight_count: {}", run.insights.len()),
        format!("reasoning_count: {}", run.reasoning.len()),
        format!("report_path: \"{report_path}\""),
        "---".to_string(),
        String::new(),
    ];
    push_bullets(&mut lines, KEY_INSIGHTS_HEADING, run.insights);
    push_bullets(&mut lines, REASONING_HEADING, run.reasoning);
    push_bullets(&mut lines, NOTES_HEADING, run.notes);

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Parse
// ---------------------------------------------------------------------------

/// Heading level and text, if `line` is a markdown ATX heading.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &line[level..];
    if rest.is_empty() {
        return Some((level, ""));
    }
    rest.strip_prefix(' ').map(|text| (level, text.trim()))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse a memory document into its front-matter and sections.
///
/// Tolerant: a document without front-matter yields an empty map, and
/// non-bullet lines inside sections are ignored.
pub fn parse_memory_document(text: &str) -> MemoryDocument {
    let mut doc = MemoryDocument::default();
    let mut lines = text.lines().peekable();

    if lines.peek().map(|l| l.trim_end()) == Some("---") {
        lines.next();
        for line in lines.by_ref() {
            if line.trim_end() == "---" {
                break;
            }
            if let Some((key, value)) = line.split_once(':') {
                doc.front_matter
                    .insert(key.trim().to_string(), unquote(value.trim()).to_string());
            }
        }
    }

    for line in lines {
        if let Some((_, text)) = heading(line) {
            doc.sections.push(MemorySection {
                heading: text.to_string(),
                items: Vec::new(),
            });
        } else if let (Some(item), Some(section)) = (line.strip_prefix("- "), doc.sections.last_mut()) {
            section.items.push(item.trim().to_string());
        }
    }

    doc
}

/// Bullets under the first `# Key Insights` heading.
///
/// The heading must start the line and match case-sensitively (trailing
/// whitespace is allowed). Collection stops at the next heading of any
/// level. A document without the heading has no insights.
pub fn extract_insights(text: &str) -> Vec<String> {
    let mut lines = text.lines();
    if !lines
        .by_ref()
        .any(|line| line.trim_end() == KEY_INSIGHTS_HEADING)
    {
        return Vec::new();
    }

    lines
        .take_while(|line| heading(line).is_none())
        .filter_map(|line| line.strip_prefix("- "))
        .map(|item| item.trim().to_string())
        .collect()
}

/// Insights across several memory documents, in document order.
pub fn extract_memory_insights<S: AsRef<str>>(memories: &[S]) -> Vec<String> {
    memories
        .iter()
        .flat_map(|m| extract_insights(m.as_ref()))
        .collect()
}
