//! Vault note rendering: atomic notes and the per-topic summary hub.

use chrono::{DateTime, Utc};

use quarry_types::note::AtomicNote;

use super::document::{single_line, slug};

/// Number of report lines copied into the summary note.
pub const REPORT_EXCERPT_LINES: usize = 20;

/// Id of the hub note that links a topic's atomic notes together.
pub fn summary_note_id(topic: &str) -> String {
    format!("{}-summary", slug(topic))
}

fn inline_list(items: &[String]) -> String {
    let items: Vec<String> = items.iter().map(|item| single_line(item)).collect();
    format!("[{}]", items.join(", "))
}

/// Render one atomic note as a markdown file with front-matter.
pub fn render_atomic_note(note: &AtomicNote, topic: &str, created_at: DateTime<Utc>) -> String {
    let mut lines = vec![
        "---".to_string(),
        format!("zettel_id: \"{}\"", note.id),
        format!("topic: \"{}\"", single_line(topic)),
        format!("created_at: {}", created_at.to_rfc3339()),
        format!("tags: {}", inline_list(&note.tags)),
        format!("links: {}", inline_list(&note.links)),
        "---".to_string(),
        String::new(),
        format!("# {}", single_line(&note.title)),
        String::new(),
        note.content.trim_end().to_string(),
        String::new(),
    ];

    if !note.links.is_empty() {
        let links: Vec<String> = note.links.iter().map(|l| format!("[[{l}]]")).collect();
        lines.push(format!("Linked notes: {}", links.join(" ")));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Build the summary hub note for a topic.
///
/// Links every note in `notes` and carries the first
/// [`REPORT_EXCERPT_LINES`] lines of the report.
pub fn render_summary_note(topic: &str, notes: &[AtomicNote], report: &str) -> AtomicNote {
    let ids: Vec<String> = notes.iter().map(|n| n.id.clone()).collect();

    let mut body = vec!["## Linked Notes".to_string(), String::new()];
    body.extend(ids.iter().map(|id| format!("- [[{id}]]")));
    body.push(String::new());
    body.push("## Report Excerpt".to_string());
    body.push(String::new());
    body.extend(
        report
            .lines()
            .take(REPORT_EXCERPT_LINES)
            .map(str::to_string),
    );

    AtomicNote {
        id: summary_note_id(topic),
        title: format!("{topic} Summary"),
        content: body.join("\n"),
        tags: vec!["summary".to_string()],
        links: ids,
    }
}
