//! Report and source-list rendering.

use quarry_types::source::SourceRecord;

/// Inputs for the fallback report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub topic: &'a str,
    pub notes: &'a [String],
    pub experiments: &'a [String],
    pub insights: &'a [String],
    pub reasoning: &'a [String],
    pub sources: &'a [SourceRecord],
}

fn bullets(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items.iter().map(|item| format!("- {item}"))
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() { default } else { value }
}

/// Plain report used when the summarizer returns no report text.
pub fn render_fallback_report(input: &ReportInput<'_>) -> String {
    let mut lines = vec![
        format!("# Research Report: {}", input.topic),
        String::new(),
        "## Executive Summary".to_string(),
        String::new(),
        "This report summarizes the research findings and experiments conducted.".to_string(),
        String::new(),
        "## Research Notes".to_string(),
        String::new(),
    ];
    lines.extend(bullets(input.notes));
    lines.extend(["".to_string(), "## Experiments".to_string(), String::new()]);
    lines.extend(bullets(input.experiments));
    lines.extend(["".to_string(), "## Key Insights".to_string(), String::new()]);
    lines.extend(bullets(input.insights));
    lines.extend([
        String::new(),
        String::new(),
        "## Reasoning Log".to_string(),
        String::new(),
    ]);
    lines.extend(bullets(input.reasoning));
    lines.extend(["".to_string(), "## Sources".to_string(), String::new()]);
    lines.extend(input.sources.iter().map(|s| {
        format!(
            "- {} ({}) [{}]",
            or_default(&s.title, "Unknown"),
            s.url,
            or_default(&s.provider, "unknown")
        )
    }));
    lines.push(String::new());
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

pub const SOURCES_CSV_HEADER: &str = "title,url,notes,provider,score";

/// Quote a CSV field when it contains a comma, a quote, CR or LF.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render sources as CSV with a header row. Absent scores render empty.
pub fn render_sources_csv(sources: &[SourceRecord]) -> String {
    let mut out = String::from(SOURCES_CSV_HEADER);
    out.push('\n');
    for source in sources {
        let score = source.score.map(|s| s.to_string()).unwrap_or_default();
        let row = [
            csv_field(&source.title),
            csv_field(&source.url),
            csv_field(&source.notes),
            csv_field(&source.provider),
            csv_field(&score),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
