//! Note-extractor stage: split the report into atomic vault notes.

use std::collections::HashSet;
use std::future::Future;

use quarry_types::note::AtomicNote;
use quarry_types::output::{ExtractedNote, NoteExtractionOutput};

use super::{NOTE_EXTRACTOR, bullet_block};
use crate::memory::{render_summary_note, slug, summary_note_id};
use crate::pipeline::stage::{Stage, StageError, StageInput};
use crate::pipeline::state::{LogEntry, LogRole, StateUpdate};

pub struct NoteExtractorStage;

/// Normalize model-proposed notes: slug ids (unique within the batch),
/// lowercase tags, and a link to the topic's summary note.
fn atomic_notes(topic: &str, extracted: Vec<ExtractedNote>) -> Vec<AtomicNote> {
    let summary_id = summary_note_id(topic);
    let mut seen = HashSet::from([summary_id.clone()]);

    extracted
        .into_iter()
        .map(|note| {
            let base = slug(if note.id.trim().is_empty() { &note.title } else { &note.id });
            let mut id = base.clone();
            let mut n = 2;
            while !seen.insert(id.clone()) {
                id = format!("{base}-{n}");
                n += 1;
            }

            let tags = note
                .tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();

            AtomicNote {
                id,
                title: note.title.trim().to_string(),
                content: note.content,
                tags,
                links: vec![summary_id.clone()],
            }
        })
        .collect()
}

impl Stage for NoteExtractorStage {
    fn name(&self) -> &str {
        NOTE_EXTRACTOR
    }

    fn run<'a>(
        &'a self,
        input: StageInput<'a>,
    ) -> impl Future<Output = Result<StateUpdate, StageError>> + Send + 'a {
        async move {
            let StageInput {
                state,
                context,
                tools,
            } = input;

            let user = [
                format!("Topic: {}", state.topic),
                bullet_block("Key insights", &state.key_insights),
                format!("Report:\n{}", state.report),
            ]
            .join("\n\n");

            let output: NoteExtractionOutput = tools
                .structured(
                    context,
                    &tools.prompts.note_extractor.system_prompt,
                    user,
                    "note_extraction_output",
                )
                .await?;

            let mut notes = atomic_notes(&state.topic, output.notes);
            let summary = render_summary_note(&state.topic, &notes, &state.report);
            notes.push(summary);

            let paths = tools.artifacts.persist_notes(&state.topic, &notes).await?;
            tracing::info!(run_id = %context.run_id(), notes = paths.len(), "vault notes written");

            Ok(StateUpdate {
                atomic_notes: Some(notes),
                ..StateUpdate::default().message(
                    LogEntry::new(
                        format!("{NOTE_EXTRACTOR}-done"),
                        LogRole::Tool,
                        format!("Wrote {} notes to the vault.", paths.len()),
                    )
                    .with_stage(NOTE_EXTRACTOR),
                )
            })
        }
    }
}
