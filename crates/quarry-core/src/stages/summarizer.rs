//! Summarizer stage: draft the markdown report and write it out.

use std::future::Future;

use quarry_types::output::SummarizerOutput;

use super::{SUMMARIZER, bullet_block};
use crate::memory::{ReportInput, render_fallback_report};
use crate::pipeline::stage::{Stage, StageError, StageInput};
use crate::pipeline::state::{LogEntry, LogRole, StateUpdate};

pub struct SummarizerStage;

impl Stage for SummarizerStage {
    fn name(&self) -> &str {
        SUMMARIZER
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

            let sources: Vec<String> = state
                .sources
                .iter()
                .map(|s| format!("{} ({})", s.title, s.url))
                .collect();
            let user = [
                format!("Topic: {}", state.topic),
                bullet_block("Research notes", &state.research_notes),
                bullet_block("Key insights", &state.key_insights),
                bullet_block("Sources", &sources),
            ]
            .join("\n\n");

            let output: SummarizerOutput = tools
                .structured(
                    context,
                    &tools.prompts.summarizer.system_prompt,
                    user,
                    "summarizer_output",
                )
                .await?;

            let report = if output.report_content.trim().is_empty() {
                tracing::warn!(run_id = %context.run_id(), "empty report from model, using fallback layout");
                render_fallback_report(&ReportInput {
                    topic: &state.topic,
                    notes: &state.research_notes,
                    experiments: &state.experiments,
                    insights: &state.key_insights,
                    reasoning: &state.reasoning,
                    sources: &state.sources,
                })
            } else {
                output.report_content
            };

            let path = tools.artifacts.write_report(&report).await?;
            let path = path.display().to_string();
            tracing::info!(run_id = %context.run_id(), path = %path, "report written");

            let mut update = StateUpdate::default();
            if !output.executive_summary.trim().is_empty() {
                update = update.message(
                    LogEntry::new(
                        format!("{SUMMARIZER}-summary"),
                        LogRole::Assistant,
                        output.executive_summary.trim(),
                    )
                    .with_stage(SUMMARIZER),
                );
            }
            update = update.message(
                LogEntry::new(
                    format!("{SUMMARIZER}-done"),
                    LogRole::Tool,
                    format!("Report written to {path}."),
                )
                .with_stage(SUMMARIZER),
            );

            Ok(StateUpdate {
                report: Some(report),
                report_path: Some(path),
                ..update
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::context::ResearchContext;
    use crate::pipeline::state::ResearchState;
    use crate::search::ProviderRegistry;
    use crate::testing::{MemoryArtifactStore, ScriptedLlm, tools_with};
    use quarry_types::research::ResearchRequest;
    use uuid::Uuid;

    async fn summarize(model_output: &str, artifacts: MemoryArtifactStore) -> StateUpdate {
        let tools = tools_with(
            ScriptedLlm::new(vec![Ok(model_output.to_string())]),
            ProviderRegistry::new(),
            artifacts,
        );
        let request = ResearchRequest::new("graph databases");
        let context = ResearchContext::from_request("research", Uuid::now_v7(), &request).unwrap();
        let mut state = ResearchState::initial("research", &request, vec![]);
        state.research_notes = vec!["note one".to_string()];
        state.key_insights = vec!["insight one".to_string()];

        SummarizerStage
            .run(StageInput {
                state: &state,
                context: &context,
                tools: &tools,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_summarizer_writes_model_report() {
        let artifacts = MemoryArtifactStore::default();
        let update = summarize(
            r##"{"report_content": "# Graphs\n\nBody.", "executive_summary": "Short.", "sources_used": []}"##,
            artifacts.clone(),
        )
        .await;

        assert_eq!(update.report.as_deref(), Some("# Graphs\n\nBody."));
        assert_eq!(update.report_path.as_deref(), Some("outputs/report.md"));
        assert_eq!(
            artifacts.report.lock().unwrap().as_deref(),
            Some("# Graphs\n\nBody.")
        );
        let ids: Vec<_> = update.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["summarizer-summary", "summarizer-done"]);
    }

    #[tokio::test]
    async fn test_empty_report_falls_back_to_legacy_layout() {
        let update = summarize(
            r#"{"report_content": "  ", "executive_summary": "", "sources_used": []}"#,
            MemoryArtifactStore::default(),
        )
        .await;

        let report = update.report.unwrap();
        assert!(report.starts_with("# Research Report: graph databases"));
        assert!(report.contains("- insight one"));
        assert_eq!(update.messages.len(), 1);
    }
}
