//! Persist stage: sources CSV and the run's memory document.

use std::future::Future;
use std::path::Path;

use super::PERSIST;
use crate::memory::RunArtifacts;
use crate::pipeline::stage::{Stage, StageError, StageInput};
use crate::pipeline::state::{LogEntry, LogRole, StateUpdate};

pub struct PersistStage;

impl Stage for PersistStage {
    fn name(&self) -> &str {
        PERSIST
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

            let csv = tools.artifacts.write_sources(&state.sources).await?;
            let memory = tools
                .artifacts
                .persist_run(&RunArtifacts {
                    topic: &state.topic,
                    notes: &state.research_notes,
                    insights: &state.key_insights,
                    reasoning: &state.reasoning,
                    sources: &state.sources,
                    report_path: state.report_path.as_deref().map(Path::new),
                })
                .await?;

            tracing::info!(
                run_id = %context.run_id(),
                sources = %csv.display(),
                memory = %memory.display(),
                "run artifacts persisted"
            );

            Ok(StateUpdate::default().message(
                LogEntry::new(
                    format!("{PERSIST}-done"),
                    LogRole::Tool,
                    format!(
                        "Saved sources to {} and memory to {}.",
                        csv.display(),
                        memory.display()
                    ),
                )
                .with_stage(PERSIST),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::parse_memory_document;
    use crate::pipeline::context::ResearchContext;
    use crate::pipeline::state::ResearchState;
    use crate::search::ProviderRegistry;
    use crate::testing::{MemoryArtifactStore, ScriptedLlm, tools_with};
    use quarry_types::research::ResearchRequest;
    use quarry_types::source::SourceRecord;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_persist_writes_csv_and_memory() {
        let artifacts = MemoryArtifactStore::default();
        let tools = tools_with(ScriptedLlm::new(vec![]), ProviderRegistry::new(), artifacts.clone());
        let request = ResearchRequest::new("graph databases");
        let context = ResearchContext::from_request("research", Uuid::now_v7(), &request).unwrap();
        let mut state = ResearchState::initial("research", &request, vec![]);
        state.key_insights = vec!["Adjacency is cheap.".to_string()];
        state.sources = vec![SourceRecord::new("A, B", "https://a", "", "brave", Some(1.5))];
        state.report_path = Some("outputs/report.md".to_string());

        let update = PersistStage
            .run(StageInput {
                state: &state,
                context: &context,
                tools: &tools,
            })
            .await
            .unwrap();

        assert_eq!(
            update.messages[0].content,
            "Saved sources to outputs/sources.csv and memory to .memories/graph-databases-1.md."
        );
        let csv = artifacts.sources_csv.lock().unwrap().clone().unwrap();
        assert!(csv.contains("\"A, B\",https://a,,brave,1.5"));

        let memories = artifacts.memories.lock().unwrap();
        let doc = parse_memory_document(&memories[0]);
        assert_eq!(
            doc.section("Key Insights").unwrap().items,
            vec!["Adjacency is cheap."]
        );
    }
}
