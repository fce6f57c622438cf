//! Researcher stage: search, then ask the model for notes and insights.

use std::future::Future;

use quarry_types::output::ResearcherOutput;
use quarry_types::source::SourceRecord;

use super::{RESEARCHER, bullet_block};
use crate::memory::document::single_line;
use crate::memory::extract_memory_insights;
use crate::pipeline::stage::{Stage, StageError, StageInput};
use crate::pipeline::state::{LogEntry, LogRole, StateUpdate};
use crate::query;
use crate::search::merge_and_rank;

/// Provider tag for sources the model cited.
pub const MODEL_SOURCE_PROVIDER: &str = "researcher";

pub struct ResearcherStage;

impl Stage for ResearcherStage {
    fn name(&self) -> &str {
        RESEARCHER
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

            let compiled = query::compile(state.search_query.as_ref(), &state.topic);
            let limit = context.search_limit();
            let (found, pages) = tokio::join!(
                tools.aggregator.search(&compiled, context.search_mode(), limit),
                tools.fetcher.fetch_all(context.seed_urls()),
            );
            let mut diagnostics = found.diagnostics;
            diagnostics.extend(pages.diagnostics);

            let mut code_context = Vec::new();
            if context.fetch_code_context() {
                let ctx = tools.aggregator.context_search(&compiled.semantic).await;
                diagnostics.extend(ctx.diagnostics);
                if !ctx.value.trim().is_empty() {
                    code_context.push(ctx.value);
                }
            }

            let prior = extract_memory_insights(&state.memories);
            tracing::debug!(
                run_id = %context.run_id(),
                sources = found.value.len(),
                prior_insights = prior.len(),
                "researcher gathered inputs"
            );

            let repositories: Vec<String> =
                context.repositories().iter().map(|r| r.to_string()).collect();
            let ranked: Vec<String> = found
                .value
                .iter()
                .map(|s| format!("{} ({}) [{}]: {}", s.title, s.url, s.provider, s.notes))
                .collect();
            let excerpts: Vec<String> = pages
                .value
                .iter()
                .map(|page| format!("{}: {}", page.url, single_line(&page.text)))
                .collect();

            let user = [
                format!("Topic: {}", state.topic),
                bullet_block("Seed URLs", context.seed_urls()),
                bullet_block("Seed URL excerpts", &excerpts),
                bullet_block("Repositories", &repositories),
                bullet_block("Experiment snippets", context.experiment_snippets()),
                bullet_block("Insights from earlier research", &prior),
                bullet_block("Ranked sources", &ranked),
                bullet_block("Code context", &code_context),
            ]
            .join("\n\n");

            let output: ResearcherOutput = tools
                .structured(
                    context,
                    &tools.prompts.researcher.system_prompt,
                    user,
                    "researcher_output",
                )
                .await?;

            let cited: Vec<SourceRecord> = output
                .sources
                .into_iter()
                .map(|s| {
                    SourceRecord::new(
                        s.title,
                        s.url,
                        s.summary,
                        MODEL_SOURCE_PROVIDER,
                        Some(s.relevance_score).filter(|v| v.is_finite()),
                    )
                })
                .collect();
            let sources = merge_and_rank(found.value, cited, limit as usize);

            let mut update = StateUpdate::default();
            for (i, diagnostic) in diagnostics.into_iter().enumerate() {
                update = update.message(
                    LogEntry::new(format!("{RESEARCHER}-search-{i}"), LogRole::Tool, diagnostic)
                        .with_stage(RESEARCHER),
                );
            }
            update = update.message(
                LogEntry::new(
                    format!("{RESEARCHER}-done"),
                    LogRole::Assistant,
                    format!(
                        "Collected {} sources, {} notes and {} insights.",
                        sources.len(),
                        output.research_notes.len(),
                        output.key_insights.len()
                    ),
                )
                .with_stage(RESEARCHER),
            );

            Ok(StateUpdate {
                compiled_query: Some(compiled),
                sources: Some(sources),
                research_notes: Some(output.research_notes),
                key_insights: Some(output.key_insights),
                reasoning: Some(output.reasoning),
                experiments: Some(context.experiment_snippets().to_vec()),
                code_context: Some(code_context),
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
    use crate::search::{BoxPageFetcher, BoxSearchProvider, ProviderRegistry, SeedFetcher};
    use crate::testing::{
        FailingSearchProvider, MemoryArtifactStore, ScriptedLlm, StaticPageFetcher,
        StaticSearchProvider, tools_with,
    };
    use std::sync::Arc;
    use quarry_types::research::ResearchRequest;
    use quarry_types::search::ProviderError;
    use uuid::Uuid;

    const MODEL_OUTPUT: &str = r#"{
        "research_notes": ["Graph stores keep adjacency on disk."],
        "key_insights": ["Index-free adjacency avoids joins."],
        "sources": [
            {"title": "Docs", "url": "https://docs", "summary": "official", "relevance_score": 0.5},
            {"title": "Cited", "url": "https://cited", "summary": "blog", "relevance_score": 9}
        ],
        "reasoning": ["Compared two engines."]
    }"#;

    #[tokio::test]
    async fn test_researcher_merges_cited_sources_and_logs_diagnostics() {
        let mut providers = ProviderRegistry::new();
        providers.register(BoxSearchProvider::new(StaticSearchProvider::lexical(
            "brave",
            vec![SourceRecord::new("Docs", "https://docs", "", "brave", Some(1.0))],
        )));
        providers.register(BoxSearchProvider::new(FailingSearchProvider::new(
            "broken",
            ProviderError::Decode("bad json".into()),
        )));

        let llm = ScriptedLlm::new(vec![Ok(MODEL_OUTPUT.to_string())]);
        let requests = llm.requests();
        let tools = tools_with(llm, providers, MemoryArtifactStore::default());

        let mut request = ResearchRequest::new("graph databases");
        request.experiment_snippets = vec!["MATCH (n) RETURN n".to_string()];
        let context = ResearchContext::from_request("research", Uuid::now_v7(), &request).unwrap();
        let memory = "# Key Insights\n- Earlier insight\n".to_string();
        let state = ResearchState::initial("research", &request, vec![memory]);

        let update = ResearcherStage
            .run(StageInput {
                state: &state,
                context: &context,
                tools: &tools,
            })
            .await
            .unwrap();

        let compiled = update.compiled_query.unwrap();
        assert_eq!(compiled.semantic, "graph databases");

        let urls: Vec<_> = update
            .sources
            .as_ref()
            .unwrap()
            .iter()
            .map(|s| s.url.as_str())
            .collect();
        // brave docs: 1.0 + 0.5 + 1 = 2.5 beats the cited copy at 2.0.
        // cited: 9 + 0.5 + 0.5 + 1/3.
        assert_eq!(urls, vec!["https://cited", "https://docs"]);
        assert_eq!(update.sources.unwrap()[1].provider, "brave");

        assert_eq!(update.key_insights.unwrap(), vec!["Index-free adjacency avoids joins."]);
        assert_eq!(update.experiments.unwrap(), vec!["MATCH (n) RETURN n"]);
        assert!(update.code_context.unwrap().is_empty());

        let tool_logs: Vec<_> = update
            .messages
            .iter()
            .filter(|m| m.role == LogRole::Tool)
            .collect();
        assert_eq!(tool_logs.len(), 1);
        assert_eq!(tool_logs[0].id, "researcher-search-0");
        assert_eq!(tool_logs[0].content, "broken: invalid response: bad json");

        let prompt = &requests.lock().unwrap()[0].messages[0].content;
        assert!(prompt.contains("- Earlier insight"));
        assert!(prompt.contains("Docs (https://docs) [brave]"));
    }

    #[tokio::test]
    async fn test_researcher_fetches_code_context_when_asked() {
        let mut providers = ProviderRegistry::new();
        providers.register(BoxSearchProvider::new(
            StaticSearchProvider::semantic("exa", vec![]).with_context("fn main() {}"),
        ));
        let tools = tools_with(
            ScriptedLlm::new(vec![Ok(MODEL_OUTPUT.to_string())]),
            providers,
            MemoryArtifactStore::default(),
        );

        let mut request = ResearchRequest::new("graph databases");
        request.fetch_code_context = true;
        let context = ResearchContext::from_request("research", Uuid::now_v7(), &request).unwrap();
        let state = ResearchState::initial("research", &request, vec![]);

        let update = ResearcherStage
            .run(StageInput {
                state: &state,
                context: &context,
                tools: &tools,
            })
            .await
            .unwrap();
        assert_eq!(update.code_context.unwrap(), vec!["fn main() {}"]);
    }

    #[tokio::test]
    async fn test_researcher_reads_seed_urls_into_prompt() {
        let llm = ScriptedLlm::new(vec![Ok(MODEL_OUTPUT.to_string())]);
        let requests = llm.requests();
        let mut tools = tools_with(llm, ProviderRegistry::new(), MemoryArtifactStore::default());
        tools.fetcher = Arc::new(SeedFetcher::new(BoxPageFetcher::new(
            StaticPageFetcher::default()
                .with_page("https://neo4j.com/docs", "Neo4j stores nodes\nand relationships."),
        )));

        let mut request = ResearchRequest::new("graph databases");
        request.seed_urls = vec![
            "https://neo4j.com/docs".to_string(),
            "https://gone.example".to_string(),
        ];
        let context = ResearchContext::from_request("research", Uuid::now_v7(), &request).unwrap();
        let state = ResearchState::initial("research", &request, vec![]);

        let update = ResearcherStage
            .run(StageInput {
                state: &state,
                context: &context,
                tools: &tools,
            })
            .await
            .unwrap();

        let prompt = &requests.lock().unwrap()[0].messages[0].content;
        assert!(prompt.contains(
            "Seed URL excerpts:\n- https://neo4j.com/docs: Neo4j stores nodes and relationships."
        ));
        assert!(!prompt.contains("https://gone.example: "));

        let tool_logs: Vec<_> = update
            .messages
            .iter()
            .filter(|m| m.role == LogRole::Tool)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(tool_logs, vec!["fetch https://gone.example: HTTP 404: not found"]);
    }

    #[tokio::test]
    async fn test_researcher_rejects_malformed_output() {
        let tools = tools_with(
            ScriptedLlm::new(vec![Ok("not json".to_string())]),
            ProviderRegistry::new(),
            MemoryArtifactStore::default(),
        );
        let request = ResearchRequest::new("graph databases");
        let context = ResearchContext::from_request("research", Uuid::now_v7(), &request).unwrap();
        let state = ResearchState::initial("research", &request, vec![]);

        let err = ResearcherStage
            .run(StageInput {
                state: &state,
                context: &context,
                tools: &tools,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidOutput(_)));
        assert!(!err.is_transient());
    }
}
