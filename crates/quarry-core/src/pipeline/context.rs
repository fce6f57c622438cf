//! Immutable per-run configuration.
//!
//! Built once from a validated request and shared as `Arc<ResearchContext>`.
//! Fields are private and there is no `&mut` API, so nothing can change the
//! context after construction.

use uuid::Uuid;

use quarry_types::error::ValidationError;
use quarry_types::research::{LlmSettings, RepositoryRef, ResearchRequest};
use quarry_types::search::SearchMode;

#[derive(Debug, Clone, PartialEq)]
pub struct ResearchContext {
    workflow: String,
    run_id: Uuid,
    search_limit: u32,
    search_mode: SearchMode,
    fetch_code_context: bool,
    seed_urls: Vec<String>,
    experiment_snippets: Vec<String>,
    llm: LlmSettings,
    repositories: Vec<RepositoryRef>,
}

impl ResearchContext {
    /// Validate `request` and build the context for run `run_id`.
    pub fn from_request(
        workflow: &str,
        run_id: Uuid,
        request: &ResearchRequest,
    ) -> Result<Self, ValidationError> {
        request.validate()?;
        Ok(Self {
            workflow: workflow.to_lowercase(),
            run_id,
            search_limit: request.search_limit,
            search_mode: request.search_mode,
            fetch_code_context: request.fetch_code_context,
            seed_urls: request.seed_urls.clone(),
            experiment_snippets: request.experiment_snippets.clone(),
            llm: request.llm.clone().unwrap_or_default(),
            repositories: request.repository_refs()?,
        })
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn search_limit(&self) -> u32 {
        self.search_limit
    }

    pub fn search_mode(&self) -> SearchMode {
        self.search_mode
    }

    pub fn fetch_code_context(&self) -> bool {
        self.fetch_code_context
    }

    pub fn seed_urls(&self) -> &[String] {
        &self.seed_urls
    }

    pub fn experiment_snippets(&self) -> &[String] {
        &self.experiment_snippets
    }

    /// Per-run model overrides (every field optional).
    pub fn llm(&self) -> &LlmSettings {
        &self.llm
    }

    pub fn repositories(&self) -> &[RepositoryRef] {
        &self.repositories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_request_copies_fields() {
        let mut request = ResearchRequest::new("graph databases");
        request.search_limit = 5;
        request.search_mode = SearchMode::Deep;
        request.seed_urls = vec!["https://neo4j.com".to_string()];
        request.repositories = vec!["neo4j/neo4j".to_string()];

        let run_id = Uuid::now_v7();
        let ctx = ResearchContext::from_request("Research", run_id, &request).unwrap();
        assert_eq!(ctx.workflow(), "research");
        assert_eq!(ctx.run_id(), run_id);
        assert_eq!(ctx.search_limit(), 5);
        assert_eq!(ctx.search_mode(), SearchMode::Deep);
        assert_eq!(ctx.seed_urls(), ["https://neo4j.com".to_string()]);
        assert_eq!(ctx.repositories()[0].to_string(), "neo4j/neo4j");
        assert!(ctx.llm().model.is_none());
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        let request = ResearchRequest::new("ab");
        assert!(ResearchContext::from_request("research", Uuid::now_v7(), &request).is_err());

        let mut request = ResearchRequest::new("valid topic");
        request.repositories = vec!["not a repo".to_string()];
        assert!(matches!(
            ResearchContext::from_request("research", Uuid::now_v7(), &request),
            Err(ValidationError::MalformedRepository(_))
        ));
    }
}
