//! CLI command definitions for the `quarry` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod query;
pub mod run;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

use quarry_types::query::SearchQuerySpec;
use quarry_types::research::{LlmSettings, ResearchRequest};
use quarry_types::search::SearchMode;

/// Run autonomous research workflows.
#[derive(Parser)]
#[command(name = "quarry", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a workflow for a topic.
    Run {
        /// Workflow name (see `quarry workflows`).
        workflow: String,

        #[command(flatten)]
        request: RequestArgs,
    },

    /// List registered workflows and their stages.
    Workflows,

    /// List recent runs.
    Runs {
        /// Maximum number of runs to display.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Show a run and its checkpoints.
    Show {
        run_id: Uuid,
    },

    /// Continue a failed or interrupted run after its last checkpoint.
    Resume {
        run_id: Uuid,
    },

    /// Print the boolean and semantic strings compiled from query flags.
    Query {
        /// Fallback for the semantic query when no terms are given.
        #[arg(long, default_value = "")]
        topic: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print the key insights gathered from stored memories.
    Insights,

    /// Start the REST API server.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,
    },

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

/// Structured search query flags.
#[derive(Debug, Default, Args)]
pub struct QueryArgs {
    /// Use this query verbatim, ignoring every other query flag.
    #[arg(long)]
    pub raw: Option<String>,

    /// Term that must appear (repeatable).
    #[arg(long = "all", value_name = "TERM")]
    pub all_terms: Vec<String>,

    /// Term of which at least one must appear (repeatable).
    #[arg(long = "any", value_name = "TERM")]
    pub any_terms: Vec<String>,

    /// Exact phrase (repeatable).
    #[arg(long = "phrase")]
    pub phrases: Vec<String>,

    /// Term to exclude (repeatable).
    #[arg(long = "exclude", value_name = "TERM")]
    pub excluded: Vec<String>,

    /// Restrict to a site (repeatable).
    #[arg(long = "site")]
    pub sites: Vec<String>,

    /// Restrict to a file type (repeatable).
    #[arg(long = "filetype")]
    pub filetypes: Vec<String>,

    /// Term required in the title (repeatable).
    #[arg(long)]
    pub intitle: Vec<String>,

    /// Term required in the URL (repeatable).
    #[arg(long)]
    pub inurl: Vec<String>,
}

impl QueryArgs {
    /// `None` when no query flag was given.
    pub fn into_spec(self) -> Option<SearchQuerySpec> {
        let spec = SearchQuerySpec {
            raw: self.raw,
            all_terms: self.all_terms,
            any_terms: self.any_terms,
            phrases: self.phrases,
            excluded: self.excluded,
            sites: self.sites,
            filetypes: self.filetypes,
            intitle: self.intitle,
            inurl: self.inurl,
        };
        (spec != SearchQuerySpec::default()).then_some(spec)
    }
}

/// Flags that make up a `ResearchRequest`.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Research topic (at least 3 characters).
    #[arg(long)]
    pub topic: String,

    /// URL to seed the research with (repeatable).
    #[arg(long = "seed-url", value_name = "URL")]
    pub seed_urls: Vec<String>,

    /// Experiment snippet to include (repeatable).
    #[arg(long = "experiment", value_name = "TEXT")]
    pub experiment_snippets: Vec<String>,

    /// Maximum number of sources (1-15). Defaults to `search.default_limit`.
    #[arg(long)]
    pub limit: Option<u32>,

    /// Semantic search mode: auto, neural, keyword, fast, deep.
    #[arg(long, default_value = "auto")]
    pub mode: SearchMode,

    /// Also fetch code context for the semantic query.
    #[arg(long)]
    pub code_context: bool,

    /// Repository reference in `owner/repo` form (repeatable).
    #[arg(long = "repo", value_name = "OWNER/REPO")]
    pub repositories: Vec<String>,

    /// Model override for this run.
    #[arg(long)]
    pub model: Option<String>,

    /// Sampling temperature override for this run.
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Model endpoint override for this run.
    #[arg(long)]
    pub base_url: Option<String>,

    #[command(flatten)]
    pub query: QueryArgs,
}

impl RequestArgs {
    pub fn into_request(self, default_limit: u32) -> ResearchRequest {
        let llm = LlmSettings {
            model: self.model,
            temperature: self.temperature,
            base_url: self.base_url,
        };
        ResearchRequest {
            topic: self.topic,
            seed_urls: self.seed_urls,
            experiment_snippets: self.experiment_snippets,
            search: self.query.into_spec(),
            search_limit: self.limit.unwrap_or(default_limit),
            search_mode: self.mode,
            fetch_code_context: self.code_context,
            llm: (llm != LlmSettings::default()).then_some(llm),
            repositories: self.repositories,
        }
    }
}
