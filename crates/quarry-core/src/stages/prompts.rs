//! System prompts for the built-in stages.
//!
//! Defaults are compiled in. A `prompts.yaml` in the data directory may
//! override any of them:
//!
//! ```yaml
//! researcher:
//!   system_prompt: |
//!     You are a meticulous research analyst...
//! ```

use serde::{Deserialize, Serialize};

const RESEARCHER_PROMPT: &str = "\
You are a meticulous research analyst. You receive a topic, ranked web \
sources, optional code context, and insights from earlier research runs.
Write concise research notes grounded in the sources, list the key insights \
a reader must retain, cite every source you relied on with a relevance score \
from 0 to 10, and record the reasoning steps that led to your conclusions.
Do not invent sources. Prefer primary documentation over commentary.";

const SUMMARIZER_PROMPT: &str = "\
You are a technical writer. Turn the research notes, insights and sources \
into a well-structured markdown report with an executive summary, key \
findings and a sources section.
Return the complete report in report_content, a two or three sentence \
executive_summary, and the URLs of the sources you used.";

const NOTE_EXTRACTOR_PROMPT: &str = "\
You maintain a Zettelkasten. Decompose the report into atomic notes: one \
idea per note, written so it stands on its own.
Give each note a short kebab-case id, a descriptive title, the note body in \
markdown, and a few lowercase tags.";

/// Prompt for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPrompt {
    pub system_prompt: String,
}

impl AgentPrompt {
    fn new(text: &str) -> Self {
        Self {
            system_prompt: text.to_string(),
        }
    }
}

fn default_researcher() -> AgentPrompt {
    AgentPrompt::new(RESEARCHER_PROMPT)
}

fn default_summarizer() -> AgentPrompt {
    AgentPrompt::new(SUMMARIZER_PROMPT)
}

fn default_note_extractor() -> AgentPrompt {
    AgentPrompt::new(NOTE_EXTRACTOR_PROMPT)
}

/// Prompts for every built-in stage. Missing entries keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPrompts {
    #[serde(default = "default_researcher")]
    pub researcher: AgentPrompt,
    #[serde(default = "default_summarizer")]
    pub summarizer: AgentPrompt,
    #[serde(default = "default_note_extractor", alias = "zettelkasten")]
    pub note_extractor: AgentPrompt,
}

impl Default for AgentPrompts {
    fn default() -> Self {
        Self {
            researcher: default_researcher(),
            summarizer: default_summarizer(),
            note_extractor: default_note_extractor(),
        }
    }
}

impl AgentPrompts {
    /// Parse a `prompts.yaml` document.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml_ng::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml)
    }
}
