//! Built-in stages and the workflows assembled from them.
//!
//! `research` chains researcher -> summarizer -> note-extractor -> persist.
//! Each stage is also registered on its own under its stage name.

pub mod note_extractor;
pub mod persist;
pub mod prompts;
pub mod researcher;
pub mod summarizer;

pub use note_extractor::NoteExtractorStage;
pub use persist::PersistStage;
pub use prompts::{AgentPrompt, AgentPrompts};
pub use researcher::ResearcherStage;
pub use summarizer::SummarizerStage;

use crate::pipeline::engine::EngineError;
use crate::pipeline::graph::WorkflowGraph;
use crate::pipeline::registry::WorkflowRegistry;
use crate::pipeline::stage::BoxStage;

pub const RESEARCH_WORKFLOW: &str = "research";

pub const RESEARCHER: &str = "researcher";
pub const SUMMARIZER: &str = "summarizer";
pub const NOTE_EXTRACTOR: &str = "note-extractor";
pub const PERSIST: &str = "persist";

/// Registry with every built-in workflow. Fails only if a graph is invalid
/// or two workflows share a name.
pub fn default_registry() -> Result<WorkflowRegistry, EngineError> {
    let mut registry = WorkflowRegistry::new();

    let research = WorkflowGraph::builder(RESEARCH_WORKFLOW)
        .stage(BoxStage::new(ResearcherStage))
        .stage(BoxStage::new(SummarizerStage))
        .stage(BoxStage::new(NoteExtractorStage))
        .stage(BoxStage::new(PersistStage))
        .linear()
        .build()?;
    registry.register(RESEARCH_WORKFLOW, research)?;

    let standalone: [(&str, fn() -> BoxStage); 4] = [
        (RESEARCHER, || BoxStage::new(ResearcherStage)),
        (SUMMARIZER, || BoxStage::new(SummarizerStage)),
        (NOTE_EXTRACTOR, || BoxStage::new(NoteExtractorStage)),
        (PERSIST, || BoxStage::new(PersistStage)),
    ];
    for (name, stage) in standalone {
        let graph = WorkflowGraph::builder(name).stage(stage()).linear().build()?;
        registry.register(name, graph)?;
    }

    Ok(registry)
}

/// `Title:` followed by one bullet per item, or `(none)`.
pub(crate) fn bullet_block(title: &str, items: &[String]) -> String {
    if items.is_empty() {
        return format!("{title}: (none)");
    }
    let mut block = format!("{title}:");
    for item in items {
        block.push_str("\n- ");
        block.push_str(item);
    }
    block
}
