//! Offline commands: query compilation preview and memory insights.

use console::style;

use quarry_core::memory::document::extract_memory_insights;
use quarry_core::query::compile;
use quarry_infra::filesystem::load_memories;

use super::QueryArgs;
use super::run::Output;
use crate::state::AppState;

/// Print the boolean and semantic strings the query flags compile to.
pub fn show_query(topic: &str, args: QueryArgs, output: Output) -> anyhow::Result<()> {
    let spec = args.into_spec();
    let compiled = compile(spec.as_ref(), topic.trim());

    if output.json {
        println!("{}", serde_json::to_string_pretty(&compiled)?);
        return Ok(());
    }

    println!("  {:<10} {}", style("Boolean:").bold(), compiled.boolean);
    println!("  {:<10} {}", style("Semantic:").bold(), compiled.semantic);
    Ok(())
}

/// Print the key insights from every stored memory document.
pub async fn show_insights(state: &AppState, output: Output) -> anyhow::Result<()> {
    let memories = load_memories(&state.layout.memories_dir).await;
    let insights = extract_memory_insights(&memories);

    if output.json {
        println!("{}", serde_json::to_string_pretty(&insights)?);
        return Ok(());
    }

    if insights.is_empty() {
        println!(
            "  No insights yet ({} memories in {}).",
            memories.len(),
            state.layout.memories_dir.display()
        );
        return Ok(());
    }

    println!();
    println!(
        "  {} {} insights from {} memories",
        style("*").green().bold(),
        insights.len(),
        memories.len()
    );
    println!();
    for insight in &insights {
        println!("    - {insight}");
    }
    println!();
    Ok(())
}
