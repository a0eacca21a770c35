use std::path::Path;

use super::app_state;
use crate::output::{print_json, print_plan, print_results};

pub fn run(config_path: &Path, transcript: &str, json: bool) -> anyhow::Result<()> {
    let (_, state) = app_state(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(state.pipeline.quick_execute(transcript))?;

    if json {
        return print_json(&outcome);
    }

    if let Some(question) = &outcome.clarification {
        println!("Clarification needed: {question}");
        return Ok(());
    }
    println!("Command {} ({} ms)", outcome.command_id, outcome.duration_ms);
    print_plan(&outcome.pipeline_trace.step3_plan);
    println!();
    print_results(outcome.execution_results.as_deref().unwrap_or_default());
    Ok(())
}
