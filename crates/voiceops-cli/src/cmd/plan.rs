use std::io::{BufRead, Write};
use std::path::Path;

use voiceops_core::types::CommandStatus;

use super::app_state;
use crate::output::{print_json, print_plan, print_results};

pub fn run(config_path: &Path, transcript: &str, yes: bool, json: bool) -> anyhow::Result<()> {
    let (_, state) = app_state(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;

    let proposed = rt.block_on(state.pipeline.submit(transcript))?;

    if proposed.status == CommandStatus::NeedsClarification {
        if json {
            print_json(&proposed)?;
        } else {
            println!(
                "Clarification needed: {}",
                proposed.clarification.as_deref().unwrap_or_default()
            );
        }
        return Ok(());
    }

    if !json {
        println!("Command {}", proposed.command_id);
        print_plan(&proposed.pipeline_trace.step3_plan);
        println!();
    }

    // Prompt outside the runtime; stdin blocks.
    let approved = yes || ask("Execute this plan?")?;
    let confirmed = rt.block_on(state.pipeline.confirm(&proposed.command_id, approved))?;

    if json {
        return print_json(&serde_json::json!({
            "proposal": proposed,
            "confirmation": confirmed,
        }));
    }
    match &confirmed.execution_results {
        Some(results) => {
            print_results(results);
            println!(
                "\n{}/{} actions succeeded.",
                confirmed.successful_actions.unwrap_or_default(),
                confirmed.total_actions.unwrap_or_default()
            );
        }
        None => println!("Rejected. No actions executed."),
    }
    Ok(())
}

/// y/N prompt on stderr.
fn ask(question: &str) -> anyhow::Result<bool> {
    eprint!("{question} [y/N] ");
    std::io::stderr().flush()?;
    read_answer(std::io::stdin().lock())
}

/// End of input counts as no.
fn read_answer(mut input: impl BufRead) -> anyhow::Result<bool> {
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_yes_approves() {
        assert!(read_answer("y\n".as_bytes()).unwrap());
        assert!(read_answer("  YES \n".as_bytes()).unwrap());
        assert!(!read_answer("n\n".as_bytes()).unwrap());
        assert!(!read_answer("\n".as_bytes()).unwrap());
        assert!(!read_answer("".as_bytes()).unwrap());
    }
}
