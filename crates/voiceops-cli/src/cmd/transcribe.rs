use anyhow::Context;
use std::path::Path;

use super::app_state;
use crate::output::print_json;

pub fn run(config_path: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let audio =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.webm")
        .to_string();

    let (_, state) = app_state(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    let transcript = rt.block_on(state.transcriber.transcribe(audio, &filename))?;

    if json {
        print_json(&serde_json::json!({ "transcript": transcript }))
    } else {
        println!("{transcript}");
        Ok(())
    }
}
