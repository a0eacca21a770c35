pub mod config;
pub mod plan;
pub mod run;
pub mod serve;
pub mod transcribe;

use anyhow::Context;
use std::path::Path;
use voiceops_core::config::Config;
use voiceops_server::AppState;

/// Config file plus environment overrides.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load_with_env(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Wire every collaborator named by `config`.
pub fn app_state(path: &Path) -> anyhow::Result<(Config, AppState)> {
    let config = load_config(path)?;
    let state = AppState::from_config(&config).context("failed to initialise services")?;
    Ok((config, state))
}
