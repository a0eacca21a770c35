use std::path::Path;

use super::app_state;

pub fn run(config_path: &Path, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let (config, state) = app_state(config_path)?;
    for w in config.validate() {
        tracing::warn!("{}", w.message);
    }

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(voiceops_server::serve(state, &host, port))
}
