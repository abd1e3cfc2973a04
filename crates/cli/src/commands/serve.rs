//! `ragbridge serve`: Start the HTTP gateway.

use std::path::Path;
use tracing::info;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    info!(
        host = %config.gateway.host,
        port = config.gateway.port,
        backend = %config.rag.api_url,
        model = %config.rag.model,
        history = %config.history.backend,
        local_tests = config.auth.local_tests_enabled(),
        "Starting RagBridge gateway"
    );

    ragbridge_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))?;

    Ok(())
}
