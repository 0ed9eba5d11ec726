//! `doppel serve`: start the HTTP gateway.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        tracing::warn!(provider = %config.provider, "No API key configured, completions will fail");
    }

    println!("Doppel gateway");
    println!("   Listening:    {}:{}", config.gateway.host, config.gateway.port);
    println!("   Owner:        {}", config.persona.owner_name);
    println!("   Chat enabled: {}", config.gateway.chat_enabled);

    doppel_gateway::start(config).await?;

    Ok(())
}
