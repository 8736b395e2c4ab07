//! `parley serve` — Start the HTTP API server.

use parley_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Parley Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} via {}", config.inference.model, config.inference.backend);
    println!("   Sessions:  {} (ttl {}s, last {} turns)",
        config.store.backend, config.session.ttl_secs, config.session.max_history_messages);

    parley_gateway::start(config).await?;

    Ok(())
}
