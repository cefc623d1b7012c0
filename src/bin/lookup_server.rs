use anyhow::Context;
use rues_lookup::adapters::server::{create_router, ServerState};
use rues_lookup::utils::{logger, validation::Validate};
use rues_lookup::{http_pipeline, TomlConfig};

fn load_config() -> anyhow::Result<TomlConfig> {
    let mut config = match std::env::var("RUES_CONFIG") {
        Ok(path) => TomlConfig::from_file(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        Err(_) => TomlConfig::default(),
    };
    if let Ok(bind) = std::env::var("RUES_BIND") {
        config.server.bind_address = bind;
    }
    config.validate().context("Invalid server configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let verbose = std::env::var("RUES_VERBOSE").is_ok();
    logger::init_server_logger(verbose);

    let config = load_config()?;
    let router = create_router(ServerState::new(http_pipeline(&config)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    tracing::info!("🚀 Lookup server listening on {}", config.server.bind_address);

    axum::serve(listener, router).await?;
    Ok(())
}
