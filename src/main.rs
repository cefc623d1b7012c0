use clap::Parser;
use rues_lookup::adapters::identifiers::load_identifiers;
use rues_lookup::core::ConfigProvider;
use rues_lookup::utils::{logger, validation::Validate};
use rues_lookup::{
    http_pipeline, CliConfig, LocalStorage, LookupEngine, RuesError, TomlConfig, WorkerPool,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting rues-lookup CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        fail(&e);
    }

    let outcome = match cli.config.as_deref() {
        Some(path) => {
            tracing::info!("📄 Loading configuration from {}", path);
            let toml = match TomlConfig::from_file(path).and_then(|c| c.validate().map(|_| c)) {
                Ok(toml) => toml,
                Err(e) => fail(&e),
            };
            run(&cli.input, &toml).await
        }
        None => run(&cli.input, &cli).await,
    };

    match outcome {
        Ok(outcome) => {
            tracing::info!("✅ Lookup completed successfully!");
            println!(
                "✅ {} NIT(s) processed: {} found, {} with errors",
                outcome.total, outcome.succeeded, outcome.failed
            );
            println!("📁 Output saved to: {}", outcome.output_path);
        }
        Err(e) => fail(&e),
    }

    Ok(())
}

async fn run<C: ConfigProvider>(
    input: &str,
    config: &C,
) -> rues_lookup::Result<rues_lookup::BatchOutcome> {
    let input_path = Path::new(input);
    let input_dir = input_path.parent().unwrap_or_else(|| Path::new("."));
    let input_file = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| RuesError::MissingConfigError {
            field: "input".to_string(),
        })?;

    let identifiers = load_identifiers(&LocalStorage::new(input_dir), &input_file).await?;
    if identifiers.is_empty() {
        tracing::warn!("⚠️ No NITs found in {}", input);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Interrupted, cancelling pending lookups");
            on_interrupt.cancel();
        }
    });

    let pool = WorkerPool::new(Arc::new(http_pipeline(config)), config.concurrency())
        .with_cancellation(cancel);
    let engine = LookupEngine::new(
        pool,
        LocalStorage::new(config.output_path()),
        config.output_path(),
        config.output_file(),
    );

    engine.run(identifiers).await
}

fn fail(e: &RuesError) -> ! {
    tracing::error!("❌ {}", e);
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(if e.is_config_error() { 2 } else { 1 });
}
