use anyhow::Context;
use bind_broker::config::toml_config::TomlConfig;
use bind_broker::utils::logger::{self, LogFormat};
use bind_broker::utils::validation::Validate;
use bind_broker::{Broker, CliConfig, InMemoryStore};
use clap::Parser;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);

    tracing::info!("🚀 Starting bind-broker");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Invalid arguments: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    // 載入 fixture 並驗證
    let fixture = match TomlConfig::from_file(&cli.config) {
        Ok(fixture) => fixture,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };
    if let Err(e) = fixture.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");

    let request = cli
        .bind_request(&fixture.broker.impersonation_parameter)
        .context("building bind request")?;

    let store = InMemoryStore::new();
    fixture.seed_store(&store).await;

    let broker = Broker::new(
        Arc::new(store),
        Arc::new(fixture.reviewer()),
        fixture.broker.clone(),
    );

    let mut last_status = 0;
    for _ in 0..cli.repeat {
        let response = broker
            .respond(&cli.instance_id, &cli.binding_id, &request)
            .await;
        last_status = response.status;
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    // 4xx/5xx 以非零結束
    if last_status >= 400 {
        std::process::exit(2);
    }

    Ok(())
}
