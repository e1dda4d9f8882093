//! Agora server binary.
//!
//! Usage:
//!   agora-server                    # serve, reading agora.toml when present
//!   agora-server --watch            # serve and hot-reload agora.toml
//!   agora-server config --validate  # check agora.toml and exit
//!   agora-server agents             # list the participant catalog
//!   agora-server init               # write a starter agora.toml

use agora::cli::init::{self, InitConfig, InitResult};
use agora::cli::output::Output;
use agora::cli::{Cli, Commands};
use agora::utils::toml_config::{AgoraConfig, AgoraConfigManager, LogFormat};
use agora::{api, AgentRegistry, AppState, ProviderRegistry};
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often ended meetings are checked against `gateway.ended_retention_secs`
const RELEASE_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        None | Some(Commands::Serve) => serve(&cli.config, cli.watch, cli.verbose, &output).await,
        Some(Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        }) => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        Some(Commands::Agents) => list_agents(&cli.config, &output).await,
        Some(Commands::Scenarios) => {
            list_scenarios(&output);
            Ok(())
        }
    }
}

/// Load the config file, or fall back to defaults when it does not exist.
fn load_config(path: &Path, output: &Output) -> anyhow::Result<AgoraConfigManager> {
    if path.exists() {
        AgoraConfigManager::new(path)
            .with_context(|| format!("Failed to load {}", path.display()))
    } else {
        output.info(&format!(
            "{} not found, using built-in defaults (run 'agora-server init' to create one)",
            path.display()
        ));
        Ok(AgoraConfigManager::from_config(AgoraConfig::default()))
    }
}

fn init_tracing(config: &AgoraConfig, verbose: bool) {
    let default_filter = if verbose {
        "debug,tower_http=debug".to_string()
    } else {
        format!("{},tower_http=info", config.server.log_level)
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json = config.server.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .init();
}

async fn serve(config_path: &Path, watch: bool, verbose: bool, output: &Output) -> anyhow::Result<()> {
    output.banner();
    let manager = Arc::new(load_config(config_path, output)?);
    let config = manager.config();
    init_tracing(&config, verbose);

    for warning in config.validate_with_warnings()? {
        tracing::warn!("{}", warning.message);
    }

    if watch {
        if config_path.exists() {
            manager
                .start_watching()
                .context("Failed to watch configuration file")?;
        } else {
            output.warning("--watch ignored: no configuration file to watch");
        }
    }

    let state = AppState::from_config(Arc::clone(&manager))
        .await
        .context("Failed to initialize participants")?;
    let registry = state.facilitator.registry();
    tracing::info!(participants = registry.len(), "Participants registered");

    let retention_source = Arc::clone(&manager);
    let releaser = state.facilitator.start_release_task(RELEASE_INTERVAL, move || {
        retention_source.config().gateway.ended_retention()
    });

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    output.success(&format!("Listening on http://{}", address));
    output.info(&format!("WebSocket endpoint: ws://{}/ws", address));
    tracing::info!(address = %address, "Server started");

    axum::serve(listener, api::routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    releaser.abort();
    manager.stop_watching();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn show_config(path: &Path, validate: bool, output: &Output) -> anyhow::Result<()> {
    output.header("Configuration");
    output.kv("File", &path.display().to_string());

    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<AgoraConfig>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else if validate {
        output.error(&format!("{} not found", path.display()));
        anyhow::bail!("configuration file not found");
    } else {
        output.info("File not found, showing built-in defaults");
        AgoraConfig::default()
    };

    output.kv("Address", &config.bind_address());
    output.kv("Log level", &config.server.log_level);
    output.kv(
        "Default participant",
        config
            .collaboration
            .default_participant
            .as_deref()
            .unwrap_or("(none)"),
    );
    output.kv(
        "Consensus window",
        &config.collaboration.consensus_window.to_string(),
    );
    output.kv(
        "Transcripts",
        &config
            .persistence
            .transcript_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "disabled".to_string()),
    );
    output.kv("Providers", &config.providers.len().to_string());
    output.kv("Models", &config.models.len().to_string());

    if validate {
        match config.validate_with_warnings() {
            Ok(warnings) => {
                for warning in &warnings {
                    output.warning(&warning.message);
                }
                output.success("Configuration is valid");
            }
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!("configuration is invalid");
            }
        }
    }
    Ok(())
}

async fn list_agents(path: &Path, output: &Output) -> anyhow::Result<()> {
    let manager = load_config(path, output)?;
    let config = manager.config();
    let providers = ProviderRegistry::from_config(&config);
    let registry = AgentRegistry::from_config(&config, &providers)
        .await
        .context("Failed to build the participant catalog")?;

    output.header("Participants");
    output.table_header(&["Id", "Role", "Model"]);
    for participant in registry.participants() {
        let model = config
            .get_agent(&participant.id)
            .and_then(|a| a.model.as_deref())
            .unwrap_or("offline");
        output.table_row(&[participant.id.as_str(), participant.role.name.as_str(), model]);
    }
    Ok(())
}

fn list_scenarios(output: &Output) {
    output.header("Scenarios");
    for (index, scenario) in agora::collaboration::scenarios::catalog().iter().enumerate() {
        output.subheader(&format!("[{}] {}", index, scenario.title));
        output.kv("Topic", &scenario.context.topic);
        output.kv("Participants", &scenario.expected_participants.join(", "));
        output.kv(
            "Duration",
            &format!("{} minutes", scenario.estimated_duration_minutes),
        );
    }
}
