//! Core Dispatch 2.0 - conversational agent backend
//!
//! Serves the status API, manages the persona database schema, and offers a
//! one-shot prompt command against the configured model endpoint.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use core_dispatch::{
    api::{build_app, AppState},
    config::CoreDispatchConfig,
    db::Database,
    llm::ResponseClient,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "core-dispatch")]
#[command(version)]
#[command(about = "Core Dispatch 2.0 - conversational agent backend")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CORE_DISPATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Send one prompt to the model and print the reply
    Ask {
        /// Prompt text
        #[arg(default_value = "What is the mission of Core Dispatch 2.0?")]
        prompt: String,
    },

    /// Create or upgrade the database schema
    Migrate,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("core_dispatch={},tower_http=debug", log_level).into());
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }

    if let Commands::Config { default: true } = cli.command {
        return show_config(&CoreDispatchConfig::default());
    }

    // Fail fast: a missing DATABASE_URL stops every command here
    let config = CoreDispatchConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Ask { prompt } => {
            ask(&config, &prompt).await;
        }
        Commands::Migrate => {
            migrate(&config)?;
        }
        Commands::Config { .. } => {
            show_config(&config)?;
        }
    }

    Ok(())
}

async fn run_server(
    config: CoreDispatchConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let database = Database::open(&config.storage.location()?)?;
    let app = build_app(AppState { database }, &config.gateway.cors_origins);

    let host = host.unwrap_or(config.gateway.host);
    let port = port.unwrap_or(config.gateway.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;

    tracing::info!(
        "Core Dispatch API listening on {}. Press Ctrl+C to stop.",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
    }
    tracing::info!("Shutting down...");
}

async fn ask(config: &CoreDispatchConfig, prompt: &str) {
    let client = ResponseClient::from_config(&config.models);
    tracing::info!(model = %client.model(), url = %client.completions_url(), "Sending prompt");

    match client.generate_text_response(prompt).await {
        Some(reply) => {
            println!("{}", reply);
        }
        None => {
            eprintln!("Failed to get a response from the model endpoint.");
        }
    }
}

fn migrate(config: &CoreDispatchConfig) -> Result<()> {
    let database = Database::open(&config.storage.location()?)?;
    let tables = database.table_names()?;
    println!("Schema ready: {}", tables.join(", "));
    Ok(())
}

fn show_config(config: &CoreDispatchConfig) -> Result<()> {
    let toml = toml::to_string_pretty(&config.redacted())?;
    println!("{}", toml);
    Ok(())
}
