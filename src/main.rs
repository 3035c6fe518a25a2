// src/main.rs
// emotion-chat - classify a message's emotion and answer it with empathy

use anyhow::Result;
use clap::{Parser, Subcommand};
use emotion_chat::config::{ConfigOverrides, ServiceConfig};
use emotion_chat::emotion::{DistilBertClassifier, EmotionClassifier, distilbert};
use emotion_chat::generator::{ResponseGenerator, ollama::OllamaGenerator};
use emotion_chat::{http, web};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "emotion-chat")]
#[command(about = "Emotion classification and empathetic replies over HTTP")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve,

    /// Classify one message and print the label
    Classify {
        /// Message text
        text: String,
    },

    /// Print the resolved label map
    Labels,
}

async fn run_server(config: ServiceConfig) -> Result<()> {
    let model_config = config.model.clone();
    let classifier = tokio::task::spawn_blocking(move || DistilBertClassifier::load(&model_config)).await??;

    let generator = OllamaGenerator::new(
        &config.generator.ollama_host,
        config.generator.model.clone(),
        http::create_shared_client(),
    );
    info!(
        host = generator.base_url(),
        model = generator.model_name(),
        timeout = ?config.generator.timeout,
        "Using Ollama for replies"
    );

    let state = web::AppState::new(Arc::new(classifier), Arc::new(generator))
        .with_generation_timeout(config.generator.timeout);
    let app = web::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    info!("emotion-chat listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn run_classify(config: ServiceConfig, text: String) -> Result<()> {
    let model_config = config.model.clone();
    let emotion = tokio::task::spawn_blocking(move || {
        let classifier = DistilBertClassifier::load(&model_config)?;
        classifier.classify(&text)
    })
    .await??;

    println!("{}", emotion);
    Ok(())
}

fn run_labels(config: &ServiceConfig) -> Result<()> {
    let labels = distilbert::resolve_labels(&config.model)?;
    println!("source: {}", labels.source());
    for (index, label) in labels.labels().iter().enumerate() {
        println!("{}\t{}", index, label);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env-backed arguments
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::load(&cli.overrides)?;

    match cli.command {
        None | Some(Commands::Serve) => run_server(config).await?,
        Some(Commands::Classify { text }) => run_classify(config, text).await?,
        Some(Commands::Labels) => run_labels(&config)?,
    }

    Ok(())
}
