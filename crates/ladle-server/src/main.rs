//! Ladle HTTP server
//!
//! Conversational recipe assistant: chat routing, history, and search.

use anyhow::Result;
use clap::Parser;
use ladle_core::{ChatRouter, Config, Database, OpenAiClient};
use std::path::PathBuf;
use std::sync::Arc;

mod auth;
mod routes;
mod state;

use state::AppState;

#[derive(Parser)]
#[command(name = "ladle-server", about = "Conversational recipe assistant API")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "LADLE_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Database path (defaults to the platform data directory)
    #[arg(long, env = "LADLE_DB")]
    db: Option<PathBuf>,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, env = "LADLE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    // Missing credentials fail here, at startup, never per-request.
    config.validate()?;

    let db_path = cli.db.unwrap_or_else(Database::default_path);
    let db = Database::open(&db_path)?;
    db.initialize()?;
    tracing::info!("database ready at {}", db_path.display());

    let client = Arc::new(OpenAiClient::new(config.ai.clone())?);
    let router = ChatRouter::new(client.clone(), client.clone(), &config)?;

    let state = Arc::new(AppState {
        db,
        router,
        embedder: client,
    });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    tracing::info!("listening on {}", cli.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
