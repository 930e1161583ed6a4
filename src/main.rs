use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use companion_engine::{
    api::routes,
    config::Config,
    orchestrator::SessionOrchestrator,
    services::{HttpModelClient, HttpScrubber},
    storage::{self, repository::SeaOrmChatRepository},
};

#[derive(Parser)]
#[command(name = "companion-engine")]
#[command(about = "Companion chat session engine")]
struct Args {
    /// Configuration file to use instead of ~/.companion/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Override database URL
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Load config
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("companion_engine={}", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database
    let db_conn = storage::init_db(&config.database_url).await?;
    let repository = Arc::new(
        SeaOrmChatRepository::new(db_conn).with_default_daily_limit(config.default_daily_limit),
    );

    let model = Arc::new(HttpModelClient::new(
        config.model_url.clone(),
        config.model_name.clone(),
        config.model_timeout(),
    )?);

    // Verify model bridge health on startup
    match model.health_check().await {
        Ok(true) => tracing::info!("Model bridge connected at {}", config.model_url),
        Ok(false) => tracing::warn!("Model bridge health check returned false"),
        Err(e) => tracing::warn!(
            "Model bridge not available: {}. Replies will fall back to the apology message.",
            e
        ),
    }

    let scrubber = Arc::new(HttpScrubber::new(
        config.scrubber_url.clone(),
        config.scrubber_timeout(),
    )?);

    let orchestrator = Arc::new(SessionOrchestrator::new(
        repository.clone(),
        repository,
        model,
        scrubber,
        config.prompt_settings(),
    ));

    let port = config.server_port;
    let state = routes::AppState { orchestrator };
    let app = routes::create_router(state);

    // Start server
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
