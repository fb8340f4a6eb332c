use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_core::{config::Config, migration, server};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitrine_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    info!("Starting Vitrine Core Service");

    if std::env::args().any(|arg| arg == "migrate") {
        return migration::run_migrations(&config).await;
    }

    if std::env::var("RUN_MIGRATIONS").map(|v| v == "true" || v == "1") == Ok(true) {
        migration::run_migrations(&config).await?;
    }

    // Run the server
    server::run(config).await
}
