use tracing::info;
use tracing_subscriber::EnvFilter;

use claimledger::api::ledger_router;
use claimledger::config;
use claimledger::db::sqlite::open_database;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let data_dir = config::app_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let db_path = config::database_path();
    let conn = open_database(&db_path)?;
    info!(path = %db_path.display(), "ledger database open");

    let addr = config::bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, version = config::APP_VERSION, "listening");
    axum::serve(listener, ledger_router(conn)).await?;
    Ok(())
}
