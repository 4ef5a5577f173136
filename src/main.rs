use anyhow::Context;
use capledger::{api, config::Config, db::init_db, Ingestor, LedgerStore, Orchestrator, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("failed to initialize database")?;
    let store: Arc<dyn LedgerStore> = Arc::new(Repository::new(pool));

    if store
        .seed_global_split_config(&config.default_split)
        .await
        .context("failed to seed split config")?
    {
        tracing::info!(
            tax_rate = %config.default_split.tax_rate(),
            trader_share = %config.default_split.trader_share(),
            "Seeded global split config"
        );
    }

    let orchestrator = Arc::new(Orchestrator::new(store.clone()));
    let ingestor = Arc::new(Ingestor::new(store, config.ingest_options()));
    let app = api::create_router(api::AppState::new(orchestrator, ingestor));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
