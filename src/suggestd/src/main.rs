//! suggestd — personalized product recommendation service.
//!
//! Main entry point that wires the data adapters into the aggregation
//! engine and starts the HTTP server.

use clap::Parser;
use std::sync::Arc;
use suggest_api::ApiServer;
use suggest_core::config::AppConfig;
use suggest_engine::RecommendationAggregator;
use suggest_store::{ClickHouseHistory, RedisCatalog, VectorIndexClient};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "suggestd")]
#[command(about = "Personalized product recommendation service")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "SUGGEST__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "SUGGEST__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Final recommendation list size (overrides config)
    #[arg(long, env = "SUGGEST__RECOMMEND__RESULT_LIMIT")]
    result_limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "suggestd=info,suggest_engine=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("suggestd starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(limit) = cli.result_limit {
        config.recommend.result_limit = limit;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        history_limit = config.recommend.history_limit,
        per_item_top_k = config.recommend.per_item_top_k,
        result_limit = config.recommend.result_limit,
        "Configuration loaded"
    );

    // Wire up the three collaborators. The service degrades per-request
    // when a backend drops later, but refuses to start without the
    // catalog connection, and only warns when ClickHouse is unreachable
    // at boot (history reads fail softly anyway).
    let history = Arc::new(ClickHouseHistory::new(&config.clickhouse));
    if let Err(e) = history.healthcheck().await {
        warn!(error = %e, "ClickHouse unreachable at startup, history reads will degrade");
    }

    let similarity = Arc::new(VectorIndexClient::new(&config.vector_index)?);

    let catalog = Arc::new(RedisCatalog::new(&config.redis).await.map_err(|e| {
        error!(error = %e, "Failed to connect to Redis");
        anyhow::anyhow!("Redis connection required: {e}")
    })?);

    let recommender = Arc::new(RecommendationAggregator::new(
        history,
        similarity,
        catalog,
        config.recommend.clone(),
    ));

    // Start API server
    let api_server = ApiServer::new(config.clone(), recommender);

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("suggestd is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http().await?;

    Ok(())
}
