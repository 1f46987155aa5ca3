use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loan_risk_api::classifier::TreeEnsembleClassifier;
use loan_risk_api::config::Config;
use loan_risk_api::csv_import::CsvImporter;
use loan_risk_api::db::Database;
use loan_risk_api::db_storage::PredictionStorage;
use loan_risk_api::handlers::{self, AppState};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Classifier loading (once, shared read-only).
/// - Database connection, schema and optional CSV bulk load.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_risk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load the classifier before accepting any traffic
    let classifier =
        TreeEnsembleClassifier::load(&config.model_path, config.model_sha256.as_deref())
            .and_then(|model| model.with_base_score(config.model_base_score))
            .map_err(|e| anyhow::anyhow!("Failed to load classifier: {}", e))?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    PredictionStorage::new(db.pool.clone())
        .init_schema(config.reset_predictions_on_start)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize schema: {}", e))?;

    if config.load_csv_on_start {
        let summary = CsvImporter::new(db.pool.clone())
            .load_all(&config.data_dir)
            .await?;
        tracing::info!("📦 CSV data loaded: {:?}", summary);
    }

    // Build application state
    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        classifier: Arc::new(classifier),
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Build protected routes with security layers
    let protected_routes = handlers::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            // Rate limiting: 10 req/sec per IP, burst of 20
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
