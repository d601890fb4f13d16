use league_gate_server::{
    auth::{
        AppState, StytchProvider,
        db::{PgMembershipStore, PgPlayerDirectory},
    },
    config::ServerConfig,
    router::router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(
        secret_mutations = config.features.secret_mutations,
        membership_cache = config.access.membership_cache.enabled,
        "Loaded configuration"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let provider = StytchProvider::new(&config.provider).expect("failed to create provider client");
    let app_state = AppState::new(
        &config,
        Arc::new(provider),
        Arc::new(PgPlayerDirectory::new(db_pool.clone())),
        Arc::new(PgMembershipStore::new(db_pool)),
    )
    .expect("failed to create application state");

    let app = router(Arc::new(app_state));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
