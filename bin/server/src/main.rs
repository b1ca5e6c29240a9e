use hotelres_platform_access::TokenIssuer;
use hotelres_server::{
    app,
    auth::{AppState, OAuthGateway, db::PgAccountStore},
    config::ServerConfig,
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
    tracing::info!("Loaded configuration");

    // Fail fast on signing configuration before touching the database
    let tokens = Arc::new(TokenIssuer::new(&config.token).expect("invalid token configuration"));
    let cors = app::cors_layer(&config.cors.origins()).expect("invalid CORS configuration");
    let gateway = OAuthGateway::new(&config).expect("invalid provider configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let state = Arc::new(AppState::new(
        Arc::new(PgAccountStore::new(db_pool)),
        tokens,
        Arc::new(gateway),
        &config.federation,
    ));
    let router = app::router(state, cors);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, router).await.expect("server error");
}
