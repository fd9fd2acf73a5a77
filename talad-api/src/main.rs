use std::net::SocketAddr;
use std::sync::Arc;

use talad_api::{
    app,
    state::{AppState, AuthConfig},
};
use talad_store::app_config::StoreBackend;
use talad_store::{DbClient, MemoryStore, PgBookingRepository, PgLotRepository, PgPaymentRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talad_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = talad_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Talad API on port {}", config.server.port);

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
        admin_username: config.auth.admin_username.clone(),
        admin_password: config.auth.admin_password.clone(),
    };

    let app_state = match config.database.backend {
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .expect("database.url is required for the postgres backend");

            let db = DbClient::new(url, config.database.max_connections)
                .await
                .expect("Failed to connect to Postgres");
            db.migrate().await.expect("Failed to run migrations");

            AppState::new(
                Arc::new(PgLotRepository::new(db.pool.clone())),
                Arc::new(PgBookingRepository::new(db.pool.clone())),
                Arc::new(PgPaymentRepository::new(db.pool)),
                auth,
                config.market.currency.clone(),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Running on the in-memory store; all data is lost on shutdown");
            let store = Arc::new(MemoryStore::new());
            AppState::new(
                store.clone(),
                store.clone(),
                store,
                auth,
                config.market.currency.clone(),
            )
        }
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
