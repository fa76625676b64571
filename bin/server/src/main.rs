use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storefront_ai::{ModelGateway, OpenAiBackend};
use storefront_assistant::{Assistant, AssistantOptions, Dispatcher};
use storefront_server::auth::{Argon2CredentialHasher, TokenSigner};
use storefront_server::config::ServerConfig;
use storefront_server::db::{PgBillStore, PgProductStore, PgUserStore};
use storefront_server::routes;
use storefront_server::state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
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

    // Stores and auth
    let products: Arc<PgProductStore> = Arc::new(PgProductStore::new(db_pool.clone()));
    let bills = Arc::new(PgBillStore::new(db_pool.clone()));
    let users = Arc::new(PgUserStore::new(db_pool.clone()));
    let hasher = Arc::new(Argon2CredentialHasher);
    let signer = Arc::new(TokenSigner::new(
        &config.auth.jwt_secret,
        config.auth.token_ttl_minutes,
    ));

    // Model gateway and assistant engine
    let backend =
        OpenAiBackend::new(config.llm.backend_config()).expect("failed to build LLM backend");
    let gateway = ModelGateway::new(Arc::new(backend));
    let dispatcher = Dispatcher::new(
        products.clone(),
        bills.clone(),
        users.clone(),
        hasher.clone(),
    );
    let assistant = Arc::new(
        Assistant::new(gateway, dispatcher, products.clone()).with_options(AssistantOptions {
            narrate_with_model: config.llm.narrate_with_model,
        }),
    );

    // Spawn periodic idle-session eviction
    let cleanup_assistant = assistant.clone();
    let idle = chrono::Duration::minutes(config.session.idle_minutes);
    let cleanup_interval_secs = config.session.cleanup_interval_seconds;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(cleanup_interval_secs));
        loop {
            interval.tick().await;
            let cutoff = chrono::Utc::now() - idle;
            let removed = cleanup_assistant.evict_idle_sessions(cutoff);
            if removed > 0 {
                tracing::debug!(removed_sessions = removed, "Periodic session cleanup");
            }
        }
    });

    let state = AppState {
        products,
        bills,
        users,
        hasher,
        signer,
        assistant,
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .expect("invalid CORS origin"),
        )
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind listen address");
    tracing::info!(addr = %config.listen_addr, "Storefront server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("Shutdown signal received");
}
