use blog_cms::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
    storage::{LocalDiskStorage, StorageService, StorageState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database, uploads directory, then the HTTP
/// server. Any startup failure is fatal.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose for this crate, quieter for the HTTP stack.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_cms=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("FATAL: Failed to apply database migrations.");
        tracing::info!("Database migrations applied.");
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Storage Initialization (uploads directory)
    let disk = LocalDiskStorage::new(&config.uploads_dir);
    disk.ensure_ready()
        .await
        .expect("FATAL: Failed to create the uploads directory. Check UPLOADS_DIR.");
    tracing::info!(dir = %disk.root().display(), "Uploads directory ready.");

    let storage = Arc::new(disk) as StorageState;

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState {
        repo,
        storage,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {addr}: {e}"));

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
