use attachment_api::{app, config, db::Database, AppState};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attachment_api=debug,tower_http=info".into()),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting attachment API in {:?} mode", config.environment);

    let db = Database::connect(&config.database)
        .unwrap_or_else(|e| panic!("failed to initialize database pool: {}", e));

    // The pool connects lazily; if the database is not up yet the server still
    // starts and /health reports degraded until it becomes reachable.
    if let Err(e) = db.migrate().await {
        tracing::warn!("Migrations not applied at startup: {}", e);
    }

    let state = AppState { db: db.clone() };
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Attachment API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server");

    db.close().await;
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
