use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use gatepass_server::config::Config;
use gatepass_server::routes::{create_routes, AppState};
use gatepass_server::scan::SessionRegistry;
use gatepass_server::service::TicketService;
use gatepass_server::store::postgres::PgTicketStore;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let service = Arc::new(TicketService::new(Arc::new(PgTicketStore::new(pool))));

    // Warm the ticket cache; a cold cache is not fatal, refresh will retry.
    match service.refresh().await {
        Ok(count) => tracing::info!("Loaded {} tickets into cache", count),
        Err(e) => tracing::warn!(error = ?e, "Initial ticket load failed"),
    }

    let state = AppState {
        service,
        scanners: Arc::new(SessionRegistry::new()),
    };

    let app: Router = create_routes(state);

    let addr = config.bind_addr;
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
