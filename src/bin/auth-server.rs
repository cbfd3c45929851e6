//! Authentication server
//!
//! Reads `DATABASE_URL` and `BIND_ADDRESS` (default `0.0.0.0:3000`) plus the
//! `AuthConfig` variables, runs migrations and serves the REST API.

use session_auth::{AuthConfig, AuthModule};
use sqlx::postgres::PgPoolOptions;
use std::error::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

fn init_tracing() -> Result<(), Box<dyn Error>> {
    let fmt_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_target(false);

    // RUST_LOG=
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    let subscriber = Registry::default().with(fmt_layer).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing()?;

    let config = AuthConfig::from_env()?;
    let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;

    let module = AuthModule::with_postgres(db, config).await?;

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(address = %bind_address, "Listening");

    axum::serve(listener, module.routes())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
