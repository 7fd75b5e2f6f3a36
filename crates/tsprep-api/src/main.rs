use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tsprep_api::{router, AppState};
use tsprep_repository::PostgresRepository;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    let port: u16 = match std::env::var("PORT") {
        Ok(value) => value.parse().context("PORT is not a valid port number")?,
        Err(_) => 8000,
    };

    let repository = PostgresRepository::connect(&database_url, 5).await?;
    repository.run_migrations().await?;
    info!("database ready");

    let state = Arc::new(AppState::new(Arc::new(repository)));
    let app = router(state);

    let listener = TcpListener::bind((std::net::Ipv4Addr::UNSPECIFIED, port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
