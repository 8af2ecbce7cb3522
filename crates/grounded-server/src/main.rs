mod routes;
mod state;

use grounded::bootstrap::{build_agent, build_index};
use grounded::configuration::Settings;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::new()?;

    let index = build_index(&settings, false).await?;
    let agent = build_agent(&settings, index)?;
    let state = state::AppState::new(
        Arc::new(agent),
        settings.agent.turn_timeout_secs.map(Duration::from_secs),
    );

    let app = routes::configure(state);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
