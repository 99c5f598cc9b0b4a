mod app;
mod auth;
mod config;
mod error;
mod extract;
mod files;
mod notify;
mod posts;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "agora=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    tracing::debug!(
        issuer = %config.jwt.issuer,
        session_ttl_minutes = config.jwt.ttl_minutes,
        "configuration loaded"
    );

    let addr = config.bind_addr()?;
    let state = AppState::init(config).await?;
    app::serve(app::build_app(state), addr).await
}
