use anyhow::{Context, Result};
use policycodes::{
    config::Config,
    server::{self, AppContext},
};
use reqwest::Client;
use std::env;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(LevelFilter::INFO.into())),
        )
        .init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));

    // ─── 2) config + shared client ───────────────────────────────────
    let config = Config::from_env();
    info!(?config, "startup");

    let client = Client::builder()
        .cookie_store(true)
        .gzip(true)
        .user_agent(concat!("policycodes/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    // ─── 3) serve ────────────────────────────────────────────────────
    let port = config.port;
    let routes = server::routes(AppContext::new(client, config));

    info!("Server starting on port {}", port);
    info!("Health check: http://localhost:{}/health", port);
    info!("UI: http://localhost:{}/", port);

    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
