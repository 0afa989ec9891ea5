use std::error::Error;

use tracing_subscriber::EnvFilter;
use user_auth::{build_api_route_filter, config::ServiceConfig, connect, handle_auth_errors, Auth};
use warp::Filter;

const SERVICE_NAME: &str = "user-auth";

fn init_tracing() -> Result<(), Box<dyn Error + Send + Sync>> {
    let fallback = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    init_tracing()?;

    let config = ServiceConfig::from_env()?;
    tracing::info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        config = ?config,
        "starting service"
    );

    let database_connection = connect(&config.database_url).await?;
    let auth = Auth::new(config.auth_config(database_connection));

    let routes = build_api_route_filter(&auth)
        .recover(handle_auth_errors)
        .with(warp::trace::request());

    tracing::info!(listen_addr = %config.bind_addr, "listening");
    warp::serve(routes).run(config.bind_addr).await;

    Ok(())
}
