use std::net::SocketAddr;

use anyhow::Context;

use taskboard_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    taskboard_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(?config, "starting");

    let app = taskboard_api::app::build_app(&config)
        .await
        .context("failed to initialise application")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
