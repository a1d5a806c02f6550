use anyhow::Context;
use usageql_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    usageql_observability::init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!(
        service = %config.server.app_name,
        version = %config.server.version,
        summarizer = ?config.summarizer,
        "starting"
    );

    let bind_addr = config.server.bind_addr.clone();
    let app = usageql_api::app::build_app(&config).context("failed to wire services")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
