use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use trend_worker::{
    app::{ComponentRegistry, build_router},
    config::Config,
    scheduler::{IntervalCadence, spawn_scan_daemon},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("unnamed");
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                thread = thread_name,
                file = location.file(),
                line = location.line(),
                column = location.column(),
                message,
                "panic occurred"
            );
        } else {
            error!(
                thread = thread_name,
                message, "panic occurred without location information"
            );
        }
    }));

    // Tracing initialization is handled by Telemetry::new()
    let config = Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.http_bind();
    let scan_interval = config.scan_interval();
    let registry = ComponentRegistry::build(config).context("failed to build component registry")?;

    if let Err(error) = registry.store().ensure_schema().await {
        warn!(error = %error, "failed to ensure trend schema, continuing");
    }

    let scheduler = registry.scheduler().clone();
    if scheduler.default_terms().is_empty() {
        warn!("skipping automatic scan daemon because no search terms are configured");
    } else {
        let _scan_daemon = spawn_scan_daemon(scheduler, IntervalCadence::new(scan_interval));
    }
    let router = build_router(registry);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {bind_addr}"))?;

    info!(%bind_addr, "listening");

    if let Err(error) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        warn!(error = %error, "server exited with error");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
