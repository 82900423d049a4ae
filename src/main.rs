use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use seatd::config::Config;
use seatd::engine::Engine;
use seatd::{http, layout};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    seatd::observability::init(config.metrics_port)?;

    let engine = match config.wal_path() {
        Some(wal_path) => {
            if let Some(dir) = &config.data_dir {
                std::fs::create_dir_all(dir)?;
            }
            Engine::open(&wal_path)?
        }
        None => Engine::in_memory(),
    };

    let floor_plan = match &config.layout {
        Some(path) => layout::load_floor_plan(path)?,
        None => layout::default_floor_plan(),
    };
    engine.load_floor_plan(floor_plan).await?;

    let mut app = http::router(Arc::new(engine));
    if let Some(dir) = &config.static_dir {
        app = http::with_static_files(app, dir);
    }

    let addr = config.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("seatd listening on {addr}");
    info!(
        "  storage: {}",
        config
            .wal_path()
            .map_or("memory".to_string(), |p| p.display().to_string())
    );
    if let Some(dir) = &config.static_dir {
        info!("  static: {}", dir.display());
    }
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("seatd stopped");
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM; in-flight requests are drained by axum.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {e}");
                ctrl_c.await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
    info!("shutdown signal received, draining requests");
}
