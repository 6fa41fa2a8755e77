mod core;
mod http;

use std::sync::Arc;

use podcast_proto::config::Config;
use podcast_proto::{AppState, HttpSource};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup file logging
    let data_dir = podcast_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,podcast_daemon=debug,podcast_proto=debug,hyper=warn,reqwest=warn",
                )
            }),
        )
        .init();

    eprintln!("podcast-daemon: logging to {}", log_path.display());
    info!("Log file: {:?}", log_path);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Config unreadable, using defaults: {:#}", e);
            Config::default()
        }
    };
    info!("Config loaded from: {:?}", Config::config_path());
    info!("Favorites file: {:?}", config.storage.favorites_file);

    let source = Arc::new(HttpSource::new(&config.source)?);
    let state = Arc::new(AppState::new(config.storage.favorites_file.clone()));

    // All external inputs funnel into DaemonCore
    let (event_tx, event_rx) = tokio::sync::mpsc::channel::<core::DaemonEvent>(256);
    let handle = core::CoreHandle::new(event_tx.clone());

    let daemon_core = core::DaemonCore::new(config.clone(), Arc::clone(&state), source, event_tx);

    if config.http.enabled {
        let _http_handle = http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            Arc::clone(&state),
            handle.clone(),
            config.view.default_sort,
        );
    } else {
        info!("HTTP API disabled");
    }

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received");
            shutdown.shutdown().await;
        }
    });

    info!("Daemon initialised, running event loop");
    daemon_core.run(event_rx).await?;

    Ok(())
}
