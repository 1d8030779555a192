use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vodstream::catalog::{seed, Catalog};
use vodstream::control::views;
use vodstream::core::auth::AuthProvider;
use vodstream::core::config::AppConfig;
use vodstream::core::shutdown::{
    drain_http_server, ShutdownCoordinator, HTTP_DRAIN_TIMEOUT_SECS, SHUTDOWN_TIMEOUT_SECS,
    VIEW_DRAIN_TIMEOUT_SECS,
};
use vodstream::delivery::router::{self, AppState};
use vodstream::observability::metrics as obs_metrics;
use vodstream::storage::fs::FsContentStore;
use vodstream::storage::ContentStore;

#[tokio::main]
async fn main() -> ExitCode {
    // Must be installed before any metrics are recorded.
    let metrics_handle = match obs_metrics::install_prometheus_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("failed to install metrics recorder: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Log panics with a backtrace and count them.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        obs_metrics::inc_panic_total();
        let backtrace = std::backtrace::Backtrace::force_capture();
        eprintln!("PANIC: {info}\nBacktrace:\n{backtrace}");
        default_hook(info);
    }));

    // Layered: default.toml → {env}.toml → env vars
    let config = match AppConfig::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    info!(version = env!("CARGO_PKG_VERSION"), "vodstream starting");

    obs_metrics::describe_all_metrics();

    let shutdown = ShutdownCoordinator::new();
    let auth = Arc::new(AuthProvider::new(&config.auth));
    if auth.is_open_mode() {
        warn!("no admin bearer tokens configured, admin API is open");
    }

    let catalog = Arc::new(Catalog::new());
    if let Some(path) = &config.catalog.seed_path {
        if let Err(e) = seed::load_seed_file(path, &catalog).await {
            error!(error = %e, "failed to load catalog seed");
            return ExitCode::FAILURE;
        }
    }

    let store = Arc::new(FsContentStore::new(config.storage.media_root.clone()));
    if let Err(e) = store.health_check().await {
        warn!(
            media_root = %store.root().display(),
            error = %e,
            "media root is not readable, streams will fail until it is"
        );
    }

    // Lossy view counting, applied off the request path.
    let (view_counter, view_rx) = views::view_channel(config.views.channel_capacity);
    let view_task = tokio::spawn(views::run_view_counter(
        view_rx,
        catalog.clone(),
        shutdown.token(),
    ));

    let start_time = Instant::now();
    tokio::spawn(obs_metrics::run_uptime_task(start_time, shutdown.token()));

    let app_state = AppState {
        store,
        catalog,
        auth: auth.clone(),
        views: view_counter,
        config: config.clone(),
        start_time,
        metrics_handle,
    };
    let app = router::build_router(app_state);

    let http_addr: SocketAddr = match format!("{}:{}", config.server.host, config.server.port).parse()
    {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, host = %config.server.host, "invalid HTTP bind address");
            return ExitCode::FAILURE;
        }
    };
    let listener = match tokio::net::TcpListener::bind(http_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %http_addr, "failed to bind HTTP listener");
            return ExitCode::FAILURE;
        }
    };
    info!(
        %http_addr,
        media_root = %config.storage.media_root.display(),
        "HTTP server listening"
    );

    let server_token = shutdown.token();
    let server_shutdown = shutdown.clone();
    let server_task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_token.cancelled().await;
            })
            .await;
        if let Err(e) = result {
            error!(error = %e, "HTTP server error");
            server_shutdown.trigger_shutdown();
        }
    });

    tokio::spawn(run_config_reload_task(auth, shutdown.token()));

    let internal = shutdown.token();
    tokio::select! {
        _ = shutdown.wait_for_signal_and_shutdown() => {}
        _ = internal.cancelled() => {
            warn!("shutdown triggered internally");
        }
    }

    obs_metrics::set_shutdown_in_progress(true);
    info!("initiating graceful shutdown sequence");
    let shutdown_result = tokio::time::timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        graceful_shutdown(server_task, view_task),
    )
    .await;

    match shutdown_result {
        Ok(()) => {
            info!("graceful shutdown completed");
            ExitCode::SUCCESS
        }
        Err(_) => {
            error!(
                "shutdown timed out after {}s, forcing exit",
                SHUTDOWN_TIMEOUT_SECS
            );
            ExitCode::FAILURE
        }
    }
}

/// Give in-flight requests a bounded drain, then apply queued views.
async fn graceful_shutdown(server_task: JoinHandle<()>, view_task: JoinHandle<()>) {
    info!(
        "phase 1: draining HTTP connections ({}s timeout)",
        HTTP_DRAIN_TIMEOUT_SECS
    );
    drain_http_server(server_task, Duration::from_secs(HTTP_DRAIN_TIMEOUT_SECS)).await;

    info!(
        "phase 2: applying queued views ({}s timeout)",
        VIEW_DRAIN_TIMEOUT_SECS
    );
    match tokio::time::timeout(Duration::from_secs(VIEW_DRAIN_TIMEOUT_SECS), view_task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "view counter task failed"),
        Err(_) => warn!("view counter did not drain in time, remaining views are lost"),
    }
}

/// Rotate admin tokens and viewer sessions on SIGHUP.
///
/// Everything else in the config needs a restart.
async fn run_config_reload_task(auth: Arc<AuthProvider>, cancel: CancellationToken) {
    #[cfg(unix)]
    {
        let mut sighup =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "failed to install SIGHUP handler, config reload disabled");
                    return;
                }
            };

        info!("SIGHUP config reload task started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("config reload task shutting down");
                    return;
                }
                _ = sighup.recv() => {
                    info!("received SIGHUP, reloading configuration");
                    match AppConfig::load() {
                        Ok(new_config) => {
                            auth.update_admin_tokens(new_config.auth.admin_bearer_tokens);
                            auth.update_viewer_tokens(&new_config.auth.viewer_tokens);
                            info!(
                                cors_origins = ?new_config.delivery.cors_allowed_origins,
                                "auth tokens rotated; other settings take effect on restart"
                            );
                            obs_metrics::inc_config_reload("success");
                        }
                        Err(e) => {
                            obs_metrics::inc_config_reload("failure");
                            error!(error = %e, "failed to reload configuration on SIGHUP, keeping current config");
                        }
                    }
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (auth, cancel);
    }
}

fn init_tracing(log_level: &str, log_format: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    match log_format {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
