use clap::Parser;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

mod api;
mod config;
mod handler;
mod http;
mod logger;
mod server;

use server::{Service, ShutdownSignal};

/// Demo HTTP service with deliberately injectable faults
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (extension optional; missing file means defaults)
    #[arg(short, long, env = "FAULTY_APP_CONFIG", default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = config::Config::load_from(&args.config)?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let app_addr = cfg.get_socket_addr()?;
    let api_addr = if cfg.server.api_enabled {
        Some(cfg.get_api_socket_addr()?)
    } else {
        None
    };

    let app_listener = server::create_listener(app_addr, server::BACKLOG)?;
    let api_listener = api_addr
        .map(|addr| server::create_listener(addr, server::BACKLOG))
        .transpose()?;

    let state = Arc::new(config::AppState::new(&cfg));
    let shutdown = Arc::new(ShutdownSignal::new());
    server::start_signal_handler(Arc::clone(&shutdown));

    logger::log_server_start(&app_addr, api_addr.as_ref(), &cfg);

    // Connection tasks use spawn_local
    let local = tokio::task::LocalSet::new();
    local
        .run_until(run_servers(app_listener, api_listener, state, shutdown))
        .await
}

async fn run_servers(
    app_listener: TcpListener,
    api_listener: Option<TcpListener>,
    state: Arc<config::AppState>,
    shutdown: Arc<ShutdownSignal>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app_connections = Arc::new(AtomicUsize::new(0));

    let api_task = api_listener.map(|listener| {
        let state = Arc::clone(&state);
        let shutdown = Arc::clone(&shutdown);
        tokio::task::spawn_local(async move {
            let result = server::start_server_loop(
                listener,
                state,
                Arc::new(AtomicUsize::new(0)),
                Service::Api,
                shutdown,
            )
            .await;
            if let Err(e) = result {
                logger::log_api_error(&format!("API server error: {e}"));
            }
        })
    });

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    server::start_server_loop(
        app_listener,
        state,
        Arc::clone(&app_connections),
        Service::App,
        shutdown,
    )
    .await?;

    if let Some(task) = api_task {
        if let Err(e) = task.await {
            logger::log_api_error(&format!("API server task failed: {e}"));
        }
    }

    let remaining = server::drain_connections(&app_connections, grace).await;
    if remaining > 0 {
        logger::log_warning(&format!(
            "Exiting with {remaining} connection(s) still open after {}s grace",
            grace.as_secs()
        ));
    }
    logger::log_shutdown("Server stopped");
    Ok(())
}
