//! Reloadable Server
//!
//! A long-running HTTP server whose configuration can be swapped while
//! requests are in flight, and which drains outstanding work before exiting.
//!
//! # Architecture Overview
//!
//! ```text
//!        SIGHUP ──┐                        ┌──────────────────────┐
//!     file edit ──┼─▶ ControlEvent::Reload ─▶│  ReloadSequencer     │
//!                 │                        │  token → load → swap │
//!  POST /admin/reload ───────────────────▶│  → reopen sinks      │
//!                                          │  → per-user ports    │
//!                                          └──────────┬───────────┘
//!                                                     ▼
//!     Client Request ──▶ track_work ──▶ serve_request ──▶ ConfigStore::current()
//!                            │
//!                            ▼
//!       SIGTERM ──▶ ShutdownCoordinator: drain to zero | grace period ──▶ exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use reloadable_server::config::watcher::ConfigWatcher;
use reloadable_server::config::{ConfigLoader, FileConfigLoader};
use reloadable_server::lifecycle::signals::listen_os_signals;
use reloadable_server::observability::{logging, metrics};
use reloadable_server::{HttpServer, ServerContext, StartupOptions};

#[derive(Parser)]
#[command(name = "reloadable-server")]
#[command(about = "HTTP server with live reload and graceful shutdown", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "reloadable-server.toml")]
    config: PathBuf,

    /// Reload automatically when the configuration file changes.
    #[arg(long)]
    watch: bool,

    /// Run with default settings if the configuration file does not exist.
    #[arg(long)]
    allow_defaults: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loader = Arc::new(FileConfigLoader::new(&cli.config).allow_missing(cli.allow_defaults));
    let config = loader.load()?;

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "reloadable-server starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address = config.listener.bind_address.clone();
    let (ctx, router) = ServerContext::bootstrap(loader, StartupOptions::from_config(&config));
    ctx.start(config).await?;

    listen_os_signals(ctx.control.clone())?;
    router.spawn();

    let _watcher = if cli.watch {
        Some(ConfigWatcher::new(&cli.config, ctx.control.clone()).run()?)
    } else {
        None
    };

    let listener = TcpListener::bind(&bind_address).await?;
    HttpServer::new(&ctx).run(listener).await?;

    // the listener only stops once shutdown has begun; the coordinator exits the process
    ctx.shutdown.terminated().await;
    Ok(())
}
