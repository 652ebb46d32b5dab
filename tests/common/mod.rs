//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reloadable_server::config::{ConfigError, ServerConfig};
use reloadable_server::lifecycle::shutdown::ExitAction;
use reloadable_server::{HttpServer, ServerContext, StartupOptions};
use tokio::net::TcpListener;

/// Stand-in for the configuration file: tests edit it, the loader reads it.
#[derive(Clone, Default)]
pub struct ConfigSource {
    config: Arc<Mutex<Option<ServerConfig>>>,
}

#[allow(dead_code)]
impl ConfigSource {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(Some(config))),
        }
    }

    pub fn set(&self, config: ServerConfig) {
        *self.config.lock().unwrap() = Some(config);
    }

    /// Make every following load fail.
    pub fn break_it(&self) {
        *self.config.lock().unwrap() = None;
    }

    pub fn load(&self) -> Result<ServerConfig, ConfigError> {
        self.config
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ConfigError::Other("config file is corrupt".into()))
    }
}

#[allow(dead_code)]
pub struct TestServer {
    pub ctx: ServerContext,
    pub addr: SocketAddr,
    pub exits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn exit_count(&self) -> usize {
        self.exits.load(Ordering::SeqCst)
    }
}

/// Start a server on an ephemeral port, with the process exit replaced by a counter.
pub async fn start_server(source: ConfigSource, grace_period: Duration) -> TestServer {
    let exits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&exits);
    let exit: ExitAction = Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let initial = source.load().expect("initial config must load");
    let options = StartupOptions {
        grace_period,
        request_timeout: Duration::from_secs(10),
        exit,
    };
    let loader = source.clone();
    let (ctx, router) = ServerContext::bootstrap(Arc::new(move || loader.load()), options);
    ctx.start(initial).await.expect("startup failed");
    router.spawn();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(&ctx);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    TestServer { ctx, addr, exits }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[allow(dead_code)]
pub fn named(name: &str) -> ServerConfig {
    ServerConfig {
        server_name: name.to_string(),
        ..ServerConfig::default()
    }
}
