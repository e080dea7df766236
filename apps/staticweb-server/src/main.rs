//! Static web server: serves object-storage containers as websites.
//!
//! The binary wires [`staticweb_http::StaticWebHttpService`] to a plain HTTP
//! object-storage backend and exposes a health check endpoint for orchestration
//! systems.
//!
//! # Usage
//!
//! ```text
//! STATICWEB_BACKEND_URL=http://127.0.0.1:8080 staticweb-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:8090` | Bind address |
//! | `STATICWEB_BACKEND_URL` | `http://127.0.0.1:8080` | Object-storage backend |
//! | `STATICWEB_CACHE_TIMEOUT` | `300` | Container metadata cache TTL (seconds) |
//! | `STATICWEB_REMOTE_USER_HEADER` | `x-remote-user` | Header marking authenticated callers |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use http::Method;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use staticweb_core::{Backend, BackendRequest, MemoryCache, StaticWeb, StaticWebConfig};
use staticweb_http::{HttpBackend, StaticWebHttpConfig, StaticWebHttpService};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the fmt subscriber, filtered by `RUST_LOG` or else `log_level`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

/// Assemble the service from a validated configuration.
fn build_service(config: &StaticWebConfig) -> Result<StaticWebHttpService<HttpBackend>> {
    config.validate().context("invalid configuration")?;

    let backend = HttpBackend::new(&config.backend_url)
        .with_context(|| format!("invalid backend url: {}", config.backend_url))?;
    let cache = Arc::new(MemoryCache::new());
    let web = StaticWeb::new(backend, cache, config);
    let http_config = StaticWebHttpConfig::from_core(config).context("invalid http config")?;

    Ok(StaticWebHttpService::new(web, http_config))
}

/// Accept connections until `shutdown` resolves, then drain the open ones.
async fn serve<B, F>(
    listener: TcpListener,
    service: StaticWebHttpService<B>,
    shutdown: F,
) -> Result<()>
where
    B: Backend,
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let conn = http.serve_connection(TokioIo::new(stream), service.clone());
                let conn = graceful.watch(conn.into_owned());
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(%peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => break,
        }
    }

    info!("draining connections");
    graceful.shutdown().await;
    Ok(())
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}

/// Ask a running server for `/health` with the same client used for the backend.
async fn run_health_check(addr: &str) -> Result<()> {
    let client = HttpBackend::new(&format!("http://{addr}"))?;
    let response = client
        .send(BackendRequest::new(Method::GET, "/health"))
        .await
        .with_context(|| format!("cannot reach {addr}"))?;

    if response.is_success() && is_healthy_body(&response.body) {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}: {}", response.status)
    }
}

fn is_healthy_body(body: &[u8]) -> bool {
    String::from_utf8_lossy(body).contains("\"status\":\"running\"")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let config = StaticWebConfig::from_env();
        let addr = config.gateway_listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = StaticWebConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        backend_url = %config.backend_url,
        cache_timeout_secs = config.cache_timeout_secs,
        remote_user_header = %config.remote_user_header,
        version = VERSION,
        "starting static web server",
    );

    let service = build_service(&config)?;

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service, ctrl_c()).await
}
