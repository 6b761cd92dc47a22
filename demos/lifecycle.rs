//! # Demo: lifecycle
//!
//! Registers two closure-backed services and a TCP listener, then runs until
//! Ctrl-C / SIGTERM.
//!
//! ## Flow
//! ```text
//! Application::run_until_signal()
//!     ├─► start "db", "cache" (concurrently)   ──► ServiceStarted x2
//!     ├─► TcpAcceptor::start()                 ──► ListenerStarted{addr}
//!     ├─► wait_for_shutdown_signal()           ──► ShutdownRequested
//!     ├─► TcpAcceptor::shutdown()              ──► ListenerStopped
//!     ├─► stop "cache", "db" (reverse order)   ──► ServiceStopped x2
//!     └─► worker pool teardown                 ──► PoolDrained
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=appvisor=debug cargo run --example lifecycle
//! # in another terminal
//! nc 127.0.0.1 7878
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use appvisor::{
    Application, Config, ListenerConfig, LogWriter, ServiceError, ServiceFn, Subscribe, TcpAcceptor,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("appvisor=info")))
        .init();

    let queries = Arc::new(AtomicU64::new(0));

    let db = ServiceFn::arc(
        || async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            Ok::<_, ServiceError>(())
        },
        |timeout: Duration| async move {
            tracing::info!(?timeout, "flushing db");
            Ok::<_, ServiceError>(())
        },
    );
    let cache = ServiceFn::arc(
        || async { Ok::<_, ServiceError>(()) },
        |_timeout: Duration| async { Ok::<_, ServiceError>(()) },
    );

    let counter = Arc::clone(&queries);
    let acceptor = Arc::new(TcpAcceptor::new(
        ListenerConfig::new("127.0.0.1", 7878),
        move |mut stream: TcpStream, peer: SocketAddr, shutdown: CancellationToken| {
            let counter = Arc::clone(&counter);
            async move {
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(%peer, n, "connection accepted");
                let greeting = format!("hello #{n}\n");
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = stream.write_all(greeting.as_bytes()) => {}
                }
            }
        },
    ));

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let app = Application::builder(Config::default())
        .service("db", db)
        .service("cache", cache)
        .listener(acceptor)
        .subscribers(subs)
        .build();

    app.run_until_signal().await?;
    tracing::info!(served = queries.load(Ordering::Relaxed), "bye");
    Ok(())
}
