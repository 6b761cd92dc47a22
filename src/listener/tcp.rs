//! # Plain TCP acceptor.
//!
//! [`TcpAcceptor`] binds a [`tokio::net::TcpListener`] and hands every accepted
//! connection to a [`ConnectionHandler`]. It does not parse any protocol.
//!
//! ```text
//! start():    bind(host:port) ─► spawn accept loop ─► Ok(local_addr)
//! accept:     (stream, peer)  ─► connections.spawn(handler.handle(stream, peer, token))
//! shutdown(): cancel ─► join accept loop (socket closed) ─► wait in-flight connections
//! ```
//!
//! Handlers receive a child [`CancellationToken`] and should finish their
//! connection soon after it fires.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::ListenerError;
use crate::listener::listener::{Listener, ListenerConfig};

/// Per-connection callback.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Serves one accepted connection.
    async fn handle(&self, stream: TcpStream, peer: SocketAddr, shutdown: CancellationToken);
}

#[async_trait]
impl<F, Fut> ConnectionHandler for F
where
    F: Fn(TcpStream, SocketAddr, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, stream: TcpStream, peer: SocketAddr, shutdown: CancellationToken) {
        (self)(stream, peer, shutdown).await
    }
}

/// TCP listener driving a [`ConnectionHandler`].
pub struct TcpAcceptor {
    config: ListenerConfig,
    handler: Arc<dyn ConnectionHandler>,
    local: OnceLock<SocketAddr>,
    accept_loop: Mutex<Option<JoinHandle<()>>>,
    connections: TaskTracker,
    cancel: CancellationToken,
}

impl TcpAcceptor {
    /// Creates an acceptor for `config`; nothing is bound until `start()`.
    pub fn new(config: ListenerConfig, handler: impl ConnectionHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            local: OnceLock::new(),
            accept_loop: Mutex::new(None),
            connections: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Bound address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local.get().copied()
    }

    /// Number of connections currently being served.
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    fn spawn_accept_loop(&self, listener: TcpListener) -> JoinHandle<()> {
        let cancel = self.cancel.clone();
        let connections = self.connections.clone();
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let handler = Arc::clone(&handler);
                            let token = cancel.child_token();
                            connections.spawn(async move {
                                handler.handle(stream, peer, token).await;
                            });
                        }
                        Err(err) => {
                            tracing::warn!(target: "appvisor", error = %err, "accept failed");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Listener for TcpAcceptor {
    async fn start(&self) -> Result<SocketAddr, ListenerError> {
        let mut accept_loop = self.accept_loop.lock().await;
        if let Some(addr) = self.local_addr() {
            return Ok(addr);
        }

        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|err| ListenerError::Bind {
                addr: bind_addr.clone(),
                error: err.to_string(),
            })?;
        let addr = listener.local_addr()?;

        let _ = self.local.set(addr);
        *accept_loop = Some(self.spawn_accept_loop(listener));
        Ok(addr)
    }

    async fn shutdown(&self) -> Result<(), ListenerError> {
        if self.local.get().is_none() {
            return Err(ListenerError::NotStarted);
        }

        self.cancel.cancel();
        if let Some(handle) = self.accept_loop.lock().await.take() {
            handle.await.map_err(|je| ListenerError::Io {
                error: je.to_string(),
            })?;
        }
        self.connections.close();
        self.connections.wait().await;
        Ok(())
    }

    fn config(&self) -> &ListenerConfig {
        &self.config
    }

    fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn greeter() -> TcpAcceptor {
        TcpAcceptor::new(
            ListenerConfig::default(),
            |mut stream: TcpStream, _peer: SocketAddr, _token: CancellationToken| async move {
                let _ = stream.write_all(b"hello").await;
            },
        )
    }

    #[tokio::test]
    async fn binds_ephemeral_port_and_serves() {
        let acceptor = greeter();
        assert_eq!(acceptor.port(), None);

        let addr = acceptor.start().await.unwrap();
        assert!(addr.port() > 0);
        assert_eq!(acceptor.port(), Some(addr.port()));
        // second start reports the same socket
        assert_eq!(acceptor.start().await.unwrap(), addr);

        let mut client = TcpStream::connect(addr).await.unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");

        let info = crate::listener::ListenerInfo::from_listener(&acceptor);
        assert_eq!(info.address(), Some(format!("http://127.0.0.1:{}", addr.port())));

        acceptor.shutdown().await.unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
        assert_eq!(acceptor.active_connections(), 0);
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_connections() {
        let acceptor = TcpAcceptor::new(
            ListenerConfig::default(),
            |_stream: TcpStream, _peer: SocketAddr, token: CancellationToken| async move {
                token.cancelled().await;
                tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            },
        );
        let addr = acceptor.start().await.unwrap();
        let _client = TcpStream::connect(addr).await.unwrap();
        while acceptor.active_connections() == 0 {
            tokio::task::yield_now().await;
        }

        acceptor.shutdown().await.unwrap();
        assert_eq!(acceptor.active_connections(), 0);
    }

    #[tokio::test]
    async fn shutdown_before_start_is_rejected() {
        assert_eq!(greeter().shutdown().await, Err(ListenerError::NotStarted));
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let acceptor = TcpAcceptor::new(
            ListenerConfig::new("127.0.0.1", port),
            |_stream: TcpStream, _peer: SocketAddr, _token: CancellationToken| async move {},
        );
        assert!(matches!(acceptor.start().await, Err(ListenerError::Bind { .. })));
        assert_eq!(acceptor.port(), None);
    }
}
