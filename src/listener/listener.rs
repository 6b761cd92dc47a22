//! # Network listener boundary.
//!
//! The application sees its optional listener only through the [`Listener`] trait:
//! it starts it after every service started and shuts it down before any service stops.
//! How the listener speaks to its clients is none of the application's business.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ListenerError;

/// Shared reference to a listener.
pub type ListenerRef = Arc<dyn Listener>;

/// Contract of the optional network-facing component.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Binds and begins accepting; resolves once the socket is bound.
    async fn start(&self) -> Result<SocketAddr, ListenerError>;

    /// Stops accepting and drains in-flight work.
    async fn shutdown(&self) -> Result<(), ListenerError>;

    /// Configuration the listener binds from; the source of [`ListenerInfo`].
    fn config(&self) -> &ListenerConfig;

    /// Bound port, once started.
    fn port(&self) -> Option<u16>;

    /// True if the listener terminates TLS.
    fn is_secure(&self) -> bool {
        self.config().secure
    }

    /// True if protocol upgrades (e.g. HTTP/2, WebSocket) are enabled.
    fn is_upgrade_enabled(&self) -> bool {
        self.config().upgrade_enabled
    }
}

/// Listener configuration blob.
///
/// `port = 0` requests an ephemeral port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Host or IP to bind.
    pub host: String,
    /// Port to bind (`0` = ephemeral).
    pub port: u16,
    /// Whether the listener terminates TLS.
    pub secure: bool,
    /// Whether protocol upgrades are enabled.
    pub upgrade_enabled: bool,
}

impl ListenerConfig {
    /// Configuration for `host:port`, plain and without upgrades.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
            upgrade_enabled: false,
        }
    }

    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 0)
    }
}

/// Snapshot of listener facts exposed by [`Application::listener_info`](crate::Application::listener_info).
///
/// Every field is absent (or `false`) when no listener is configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListenerInfo {
    /// `"http"` or `"https"`.
    pub protocol: Option<&'static str>,
    /// Host taken from the listener configuration.
    pub host: Option<String>,
    /// Bound port, once started.
    pub port: Option<u16>,
    /// Whether protocol upgrades are enabled.
    pub upgrade_enabled: bool,
}

impl ListenerInfo {
    /// Builds the info from a configured listener.
    pub(crate) fn from_listener(listener: &dyn Listener) -> Self {
        Self {
            protocol: Some(if listener.is_secure() { "https" } else { "http" }),
            host: Some(listener.config().host.clone()),
            port: listener.port(),
            upgrade_enabled: listener.is_upgrade_enabled(),
        }
    }

    /// `protocol://host:port`, when all parts are known.
    pub fn address(&self) -> Option<String> {
        match (self.protocol, self.host.as_deref(), self.port) {
            (Some(proto), Some(host), Some(port)) => Some(format!("{proto}://{host}:{port}")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_info_has_no_address() {
        let info = ListenerInfo::default();
        assert_eq!(info.address(), None);
        assert!(!info.upgrade_enabled);
    }

    #[test]
    fn config_renders_bind_address() {
        let cfg = ListenerConfig::new("0.0.0.0", 8080);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(ListenerConfig::default().port, 0);
    }
}
