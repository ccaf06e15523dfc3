//! Online/offline detection.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Treats the network as reachable when a TCP connection to `host:port`
/// opens within `timeout`.
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host serving `base_url`, defaulting the port from the
    /// scheme.
    pub fn for_url(base_url: &str, timeout: Duration) -> Option<Self> {
        let url = reqwest::Url::parse(base_url).ok()?;
        let host = url.host_str()?.to_string();
        let port = url.port_or_known_default()?;
        Some(Self::new(host, port, timeout))
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        let addr = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                log::debug!("Connectivity probe to {}:{} failed: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                log::debug!("Connectivity probe to {}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}

/// Always reports online; lets the HTTP call itself surface failures.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl ConnectivityProbe for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Switchable probe for tests and for hosts that push connectivity state.
#[derive(Debug)]
pub struct StaticProbe {
    online: AtomicBool,
}

impl StaticProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Polls a probe and publishes changes. The task exits once every
/// receiver has been dropped.
///
/// Meant for long-running embedders: handing an `Arc<ConnectivityMonitor>`
/// to the client as its probe answers from the last poll instead of
/// opening a connection per fetch. The one-shot CLI probes directly.
pub struct ConnectivityMonitor {
    rx: watch::Receiver<bool>,
    handle: JoinHandle<()>,
}

impl ConnectivityMonitor {
    pub async fn spawn(probe: Arc<dyn ConnectivityProbe>, interval: Duration) -> Self {
        let initial = probe.is_online().await;
        let (tx, rx) = watch::channel(initial);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {
                        let online = probe.is_online().await;
                        tx.send_if_modified(|current| {
                            if *current == online {
                                return false;
                            }
                            log::info!("Connectivity changed: online={}", online);
                            *current = online;
                            true
                        });
                    }
                }
            }
        });
        Self { rx, handle }
    }

    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

#[async_trait]
impl ConnectivityProbe for ConnectivityMonitor {
    async fn is_online(&self) -> bool {
        *self.rx.borrow()
    }
}
