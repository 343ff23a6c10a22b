//! UDP datagram plugin
//!
//! Binds one endpoint for receiving and sends to another. Every datagram is
//! one OSC packet.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use oscwire_core::{DEFAULT_UDP_LISTEN_PORT, DEFAULT_UDP_SEND_PORT};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::state::PluginState;
use crate::traits::{Notifier, Plugin, Status, TransportEvent};

/// Largest UDP payload over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// UDP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpConfig {
    /// Local endpoint to bind
    pub open: Endpoint,
    /// Default destination for `send`
    pub send: Endpoint,
    /// Receive buffer size
    pub max_packet_size: usize,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            open: Endpoint::localhost(DEFAULT_UDP_LISTEN_PORT),
            send: Endpoint::localhost(DEFAULT_UDP_SEND_PORT),
            max_packet_size: MAX_DATAGRAM_SIZE,
        }
    }
}

struct Bound {
    socket: Arc<UdpSocket>,
    receiver: JoinHandle<()>,
}

/// UDP plugin
pub struct UdpPlugin {
    config: UdpConfig,
    state: Arc<PluginState>,
    bound: Mutex<Option<Bound>>,
}

impl UdpPlugin {
    pub fn new() -> Self {
        Self::with_config(UdpConfig::default())
    }

    pub fn with_config(config: UdpConfig) -> Self {
        Self {
            config,
            state: Arc::new(PluginState::default()),
            bound: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &UdpConfig {
        &self.config
    }

    /// Address the socket is bound to, once open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound
            .lock()
            .as_ref()
            .and_then(|bound| bound.socket.local_addr().ok())
    }

    fn socket(&self) -> Option<Arc<UdpSocket>> {
        self.bound.lock().as_ref().map(|bound| bound.socket.clone())
    }
}

impl Default for UdpPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Bind a UDP socket on `endpoint`
pub(crate) async fn bind(endpoint: &Endpoint) -> Result<UdpSocket> {
    UdpSocket::bind(endpoint.as_pair())
        .await
        .map_err(|e| TransportError::ConnectionFailed(format!("bind {}: {}", endpoint, e)))
}

/// Read datagrams until the task is aborted, handing each one to `on_datagram`
pub(crate) fn spawn_receiver<F>(
    socket: Arc<UdpSocket>,
    max_size: usize,
    state: Arc<PluginState>,
    on_datagram: F,
) -> JoinHandle<()>
where
    F: Fn(Bytes) + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; max_size];

        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, from)) => {
                    debug!("UDP received {} bytes from {}", len, from);
                    on_datagram(Bytes::copy_from_slice(&buf[..len]));
                }
                Err(e) => {
                    error!("UDP receive error: {}", e);
                    let err = TransportError::ReceiveFailed(e.to_string());
                    state.emit(TransportEvent::Error(err.to_string()));
                }
            }
        }
    })
}

#[async_trait]
impl Plugin for UdpPlugin {
    type OpenOptions = Endpoint;
    type SendOptions = Endpoint;

    fn register_notify(&self, notify: Notifier) {
        self.state.set_notifier(notify);
    }

    fn status(&self) -> Status {
        self.state.status()
    }

    async fn open(&self, options: Option<Endpoint>) -> Result<()> {
        if self.bound.lock().is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let endpoint = options.unwrap_or_else(|| self.config.open.clone());
        self.state.set_status(Status::Connecting);

        let socket = match bind(&endpoint).await {
            Ok(socket) => Arc::new(socket),
            Err(e) => {
                self.state.failed(e.to_string());
                return Err(e);
            }
        };

        info!("UDP bound to {}", endpoint);

        let state = self.state.clone();
        let receiver = spawn_receiver(
            socket.clone(),
            self.config.max_packet_size,
            self.state.clone(),
            move |data| state.emit(TransportEvent::Data(data)),
        );

        *self.bound.lock() = Some(Bound { socket, receiver });
        self.state.opened();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let bound = self.bound.lock().take().ok_or(TransportError::NotConnected)?;

        self.state.set_status(Status::Closing);
        bound.receiver.abort();
        drop(bound.socket);

        info!("UDP socket closed");
        self.state.closed(None);
        Ok(())
    }

    async fn send(&self, data: Bytes, options: Option<Endpoint>) -> Result<()> {
        let socket = self.socket().ok_or(TransportError::NotConnected)?;
        let target = options.as_ref().unwrap_or(&self.config.send);

        socket
            .send_to(&data, target.as_pair())
            .await
            .map_err(|e| TransportError::SendFailed(format!("{}: {}", target, e)))?;

        debug!("UDP sent {} bytes to {}", data.len(), target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let config = UdpConfig::default();
        assert_eq!(config.open, Endpoint::localhost(41234));
        assert_eq!(config.send, Endpoint::localhost(41235));
    }

    #[tokio::test]
    async fn test_open_close_status() {
        let plugin = UdpPlugin::new();
        assert_eq!(plugin.status(), Status::NotInitialized);

        plugin
            .open(Some(Endpoint::new("127.0.0.1", 0)))
            .await
            .unwrap();
        assert_eq!(plugin.status(), Status::Open);
        assert!(plugin.local_addr().unwrap().port() > 0);

        plugin.close().await.unwrap();
        assert_eq!(plugin.status(), Status::Closed);
        assert!(plugin.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_send_before_open() {
        let plugin = UdpPlugin::new();
        let err = plugin.send(Bytes::from_static(b"x"), None).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_double_open() {
        let plugin = UdpPlugin::new();
        let local = Endpoint::new("127.0.0.1", 0);
        plugin.open(Some(local.clone())).await.unwrap();

        let err = plugin.open(Some(local)).await.unwrap_err();
        assert!(matches!(err, TransportError::AlreadyConnected));
    }
}
