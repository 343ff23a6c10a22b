//! WebSocket server plugin
//!
//! Accepts any number of clients. Binary frames from a client are reported
//! as received data; `send` broadcasts to every connected client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use oscwire_core::DEFAULT_WS_PORT;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::state::PluginState;
use crate::traits::{Notifier, Plugin, Status, TransportEvent};

/// WebSocket server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsServerConfig {
    pub host: String,
    pub port: u16,
}

impl WsServerConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }
}

impl Default for WsServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_WS_PORT,
        }
    }
}

/// Outgoing queues of the connected clients
#[derive(Debug, Default)]
pub(crate) struct ClientHub {
    clients: DashMap<u64, mpsc::Sender<WsMessage>>,
    next_id: AtomicU64,
}

impl ClientHub {
    fn insert(&self, tx: mpsc::Sender<WsMessage>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients.insert(id, tx);
        id
    }

    fn remove(&self, id: u64) {
        self.clients.remove(&id);
    }

    pub(crate) fn len(&self) -> usize {
        self.clients.len()
    }

    /// Queue `data` for every client, returning how many accepted it
    pub(crate) fn broadcast(&self, data: &Bytes) -> usize {
        let mut delivered = 0;
        for client in self.clients.iter() {
            match client.value().try_send(WsMessage::Binary(data.to_vec())) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Dropping frame for client {}: {}", client.key(), e),
            }
        }
        delivered
    }

    /// Send a close frame to every client and forget them
    pub(crate) fn close_all(&self) {
        for client in self.clients.iter() {
            let _ = client.value().try_send(WsMessage::Close(None));
        }
        self.clients.clear();
    }
}

/// Handler for binary frames arriving from any client
pub(crate) type FrameHandler = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Bind the listening socket
pub(crate) async fn listen(endpoint: &Endpoint) -> Result<TcpListener> {
    TcpListener::bind(endpoint.as_pair())
        .await
        .map_err(|e| TransportError::ConnectionFailed(format!("bind {}: {}", endpoint, e)))
}

/// Accept clients until the task is aborted
pub(crate) fn spawn_acceptor(
    listener: TcpListener,
    hub: Arc<ClientHub>,
    state: Arc<PluginState>,
    on_frame: FrameHandler,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("Accepted TCP connection from {}", addr);
                    tokio::spawn(serve_client(
                        stream,
                        addr,
                        hub.clone(),
                        state.clone(),
                        on_frame.clone(),
                    ));
                }
                Err(e) => {
                    error!("WebSocket accept error: {}", e);
                    state.emit(TransportEvent::Error(e.to_string()));
                }
            }
        }
    })
}

async fn serve_client(
    stream: TcpStream,
    addr: SocketAddr,
    hub: Arc<ClientHub>,
    state: Arc<PluginState>,
    on_frame: FrameHandler,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };

    info!("WebSocket client connected from {}", addr);

    let (write, read) = ws_stream.split();
    let (tx, mut rx) = mpsc::channel::<WsMessage>(100);
    let id = hub.insert(tx);

    // Writer task
    let writer = tokio::spawn(async move {
        let mut write = write;
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, WsMessage::Close(_));
            if let Err(e) = write.send(msg).await {
                debug!("WebSocket write to {} failed: {}", addr, e);
                break;
            }
            if closing {
                break;
            }
        }
    });

    let mut read = read;
    while let Some(result) = read.next().await {
        match result {
            Ok(WsMessage::Binary(data)) => on_frame(Bytes::from(data)),
            Ok(WsMessage::Text(text)) => {
                warn!("Received text frame from {}, treating it as binary", addr);
                on_frame(Bytes::from(text));
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket read from {} failed: {}", addr, e);
                let err = TransportError::ReceiveFailed(format!("{}: {}", addr, e));
                state.emit(TransportEvent::Error(err.to_string()));
                break;
            }
        }
    }

    hub.remove(id);
    writer.abort();
    info!("WebSocket client {} disconnected", addr);
}

struct Listening {
    local_addr: SocketAddr,
    acceptor: JoinHandle<()>,
}

/// WebSocket server plugin
pub struct WsServerPlugin {
    config: WsServerConfig,
    state: Arc<PluginState>,
    hub: Arc<ClientHub>,
    listening: Mutex<Option<Listening>>,
}

impl WsServerPlugin {
    pub fn new() -> Self {
        Self::with_config(WsServerConfig::default())
    }

    pub fn with_config(config: WsServerConfig) -> Self {
        Self {
            config,
            state: Arc::new(PluginState::default()),
            hub: Arc::new(ClientHub::default()),
            listening: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WsServerConfig {
        &self.config
    }

    /// Address the listener is bound to, once open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listening.lock().as_ref().map(|l| l.local_addr)
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        self.hub.len()
    }
}

impl Default for WsServerPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for WsServerPlugin {
    type OpenOptions = WsServerConfig;
    type SendOptions = ();

    fn register_notify(&self, notify: Notifier) {
        self.state.set_notifier(notify);
    }

    fn status(&self) -> Status {
        self.state.status()
    }

    async fn open(&self, options: Option<WsServerConfig>) -> Result<()> {
        // reopening replaces the running server
        if self.listening.lock().is_some() {
            self.close().await?;
        }

        let endpoint = options.as_ref().unwrap_or(&self.config).endpoint();
        self.state.set_status(Status::Connecting);

        let listener = match listen(&endpoint).await {
            Ok(listener) => listener,
            Err(e) => {
                self.state.failed(e.to_string());
                return Err(e);
            }
        };
        let local_addr = listener.local_addr()?;
        info!("WebSocket server listening on {}", local_addr);

        let state = self.state.clone();
        let on_frame: FrameHandler = Arc::new(move |data| state.emit(TransportEvent::Data(data)));
        let acceptor = spawn_acceptor(listener, self.hub.clone(), self.state.clone(), on_frame);

        *self.listening.lock() = Some(Listening {
            local_addr,
            acceptor,
        });
        self.state.opened();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let listening = self
            .listening
            .lock()
            .take()
            .ok_or(TransportError::NotConnected)?;

        self.state.set_status(Status::Closing);
        listening.acceptor.abort();
        self.hub.close_all();

        info!("WebSocket server on {} closed", listening.local_addr);
        self.state.closed(None);
        Ok(())
    }

    async fn send(&self, data: Bytes, _options: Option<()>) -> Result<()> {
        if !self.state.status().is_open() {
            return Err(TransportError::NotConnected);
        }

        let delivered = self.hub.broadcast(&data);
        debug!("Broadcast {} bytes to {} clients", data.len(), delivered);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WsServerConfig::default();
        assert_eq!(config.endpoint(), Endpoint::localhost(8080));
    }

    #[tokio::test]
    async fn test_hub_broadcast() {
        let hub = ClientHub::default();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        hub.insert(tx_a);
        let b = hub.insert(tx_b);

        assert_eq!(hub.broadcast(&Bytes::from_static(b"abcd")), 2);
        assert!(matches!(rx_a.recv().await, Some(WsMessage::Binary(_))));
        assert!(matches!(rx_b.recv().await, Some(WsMessage::Binary(_))));

        hub.remove(b);
        assert_eq!(hub.len(), 1);
        assert_eq!(hub.broadcast(&Bytes::from_static(b"abcd")), 1);
    }

    #[tokio::test]
    async fn test_open_on_ephemeral_port() {
        let plugin = WsServerPlugin::with_config(WsServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        });

        plugin.open(None).await.unwrap();
        assert_eq!(plugin.status(), Status::Open);
        assert!(plugin.local_addr().unwrap().port() > 0);

        plugin.send(Bytes::from_static(b"/a\0\0,\0\0\0"), None).await.unwrap();

        plugin.close().await.unwrap();
        assert_eq!(plugin.status(), Status::Closed);
    }
}
