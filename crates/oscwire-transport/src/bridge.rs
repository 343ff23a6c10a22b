//! UDP/WebSocket bridge plugin
//!
//! Runs a UDP socket and a WebSocket server side by side:
//! ```text
//! UDP datagram   ──► every WebSocket client  (+ local notify)
//! WebSocket frame ──► UDP client endpoint    (+ local notify)
//! ```
//! `send` targets one side, selected by [`Receiver`].

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use oscwire_core::{DEFAULT_UDP_LISTEN_PORT, DEFAULT_UDP_SEND_PORT, DEFAULT_WS_PORT};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::server::{listen, spawn_acceptor, ClientHub, FrameHandler};
use crate::state::PluginState;
use crate::traits::{Notifier, Plugin, Status, TransportEvent};
use crate::udp::{bind, spawn_receiver, MAX_DATAGRAM_SIZE};

/// Side of the bridge a `send` goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Receiver {
    Udp,
    #[default]
    Ws,
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Local UDP endpoint to bind
    pub udp_server: Endpoint,
    /// UDP destination for WebSocket traffic and `Receiver::Udp` sends
    pub udp_client: Endpoint,
    /// WebSocket server endpoint
    pub ws_server: Endpoint,
    /// Default target of `send`
    pub receiver: Receiver,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            udp_server: Endpoint::localhost(DEFAULT_UDP_LISTEN_PORT),
            udp_client: Endpoint::localhost(DEFAULT_UDP_SEND_PORT),
            ws_server: Endpoint::localhost(DEFAULT_WS_PORT),
            receiver: Receiver::Ws,
        }
    }
}

struct Running {
    socket: Arc<UdpSocket>,
    udp_client: Endpoint,
    ws_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

/// UDP/WebSocket bridge plugin
pub struct BridgePlugin {
    config: BridgeConfig,
    state: Arc<PluginState>,
    hub: Arc<ClientHub>,
    running: Mutex<Option<Running>>,
}

impl BridgePlugin {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    pub fn with_config(config: BridgeConfig) -> Self {
        Self {
            config,
            state: Arc::new(PluginState::default()),
            hub: Arc::new(ClientHub::default()),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bound UDP address, once open
    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .as_ref()
            .and_then(|r| r.socket.local_addr().ok())
    }

    /// Bound WebSocket address, once open
    pub fn ws_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.ws_addr)
    }

    /// Number of connected WebSocket clients
    pub fn client_count(&self) -> usize {
        self.hub.len()
    }

    fn udp_target(&self) -> Option<(Arc<UdpSocket>, Endpoint)> {
        self.running
            .lock()
            .as_ref()
            .map(|r| (r.socket.clone(), r.udp_client.clone()))
    }
}

impl Default for BridgePlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for BridgePlugin {
    type OpenOptions = BridgeConfig;
    type SendOptions = Receiver;

    fn register_notify(&self, notify: Notifier) {
        self.state.set_notifier(notify);
    }

    fn status(&self) -> Status {
        self.state.status()
    }

    async fn open(&self, options: Option<BridgeConfig>) -> Result<()> {
        if self.running.lock().is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let config = options.unwrap_or_else(|| self.config.clone());
        self.state.set_status(Status::Connecting);

        let bound = async {
            let socket = bind(&config.udp_server).await?;
            let listener = listen(&config.ws_server).await?;
            Ok::<_, TransportError>((socket, listener))
        }
        .await;

        let (socket, listener) = match bound {
            Ok(bound) => bound,
            Err(e) => {
                self.state.failed(e.to_string());
                return Err(e);
            }
        };
        let socket = Arc::new(socket);
        let ws_addr = listener.local_addr()?;

        // WebSocket frames are queued here and forwarded to the UDP client
        let (forward_tx, mut forward_rx) = mpsc::unbounded_channel::<Bytes>();
        let forward_socket = socket.clone();
        let udp_client = config.udp_client.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(data) = forward_rx.recv().await {
                if let Err(e) = forward_socket.send_to(&data, udp_client.as_pair()).await {
                    warn!("Forwarding {} bytes to {} failed: {}", data.len(), udp_client, e);
                }
            }
        });

        let state = self.state.clone();
        let on_frame: FrameHandler = Arc::new(move |data: Bytes| {
            let _ = forward_tx.send(data.clone());
            state.emit(TransportEvent::Data(data));
        });
        let acceptor = spawn_acceptor(listener, self.hub.clone(), self.state.clone(), on_frame);

        let state = self.state.clone();
        let hub = self.hub.clone();
        let receiver = spawn_receiver(
            socket.clone(),
            MAX_DATAGRAM_SIZE,
            self.state.clone(),
            move |data| {
                let forwarded = hub.broadcast(&data);
                debug!("Bridged datagram to {} WebSocket clients", forwarded);
                state.emit(TransportEvent::Data(data));
            },
        );

        info!(
            "Bridge open: udp {} <-> ws {} (udp client {})",
            config.udp_server, ws_addr, config.udp_client
        );

        *self.running.lock() = Some(Running {
            socket,
            udp_client: config.udp_client,
            ws_addr,
            tasks: vec![receiver, acceptor, forwarder],
        });
        self.state.opened();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let running = self
            .running
            .lock()
            .take()
            .ok_or(TransportError::NotConnected)?;

        self.state.set_status(Status::Closing);
        for task in &running.tasks {
            task.abort();
        }
        self.hub.close_all();

        info!("Bridge closed");
        self.state.closed(None);
        Ok(())
    }

    async fn send(&self, data: Bytes, options: Option<Receiver>) -> Result<()> {
        match options.unwrap_or(self.config.receiver) {
            Receiver::Udp => {
                let (socket, target) = self.udp_target().ok_or(TransportError::NotConnected)?;
                socket
                    .send_to(&data, target.as_pair())
                    .await
                    .map_err(|e| TransportError::SendFailed(format!("{}: {}", target, e)))?;
                Ok(())
            }
            Receiver::Ws => {
                if !self.state.status().is_open() {
                    return Err(TransportError::NotConnected);
                }
                self.hub.broadcast(&data);
                Ok(())
            }
        }
    }
}
