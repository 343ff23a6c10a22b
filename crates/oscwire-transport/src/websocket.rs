//! WebSocket client plugin

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use oscwire_core::DEFAULT_WS_PORT;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::endpoint::Endpoint;
use crate::error::{Result, TransportError};
use crate::state::PluginState;
use crate::traits::{Notifier, Plugin, Status, TransportEvent};

/// WebSocket client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WsClientConfig {
    pub host: String,
    pub port: u16,
    /// Connect with `wss://`
    pub secure: bool,
}

impl WsClientConfig {
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}", scheme, Endpoint::new(self.host.clone(), self.port))
    }
}

impl Default for WsClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_WS_PORT,
            secure: false,
        }
    }
}

struct Connection {
    tx: mpsc::Sender<WsMessage>,
    reader: JoinHandle<()>,
}

/// WebSocket client plugin
pub struct WsClientPlugin {
    config: WsClientConfig,
    state: Arc<PluginState>,
    connection: Mutex<Option<Connection>>,
}

impl WsClientPlugin {
    pub fn new() -> Self {
        Self::with_config(WsClientConfig::default())
    }

    pub fn with_config(config: WsClientConfig) -> Self {
        Self {
            config,
            state: Arc::new(PluginState::default()),
            connection: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WsClientConfig {
        &self.config
    }

    fn sender(&self) -> Option<mpsc::Sender<WsMessage>> {
        self.connection.lock().as_ref().map(|conn| conn.tx.clone())
    }
}

impl Default for WsClientPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for WsClientPlugin {
    type OpenOptions = WsClientConfig;
    type SendOptions = ();

    fn register_notify(&self, notify: Notifier) {
        self.state.set_notifier(notify);
    }

    fn status(&self) -> Status {
        self.state.status()
    }

    async fn open(&self, options: Option<WsClientConfig>) -> Result<()> {
        {
            let mut connection = self.connection.lock();
            if connection.is_some() && self.state.status().is_open() {
                return Err(TransportError::AlreadyConnected);
            }
            // peer already hung up
            *connection = None;
        }

        let config = options.as_ref().unwrap_or(&self.config);
        if config.host.trim().is_empty() {
            return Err(TransportError::InvalidUrl(config.url()));
        }
        let url = config.url();
        info!("Connecting to WebSocket: {}", url);
        self.state.set_status(Status::Connecting);

        let (ws_stream, response) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                let err = TransportError::ConnectionFailed(format!("{}: {}", url, e));
                self.state.failed(err.to_string());
                return Err(err);
            }
        };

        debug!("WebSocket connected, response: {:?}", response.status());

        let (write, read) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<WsMessage>(100);

        // Writer task
        tokio::spawn(async move {
            let mut write = write;
            while let Some(msg) = rx.recv().await {
                let closing = matches!(msg, WsMessage::Close(_));
                if let Err(e) = write.send(msg).await {
                    error!("WebSocket write error: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        // Reader task
        let state = self.state.clone();
        let reader = tokio::spawn(async move {
            let mut read = read;

            while let Some(result) = read.next().await {
                match result {
                    Ok(WsMessage::Binary(data)) => {
                        state.emit(TransportEvent::Data(Bytes::from(data)));
                    }
                    Ok(WsMessage::Text(text)) => {
                        warn!("Received text frame, treating it as binary");
                        state.emit(TransportEvent::Data(Bytes::from(text)));
                    }
                    Ok(WsMessage::Close(frame)) => {
                        let reason = frame.map(|f| f.reason.to_string());
                        info!("WebSocket closed by peer: {:?}", reason);
                        state.closed(reason);
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket read error: {}", e);
                        let err = TransportError::ReceiveFailed(e.to_string());
                        state.emit(TransportEvent::Error(err.to_string()));
                        state.closed(Some(e.to_string()));
                        return;
                    }
                }
            }

            state.closed(None);
        });

        *self.connection.lock() = Some(Connection { tx, reader });
        self.state.opened();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let connection = self
            .connection
            .lock()
            .take()
            .ok_or(TransportError::NotConnected)?;

        connection.reader.abort();
        if self.state.status() == Status::Closed {
            return Ok(());
        }

        self.state.set_status(Status::Closing);
        let _ = connection.tx.send(WsMessage::Close(None)).await;

        info!("WebSocket connection closed");
        self.state.closed(None);
        Ok(())
    }

    async fn send(&self, data: Bytes, _options: Option<()>) -> Result<()> {
        if !self.state.status().is_open() {
            return Err(TransportError::NotConnected);
        }
        let tx = self.sender().ok_or(TransportError::NotConnected)?;

        // writer task is gone once the sink fails
        tx.send(WsMessage::Binary(data.to_vec()))
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        assert_eq!(WsClientConfig::default().url(), "ws://localhost:8080");

        let config = WsClientConfig {
            host: "osc.example.com".to_string(),
            port: 443,
            secure: true,
        };
        assert_eq!(config.url(), "wss://osc.example.com:443");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let plugin = WsClientPlugin::with_config(WsClientConfig {
            host: "127.0.0.1".to_string(),
            port,
            secure: false,
        });

        let err = plugin.open(None).await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
        assert_eq!(plugin.status(), Status::Closed);
    }

    #[tokio::test]
    async fn test_empty_host_rejected() {
        let plugin = WsClientPlugin::new();
        let options = WsClientConfig {
            host: " ".to_string(),
            ..WsClientConfig::default()
        };

        let err = plugin.open(Some(options)).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidUrl(url) if url == "ws:// :8080"));
        assert_eq!(plugin.status(), Status::NotInitialized);
    }
}
