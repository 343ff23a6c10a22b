//! Plugin contract shared by every transport

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Events a plugin reports to whoever registered for them
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Socket bound / connection established
    Connected,
    /// Socket closed (clean or error)
    Disconnected { reason: Option<String> },
    /// Raw packet received
    Data(Bytes),
    /// Asynchronous failure
    Error(String),
}

/// Connection status of a plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    NotInitialized,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl Status {
    /// Numeric status code: -1 not initialized, 0 connecting, 1 open,
    /// 2 closing, 3 closed
    pub fn code(&self) -> i8 {
        match self {
            Status::NotInitialized => -1,
            Status::Connecting => 0,
            Status::Open => 1,
            Status::Closing => 2,
            Status::Closed => 3,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Status::Open)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NotInitialized => "not initialized",
            Status::Connecting => "connecting",
            Status::Open => "open",
            Status::Closing => "closing",
            Status::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Callback a plugin invokes for every [`TransportEvent`]
///
/// Called from the plugin's socket tasks, so it must be cheap and must not
/// block.
#[derive(Clone)]
pub struct Notifier(Arc<dyn Fn(TransportEvent) + Send + Sync>);

impl Notifier {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(TransportEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A notifier that drops every event
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn notify(&self, event: TransportEvent) {
        (self.0)(event)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Notifier(..)")
    }
}

/// A network backend for OSC packets
///
/// Plugins never decode; they hand raw bytes to the registered notifier and
/// send the bytes they are given.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Per-call override for [`Plugin::open`]
    type OpenOptions: Send + 'static;
    /// Per-call override for [`Plugin::send`]
    type SendOptions: Send + 'static;

    /// Install the receiver of this plugin's events, replacing any previous one
    fn register_notify(&self, notify: Notifier);

    /// Current connection status
    fn status(&self) -> Status;

    /// Bind or connect; `options` replace the configured defaults for this call
    async fn open(&self, options: Option<Self::OpenOptions>) -> Result<()>;

    /// Tear the connection down
    async fn close(&self) -> Result<()>;

    /// Transmit one packed packet
    async fn send(&self, data: Bytes, options: Option<Self::SendOptions>) -> Result<()>;
}
