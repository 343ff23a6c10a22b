//! oscwire Transport Plugins
//!
//! Plugins move raw OSC packets between the network and the dispatcher:
//! - UDP datagrams (bind one endpoint, send to another)
//! - WebSocket client
//! - WebSocket server (broadcasts to every connected client)
//! - UDP/WebSocket bridge (forwards between both sides)
//!
//! Every plugin implements [`Plugin`]; received bytes and status changes are
//! reported through the [`Notifier`] handed to [`Plugin::register_notify`].

pub mod endpoint;
pub mod error;
pub mod traits;

mod state;

#[cfg(feature = "udp")]
pub mod udp;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "websocket")]
pub mod server;

#[cfg(feature = "bridge")]
pub mod bridge;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use traits::{Notifier, Plugin, Status, TransportEvent};

#[cfg(feature = "udp")]
pub use udp::{UdpConfig, UdpPlugin};

#[cfg(feature = "websocket")]
pub use websocket::{WsClientConfig, WsClientPlugin};

#[cfg(feature = "websocket")]
pub use server::{WsServerConfig, WsServerPlugin};

#[cfg(feature = "bridge")]
pub use bridge::{BridgeConfig, BridgePlugin, Receiver};
