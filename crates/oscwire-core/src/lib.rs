//! oscwire Core
//!
//! Open Sound Control 1.0 wire format and address primitives.
//!
//! This crate provides:
//! - Atomic data types and their padded big-endian encoding ([`atomic`])
//! - Typed message arguments ([`Argument`])
//! - NTP time tags ([`Timetag`])
//! - Messages, bundles and the packet discriminator ([`Message`], [`Bundle`], [`Packet`])
//! - Address normalization and glob pattern matching ([`address`])
//!
//! Everything here is synchronous; scheduling and transport live in
//! `oscwire-client` and `oscwire-transport`.

pub mod address;
pub mod atomic;
pub mod bundle;
pub mod error;
pub mod message;
pub mod packet;
pub mod timetag;
pub mod types;

pub use address::{prepare_address, Pattern, ToAddress};
pub use atomic::{pad, Atomic};
pub use bundle::{Bundle, BUNDLE_TAG};
pub use error::{Error, Result};
pub use message::Message;
pub use packet::Packet;
pub use timetag::Timetag;
pub use types::Argument;

/// Default UDP port the datagram plugin binds to
pub const DEFAULT_UDP_LISTEN_PORT: u16 = 41234;

/// Default UDP port the datagram plugin sends to
pub const DEFAULT_UDP_SEND_PORT: u16 = 41235;

/// Default WebSocket port
pub const DEFAULT_WS_PORT: u16 = 8080;
