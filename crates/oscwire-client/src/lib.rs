//! oscwire Client Library
//!
//! Address-pattern dispatch and a small facade over a transport plugin.
//!
//! # Example
//!
//! ```ignore
//! use oscwire_client::prelude::*;
//! use oscwire_transport::UdpPlugin;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let osc = Osc::new(UdpPlugin::new());
//!
//!     osc.on("/synth/1/cutoff", |data| {
//!         println!("cutoff = {:?}", data.args());
//!     })?;
//!
//!     osc.open(None).await?;
//!     osc.send(Message::new("/synth/1/cutoff", [Argument::Float(0.5)]), None).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod events;
pub mod options;
pub mod osc;

pub use builder::OscBuilder;
pub use error::{ClientError, Result};
pub use events::{Callback, EventData, EventHandler, EventKind, Target};
pub use options::OscOptions;
pub use osc::Osc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::OscBuilder;
    pub use crate::error::{ClientError, Result};
    pub use crate::events::{EventData, EventHandler, EventKind, Target};
    pub use crate::options::OscOptions;
    pub use crate::osc::Osc;
    pub use oscwire_core::{Argument, Bundle, Message, Packet, Timetag};
}
