//! The `Osc` facade: a dispatcher wired to one transport plugin

use std::sync::Arc;

use oscwire_core::Packet;
use oscwire_transport::{Notifier, Plugin, Status};
use tracing::debug;

use crate::builder::OscBuilder;
use crate::error::Result;
use crate::events::{EventData, EventHandler, Target};
use crate::options::OscOptions;

/// OSC endpoint over a transport plugin
///
/// Incoming packets from the plugin are decoded and dispatched to
/// listeners registered with [`Osc::on`]; [`Osc::send`] packs and hands
/// packets to the plugin.
pub struct Osc<P: Plugin> {
    plugin: Arc<P>,
    events: EventHandler,
}

impl<P: Plugin + 'static> Osc<P> {
    /// Wire `plugin` to a dispatcher with default options
    pub fn new(plugin: P) -> Self {
        Self::with_options(plugin, OscOptions::default())
    }

    pub fn with_options(plugin: P, options: OscOptions) -> Self {
        let events = EventHandler::new(options);

        let handler = events.clone();
        plugin.register_notify(Notifier::new(move |event| {
            handler.notify_event(event);
        }));

        Self {
            plugin: Arc::new(plugin),
            events,
        }
    }

    pub fn builder(plugin: P) -> OscBuilder<P> {
        OscBuilder::new(plugin)
    }

    /// Register a listener for an address or a named event
    pub fn on<F>(&self, target: impl Into<Target>, callback: F) -> Result<u64>
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        self.events.on(target, callback)
    }

    /// Remove a listener by subscription id
    pub fn off(&self, target: impl Into<Target>, id: u64) -> bool {
        self.events.off(target, id)
    }

    /// Open the plugin; `options` replace its configured defaults for this call
    pub async fn open(&self, options: Option<P::OpenOptions>) -> Result<()> {
        self.plugin.open(options).await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.plugin.close().await?;
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.plugin.status()
    }

    /// Pack a message, bundle or packet and send it through the plugin
    pub async fn send(
        &self,
        packet: impl Into<Packet>,
        options: Option<P::SendOptions>,
    ) -> Result<()> {
        let bytes = packet.into().pack()?;
        debug!("Sending {} bytes", bytes.len());
        self.plugin.send(bytes, options).await?;
        Ok(())
    }

    /// The dispatcher, for direct `notify`/`dispatch` calls
    pub fn events(&self) -> &EventHandler {
        &self.events
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }
}

impl<P: Plugin> std::fmt::Debug for Osc<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Osc")
            .field("status", &self.plugin.status())
            .field("events", &self.events)
            .finish()
    }
}
