//! Osc builder pattern

use oscwire_transport::Plugin;

use crate::options::OscOptions;
use crate::Osc;

/// Builder for [`Osc`]
pub struct OscBuilder<P> {
    plugin: P,
    options: OscOptions,
}

impl<P: Plugin + 'static> OscBuilder<P> {
    pub fn new(plugin: P) -> Self {
        Self {
            plugin,
            options: OscOptions::default(),
        }
    }

    /// Replace all options
    pub fn options(mut self, options: OscOptions) -> Self {
        self.options = options;
        self
    }

    /// Drop messages whose timetag has passed instead of delivering them late
    pub fn discard_late_messages(mut self, enabled: bool) -> Self {
        self.options.discard_late_messages = enabled;
        self
    }

    pub fn build(self) -> Osc<P> {
        Osc::with_options(self.plugin, self.options)
    }
}
