//! Host/port pairs used by plugin configuration

use std::fmt;

use serde::{Deserialize, Serialize};

/// A network endpoint given as host name (or IP literal) and port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `localhost:<port>`
    pub fn localhost(port: u16) -> Self {
        Self::new("localhost", port)
    }

    /// Borrowed form accepted by tokio's bind/connect/send_to
    pub fn as_pair(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
