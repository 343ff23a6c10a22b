//! TOML configuration file

use std::path::Path;

use anyhow::{Context, Result};
use oscwire_client::OscOptions;
use oscwire_transport::{BridgeConfig, UdpConfig, WsClientConfig, WsServerConfig};
use serde::Deserialize;

/// Every section is optional; missing values fall back to plugin defaults
///
/// ```toml
/// [osc]
/// discard_late_messages = true
///
/// [udp.open]
/// host = "0.0.0.0"
/// port = 9000
///
/// [bridge]
/// receiver = "udp"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub osc: OscOptions,
    pub udp: UdpConfig,
    pub websocket: WsClientConfig,
    pub server: WsServerConfig,
    pub bridge: BridgeConfig,
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscwire_transport::{Endpoint, Receiver};

    #[test]
    fn test_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.udp, UdpConfig::default());
        assert!(!config.osc.discard_late_messages);
    }

    #[test]
    fn test_sections() {
        let config = Config::parse(
            r#"
            [osc]
            discard_late_messages = true

            [udp.send]
            host = "10.0.0.5"
            port = 9001

            [websocket]
            secure = true

            [server]
            port = 9090

            [bridge]
            receiver = "udp"

            [bridge.udp_client]
            host = "127.0.0.1"
            port = 7000
            "#,
        )
        .unwrap();

        assert!(config.osc.discard_late_messages);
        assert_eq!(config.udp.send, Endpoint::new("10.0.0.5", 9001));
        assert_eq!(config.udp.open, Endpoint::localhost(41234));
        assert!(config.websocket.secure);
        assert_eq!(config.websocket.port, 8080);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.bridge.receiver, Receiver::Udp);
        assert_eq!(config.bridge.udp_client, Endpoint::new("127.0.0.1", 7000));
    }

    #[test]
    fn test_unknown_receiver() {
        assert!(Config::parse("[bridge]\nreceiver = \"tcp\"\n").is_err());
    }
}
