//! Osc Facade Tests (oscwire-client)
//!
//! - Plugin events routed to named listeners
//! - Packets sent through the plugin
//! - End-to-end over UDP loopback

use async_trait::async_trait;
use bytes::Bytes;
use oscwire_client::{EventData, Osc};
use oscwire_core::{Argument, Bundle, Message, Packet, Timetag};
use oscwire_transport::{
    Endpoint, Notifier, Plugin, Status, TransportError, TransportEvent, UdpConfig, UdpPlugin,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

// ============================================================================
// Recording plugin
// ============================================================================

#[derive(Default)]
struct RecordingPlugin {
    notify: Mutex<Notifier>,
    status: Mutex<Status>,
    sent: Mutex<Vec<Bytes>>,
}

impl RecordingPlugin {
    fn inject(&self, event: TransportEvent) {
        let notify = self.notify.lock().clone();
        notify.notify(event);
    }
}

#[async_trait]
impl Plugin for RecordingPlugin {
    type OpenOptions = ();
    type SendOptions = ();

    fn register_notify(&self, notify: Notifier) {
        *self.notify.lock() = notify;
    }

    fn status(&self) -> Status {
        *self.status.lock()
    }

    async fn open(&self, _options: Option<()>) -> oscwire_transport::Result<()> {
        *self.status.lock() = Status::Open;
        self.inject(TransportEvent::Connected);
        Ok(())
    }

    async fn close(&self) -> oscwire_transport::Result<()> {
        *self.status.lock() = Status::Closed;
        self.inject(TransportEvent::Disconnected { reason: None });
        Ok(())
    }

    async fn send(&self, data: Bytes, _options: Option<()>) -> oscwire_transport::Result<()> {
        if *self.status.lock() != Status::Open {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(data);
        Ok(())
    }
}

// ============================================================================
// Facade with a recording plugin
// ============================================================================

#[tokio::test]
async fn test_open_close_events() {
    let osc = Osc::new(RecordingPlugin::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    for name in ["open", "close"] {
        let log = log.clone();
        osc.on(name, move |_| log.lock().push(name)).unwrap();
    }

    assert_eq!(osc.status(), Status::NotInitialized);
    osc.open(None).await.unwrap();
    assert_eq!(osc.status(), Status::Open);
    osc.close().await.unwrap();

    assert_eq!(*log.lock(), vec!["open", "close"]);
}

#[tokio::test]
async fn test_send_packs_packets() {
    let osc = Osc::new(RecordingPlugin::default());
    osc.open(None).await.unwrap();

    let message = Message::new("/test/path", [Argument::Int(653)]);
    osc.send(message.clone(), None).await.unwrap();
    osc.send(Bundle::at(Timetag::IMMEDIATE), None).await.unwrap();

    let sent = osc.plugin().sent.lock().clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(Message::decode(&sent[0]).unwrap(), message);
    assert!(matches!(Packet::decode(&sent[1]).unwrap(), Packet::Bundle(_)));
}

#[tokio::test]
async fn test_send_invalid_message_fails_before_plugin() {
    let osc = Osc::new(RecordingPlugin::default());
    osc.open(None).await.unwrap();

    let err = osc.send(Message::new("", []), None).await.unwrap_err();
    assert!(err.as_osc().map(|e| e.is_encode()).unwrap_or(false));
    assert!(osc.plugin().sent.lock().is_empty());
}

#[tokio::test]
async fn test_send_when_closed() {
    let osc = Osc::new(RecordingPlugin::default());
    let err = osc.send(Message::new("/a", []), None).await.unwrap_err();
    assert!(err.as_osc().is_none());
}

#[tokio::test]
async fn test_incoming_data_dispatches() {
    let osc = Osc::new(RecordingPlugin::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    osc.on("/in", move |data: &EventData| sink.lock().push(data.args().to_vec()))
        .unwrap();

    let packet = Message::new("/in", [Argument::Float(0.5)]).pack().unwrap();
    osc.plugin().inject(TransportEvent::Data(packet));

    assert_eq!(*seen.lock(), vec![vec![Argument::Float(0.5)]]);
}

#[tokio::test]
async fn test_builder_options() {
    let osc = Osc::builder(RecordingPlugin::default())
        .discard_late_messages(true)
        .build();
    assert!(osc.events().options().discard_late_messages);
}

// ============================================================================
// End-to-end over UDP
// ============================================================================

#[tokio::test]
async fn test_udp_loopback() {
    let receiver = Osc::new(UdpPlugin::with_config(UdpConfig {
        open: Endpoint::new("127.0.0.1", 0),
        ..UdpConfig::default()
    }));
    let (tx, mut rx) = mpsc::unbounded_channel();
    receiver
        .on("/mixer/1/gain", move |data| {
            let _ = tx.send(data.args().to_vec());
        })
        .unwrap();
    receiver.open(None).await.unwrap();
    let port = receiver.plugin().local_addr().unwrap().port();

    let sender = Osc::new(UdpPlugin::with_config(UdpConfig {
        open: Endpoint::new("127.0.0.1", 0),
        send: Endpoint::new("127.0.0.1", port),
        ..UdpConfig::default()
    }));
    sender.open(None).await.unwrap();
    sender
        .send(Message::new("/mixer/*/gain", [Argument::Float(0.8)]), None)
        .await
        .unwrap();

    let args = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("nothing received")
        .unwrap();
    assert_eq!(args, vec![Argument::Float(0.8)]);
}
