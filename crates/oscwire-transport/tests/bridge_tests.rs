//! Bridge Plugin Tests (oscwire-transport)
//!
//! - UDP datagrams reach WebSocket clients
//! - WebSocket frames reach the UDP client endpoint
//! - Both directions notify locally

use bytes::Bytes;
use oscwire_transport::{
    BridgeConfig, BridgePlugin, Endpoint, Notifier, Plugin, Receiver, TransportEvent,
    WsClientConfig, WsClientPlugin,
};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

fn channel_notifier() -> (Notifier, mpsc::UnboundedReceiver<TransportEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let notifier = Notifier::new(move |event| {
        let _ = tx.send(event);
    });
    (notifier, rx)
}

async fn next_data(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Bytes {
    loop {
        match timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(TransportEvent::Data(data))) => return data,
            Ok(Some(_)) => continue,
            Ok(None) => panic!("Notifier channel closed"),
            Err(_) => panic!("Timed out waiting for data"),
        }
    }
}

struct Harness {
    bridge: BridgePlugin,
    bridge_rx: mpsc::UnboundedReceiver<TransportEvent>,
    udp_peer: UdpSocket,
    ws_client: WsClientPlugin,
    ws_rx: mpsc::UnboundedReceiver<TransportEvent>,
}

async fn start() -> Harness {
    let udp_peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let peer_port = udp_peer.local_addr().unwrap().port();

    let bridge = BridgePlugin::with_config(BridgeConfig {
        udp_server: Endpoint::new("127.0.0.1", 0),
        udp_client: Endpoint::new("127.0.0.1", peer_port),
        ws_server: Endpoint::new("127.0.0.1", 0),
        receiver: Receiver::Ws,
    });
    let (notifier, bridge_rx) = channel_notifier();
    bridge.register_notify(notifier);
    bridge.open(None).await.expect("bridge open failed");

    let ws_client = WsClientPlugin::with_config(WsClientConfig {
        host: "127.0.0.1".to_string(),
        port: bridge.ws_addr().unwrap().port(),
        secure: false,
    });
    let (notifier, ws_rx) = channel_notifier();
    ws_client.register_notify(notifier);
    ws_client.open(None).await.expect("ws client open failed");

    let deadline = Instant::now() + Duration::from_secs(2);
    while bridge.client_count() < 1 {
        assert!(Instant::now() < deadline, "ws client never registered");
        sleep(Duration::from_millis(10)).await;
    }

    Harness {
        bridge,
        bridge_rx,
        udp_peer,
        ws_client,
        ws_rx,
    }
}

#[tokio::test]
async fn test_udp_to_websocket() {
    let mut h = start().await;
    let packet = Bytes::from_static(b"/udp\0\0\0\0,\0\0\0");

    h.udp_peer
        .send_to(&packet, h.bridge.udp_addr().unwrap())
        .await
        .unwrap();

    assert_eq!(next_data(&mut h.ws_rx).await, packet);
    assert_eq!(next_data(&mut h.bridge_rx).await, packet);
}

#[tokio::test]
async fn test_websocket_to_udp() {
    let mut h = start().await;
    let packet = Bytes::from_static(b"/ws\0,i\0\0\0\0\0\x01");

    h.ws_client.send(packet.clone(), None).await.unwrap();

    let mut buf = [0u8; 64];
    let (len, _) = timeout(Duration::from_secs(2), h.udp_peer.recv_from(&mut buf))
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(&buf[..len], packet.as_ref());
    assert_eq!(next_data(&mut h.bridge_rx).await, packet);
}

#[tokio::test]
async fn test_send_selects_receiver() {
    let mut h = start().await;

    let to_udp = Bytes::from_static(b"/u\0\0,\0\0\0");
    h.bridge.send(to_udp.clone(), Some(Receiver::Udp)).await.unwrap();
    let mut buf = [0u8; 64];
    let (len, _) = timeout(Duration::from_secs(2), h.udp_peer.recv_from(&mut buf))
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(&buf[..len], to_udp.as_ref());

    let to_ws = Bytes::from_static(b"/w\0\0,\0\0\0");
    h.bridge.send(to_ws.clone(), None).await.unwrap();
    assert_eq!(next_data(&mut h.ws_rx).await, to_ws);
}

#[test]
fn test_receiver_names() {
    let config: BridgeConfig = toml::from_str("receiver = \"udp\"").unwrap();
    assert_eq!(config.receiver, Receiver::Udp);
    assert_eq!(config.ws_server, Endpoint::localhost(8080));
}
