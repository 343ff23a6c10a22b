//! WebSocket Plugin Tests (oscwire-transport)
//!
//! - Client connects to server
//! - Client to server delivery
//! - Server broadcast to every client
//! - Shutdown

use bytes::Bytes;
use oscwire_transport::{
    Notifier, Plugin, Status, TransportEvent, WsClientConfig, WsClientPlugin, WsServerConfig,
    WsServerPlugin,
};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

// ============================================================================
// Helpers
// ============================================================================

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

async fn start_server() -> (WsServerPlugin, mpsc::UnboundedReceiver<TransportEvent>, u16) {
    let server = WsServerPlugin::with_config(WsServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    });
    let (notifier, rx) = channel_notifier();
    server.register_notify(notifier);
    server.open(None).await.expect("server open failed");
    let port = server.local_addr().expect("no local addr").port();
    (server, rx, port)
}

async fn connect_client(port: u16) -> (WsClientPlugin, mpsc::UnboundedReceiver<TransportEvent>) {
    let client = WsClientPlugin::with_config(WsClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        secure: false,
    });
    let (notifier, rx) = channel_notifier();
    client.register_notify(notifier);
    client.open(None).await.expect("client open failed");
    (client, rx)
}

async fn wait_for_clients(server: &WsServerPlugin, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while server.client_count() < count {
        assert!(Instant::now() < deadline, "clients never registered");
        sleep(Duration::from_millis(10)).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_client_connects() {
    let (server, _server_rx, port) = start_server().await;
    let (client, _client_rx) = connect_client(port).await;

    assert_eq!(client.status(), Status::Open);
    wait_for_clients(&server, 1).await;
}

#[tokio::test]
async fn test_client_to_server() {
    let (_server, mut server_rx, port) = start_server().await;
    let (client, _client_rx) = connect_client(port).await;

    let packet = Bytes::from_static(b"/ws\0,s\0\0hi\0\0");
    client.send(packet.clone(), None).await.unwrap();

    assert_eq!(next_data(&mut server_rx).await, packet);
}

#[tokio::test]
async fn test_server_broadcasts() {
    let (server, _server_rx, port) = start_server().await;
    let (_a, mut a_rx) = connect_client(port).await;
    let (_b, mut b_rx) = connect_client(port).await;
    wait_for_clients(&server, 2).await;

    let packet = Bytes::from_static(b"/all\0\0\0\0,\0\0\0");
    server.send(packet.clone(), None).await.unwrap();

    assert_eq!(next_data(&mut a_rx).await, packet);
    assert_eq!(next_data(&mut b_rx).await, packet);
}

#[tokio::test]
async fn test_client_close() {
    let (_server, _server_rx, port) = start_server().await;
    let (client, mut client_rx) = connect_client(port).await;

    client.close().await.unwrap();
    assert_eq!(client.status(), Status::Closed);

    let mut saw_disconnect = false;
    while let Ok(Some(event)) = timeout(Duration::from_millis(200), client_rx.recv()).await {
        if matches!(event, TransportEvent::Disconnected { .. }) {
            saw_disconnect = true;
        }
    }
    assert!(saw_disconnect);
    assert!(client.send(Bytes::from_static(b"x\0\0\0"), None).await.is_err());
}

#[tokio::test]
async fn test_server_close_disconnects_clients() {
    let (server, _server_rx, port) = start_server().await;
    let (client, _client_rx) = connect_client(port).await;
    wait_for_clients(&server, 1).await;

    server.close().await.unwrap();
    assert_eq!(server.status(), Status::Closed);

    let deadline = Instant::now() + Duration::from_secs(2);
    while client.status() == Status::Open {
        assert!(Instant::now() < deadline, "client never saw the close");
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(client.status(), Status::Closed);
}
