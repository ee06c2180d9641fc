//! Bind a real socket, serve a request, and shut down on demand.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use celestial_core::{NewEvent, Store};
use celestial_server::http::AppState;
use celestial_server::server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_until_shutdown() {
    let store = Store::new();
    store.emit(NewEvent::new("genesis")).unwrap();
    let state = Arc::new(AppState::new(store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(server::serve(
        listener,
        state,
        async move {
            let _ = stop_rx.await;
        },
        Duration::from_secs(1),
    ));

    let response = raw_get(addr, "/healthz").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""events":1"#), "{response}");

    let response = raw_get(addr, "/event/0").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn open_streams_do_not_block_shutdown_past_grace() {
    let state = Arc::new(AppState::new(Store::new()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(server::serve(
        listener,
        Arc::clone(&state),
        async move {
            let _ = stop_rx.await;
        },
        Duration::from_millis(200),
    ));

    // An SSE client that never disconnects on its own.
    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /subscribe HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut buf = [0_u8; 256];
    let n = client.read(&mut buf).await.unwrap();
    assert!(std::str::from_utf8(&buf[..n]).unwrap().starts_with("HTTP/1.1 200"));

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn run_rejects_a_bad_address() {
    let config = celestial_server::ServerConfig {
        http_addr: Some("definitely not an address".into()),
        ..celestial_server::ServerConfig::default()
    };
    let state = Arc::new(AppState::new(Store::new()));
    let err = server::run(&config, state).await.unwrap_err();
    assert!(matches!(err, server::ServerError::Bind(_)));
}

#[tokio::test]
async fn bind_resolves_host_names() {
    let config = celestial_server::ServerConfig {
        host: "localhost".into(),
        http_port: 0,
        ..celestial_server::ServerConfig::default()
    };
    let listener = server::bind(&config).await.unwrap();
    assert!(listener.local_addr().unwrap().ip().is_loopback());
}
