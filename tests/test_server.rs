//! End-to-end tests: raw TCP client → relay server → raw TCP stub upstream

use harmonia_relay::config::RelayConfig;
use harmonia_relay::relay::{HttpFetcher, RelayHandler};
use harmonia_relay::server::listener::serve;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Serves one canned response and hands back the request head it received.
async fn stub_upstream(response: Vec<u8>) -> (SocketAddr, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];

        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }

        socket.write_all(&response).await.unwrap();
        socket.shutdown().await.unwrap();
        let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
    });

    (addr, rx)
}

async fn start_relay(upstream_base: String) -> SocketAddr {
    start_relay_with(RelayConfig {
        upstream_base,
        ..RelayConfig::default()
    })
    .await
}

async fn start_relay_with(config: RelayConfig) -> SocketAddr {
    let client = HttpFetcher::client_builder(&config).no_proxy().build().unwrap();
    let handler = Arc::new(RelayHandler::new(config, HttpFetcher::from_client(client)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, handler));
    addr
}

async fn roundtrip(addr: SocketAddr, raw_request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw_request).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

#[tokio::test]
async fn test_mapped_request_relayed_end_to_end() {
    let (upstream, seen) = stub_upstream(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: 7\r\nConnection: close\r\n\r\n{\"a\":1}".to_vec(),
    )
    .await;
    let relay = start_relay(format!("http://{upstream}/api.php")).await;

    let response = roundtrip(
        relay,
        b"GET /api/proxy?source=netease&id=123&bogus=ignored HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(response.contains("Access-Control-Allow-Methods: GET, OPTIONS\r\n"));
    assert!(response.contains("Content-Type: application/json\r\n"));
    assert!(response.ends_with("\r\n\r\n{\"a\":1}"));

    let head = seen.await.unwrap().to_ascii_lowercase();
    assert!(head.starts_with("get /api.php?source=netease&id=123 http/1.1\r\n"));
    assert!(head.contains("user-agent: harmonia-music-player/1.0\r\n"));
}

#[tokio::test]
async fn test_upstream_error_status_becomes_500_end_to_end() {
    let (upstream, _seen) = stub_upstream(
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
    )
    .await;
    let relay = start_relay(format!("http://{upstream}/api.php")).await;

    let response = roundtrip(relay, b"GET /?id=1 HTTP/1.1\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(response.ends_with(
        r#"{"error":"Proxy fetch failed","details":"API responded with status: 404"}"#
    ));
}

#[tokio::test]
async fn test_keep_alive_serves_multiple_requests() {
    let relay = start_relay("http://127.0.0.1:9/api.php".to_string()).await;

    let response = roundtrip(
        relay,
        b"OPTIONS / HTTP/1.1\r\n\r\nDELETE / HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    let preflight = response.find("HTTP/1.1 204 No Content\r\n").unwrap();
    let rejected = response.find("HTTP/1.1 405 Method Not Allowed\r\n").unwrap();
    assert!(preflight < rejected);
    assert!(response.contains("Access-Control-Max-Age: 86400\r\n"));
    assert!(response.ends_with(r#"{"error":"Method Not Allowed"}"#));
}

#[tokio::test]
async fn test_malformed_request_gets_400_and_close() {
    let relay = start_relay("http://127.0.0.1:9/api.php".to_string()).await;

    let response = roundtrip(relay, b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_redirect_off_allow_list_is_not_followed() {
    let (secret, secret_seen) = stub_upstream(
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 6\r\nConnection: close\r\n\r\nSECRET".to_vec(),
    )
    .await;
    let redirect = format!(
        "HTTP/1.1 302 Found\r\nLocation: http://localhost:{}/meta\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        secret.port()
    );
    let (allowed, _allowed_seen) = stub_upstream(redirect.into_bytes()).await;

    let relay = start_relay_with(RelayConfig {
        upstream_base: "http://127.0.0.1:9/api.php".to_string(),
        allowed_hosts: vec!["127.0.0.1".to_string()],
        ..RelayConfig::default()
    })
    .await;

    let request = format!(
        "GET /?url=http%3A%2F%2F127.0.0.1%3A{}%2Fstart HTTP/1.1\r\nConnection: close\r\n\r\n",
        allowed.port()
    );
    let response = roundtrip(relay, request.as_bytes()).await;

    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(response.contains(r#""error":"Proxy fetch failed""#));
    assert!(!response.contains("SECRET"));
    assert!(
        tokio::time::timeout(Duration::from_millis(300), secret_seen)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_redirect_within_allow_list_is_followed() {
    let (target, _target_seen) = stub_upstream(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}".to_vec(),
    )
    .await;
    let redirect = format!(
        "HTTP/1.1 302 Found\r\nLocation: http://127.0.0.1:{}/meta\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        target.port()
    );
    let (first, _first_seen) = stub_upstream(redirect.into_bytes()).await;

    let relay = start_relay_with(RelayConfig {
        upstream_base: "http://127.0.0.1:9/api.php".to_string(),
        allowed_hosts: vec!["127.0.0.1".to_string()],
        ..RelayConfig::default()
    })
    .await;

    let request = format!(
        "GET /?url=http%3A%2F%2F127.0.0.1%3A{}%2Fstart HTTP/1.1\r\nConnection: close\r\n\r\n",
        first.port()
    );
    let response = roundtrip(relay, request.as_bytes()).await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.ends_with("\r\n\r\n{}"));
}

#[tokio::test]
async fn test_chunked_request_gets_400_and_close() {
    let relay = start_relay("http://127.0.0.1:9/api.php".to_string()).await;

    let response = roundtrip(
        relay,
        b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(response.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_oversized_body_gets_413_without_waiting_for_it() {
    let relay = start_relay("http://127.0.0.1:9/api.php".to_string()).await;

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        roundtrip(
            relay,
            b"POST / HTTP/1.1\r\nContent-Length: 1000000000000\r\n\r\n",
        ),
    )
    .await
    .unwrap();

    assert!(response.starts_with("HTTP/1.1 413 Content Too Large\r\n"));
    assert!(response.contains("Connection: close\r\n"));
}
