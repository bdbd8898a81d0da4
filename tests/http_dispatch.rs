//! End-to-end tests for the HTTP dispatcher against a local socket.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use beltsight::{ClassificationEvent, EventDispatcher, HttpDispatcher};

fn event() -> ClassificationEvent {
    ClassificationEvent {
        classification: "Buen Estado".to_string(),
        confidence: 0.92,
        device_id: "Laptop_Faja_Principal".to_string(),
    }
}

/// Read one HTTP request off the stream and return its body.
fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut buf).expect("read request");
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let headers = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    while raw.len() < header_end + content_length {
        let n = stream.read(&mut buf).expect("read body");
        raw.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&raw[header_end..header_end + content_length]).to_string()
}

/// Serve exactly one request with the given status line, handing the
/// request body back over a channel.
fn one_shot_server(status_line: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/classify", listener.local_addr().expect("addr"));
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let body = read_request(&mut stream);
        let _ = tx.send(body);
        let response = format!("{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_line);
        let _ = stream.write_all(response.as_bytes());
    });
    (url, rx)
}

#[test]
fn http_200_is_success_and_carries_the_json_payload() {
    let (url, body_rx) = one_shot_server("HTTP/1.1 200 OK");
    let dispatcher = HttpDispatcher::new(&url, HttpDispatcher::DEFAULT_TIMEOUT).expect("dispatcher");

    let outcome = dispatcher.send(&event());
    assert!(outcome.success);
    assert_eq!(outcome.status, Some(200));
    assert!(outcome.error.is_none());

    let body = body_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("request body");
    let value: serde_json::Value = serde_json::from_str(&body).expect("json body");
    assert_eq!(value["classification"], "Buen Estado");
    assert_eq!(value["device_id"], "Laptop_Faja_Principal");
    assert!((value["confidence"].as_f64().expect("confidence") - 0.92).abs() < 1e-6);
}

#[test]
fn non_200_status_is_a_failed_outcome() {
    let (url, _body_rx) = one_shot_server("HTTP/1.1 500 Internal Server Error");
    let dispatcher = HttpDispatcher::new(&url, HttpDispatcher::DEFAULT_TIMEOUT).expect("dispatcher");

    let outcome = dispatcher.send(&event());
    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(500));
    assert!(outcome.error.is_some());
}

#[test]
fn created_status_is_not_success() {
    // The endpoint contract is exactly 200, not any 2xx.
    let (url, _body_rx) = one_shot_server("HTTP/1.1 201 Created");
    let dispatcher = HttpDispatcher::new(&url, HttpDispatcher::DEFAULT_TIMEOUT).expect("dispatcher");

    let outcome = dispatcher.send(&event());
    assert!(!outcome.success);
    assert_eq!(outcome.status, Some(201));
}

#[test]
fn connection_refused_is_a_transport_failure() {
    // Bind to grab a free port, then drop the listener before dispatching.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/classify", listener.local_addr().expect("addr"));
    drop(listener);

    let dispatcher = HttpDispatcher::new(&url, Duration::from_millis(500)).expect("dispatcher");
    let outcome = dispatcher.send(&event());
    assert!(!outcome.success);
    assert_eq!(outcome.status, None);
    assert!(outcome.error.is_some());
}

#[test]
fn unresponsive_endpoint_fails_within_the_timeout() {
    // Accept the connection but never respond.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/classify", listener.local_addr().expect("addr"));
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        thread::sleep(Duration::from_secs(2));
        drop(stream);
    });

    let dispatcher = HttpDispatcher::new(&url, Duration::from_millis(250)).expect("dispatcher");
    let started = std::time::Instant::now();
    let outcome = dispatcher.send(&event());

    assert!(!outcome.success);
    assert_eq!(outcome.status, None);
    assert!(started.elapsed() < Duration::from_secs(2));
    let _ = handle.join();
}
