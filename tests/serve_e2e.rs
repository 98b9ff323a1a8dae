// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::StreamExt;
use livegraph::backend::GraphClient;
use livegraph::channel::{ChannelName, Envelope};
use livegraph::serve::{serve_on, PreviewState};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

static TEMP_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(contents: &str) -> Self {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut path = std::env::temp_dir();
        path.push(format!("livegraph-e2e-{}-{nanos}-{counter}.mmd", std::process::id()));
        std::fs::write(&path, contents).expect("write temp file");
        Self { path }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn start_server(file: &TempFile) -> SocketAddr {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let channels = ["file_changes", "node_execution"]
        .into_iter()
        .map(|name| ChannelName::new(name).expect("channel name"))
        .collect();
    let state = PreviewState::new(file.path.clone(), channels);
    tokio::spawn(serve_on(listener, state, std::future::pending()));
    addr
}

#[tokio::test]
async fn graph_endpoint_serves_file_contents() {
    let file = TempFile::new("graph TD\n  A-->B\n");
    let addr = start_server(&file).await;

    let source = GraphClient::new(&format!("http://{addr}")).fetch_graph().await.expect("fetch");

    assert_eq!(source.code, "graph TD\n  A-->B\n");
}

#[tokio::test]
async fn published_signal_reaches_channel_subscriber() {
    let file = TempFile::new("graph TD\n  A-->B\n");
    let addr = start_server(&file).await;

    let (mut socket, _) = connect_async(format!("ws://{addr}/ws/node_execution/subscribe"))
        .await
        .expect("subscribe");

    let http = reqwest::Client::new();
    let other = http
        .post(format!("http://{addr}/ws/file_changes/publish"))
        .json(&json!({"type": "modified"}))
        .send()
        .await
        .expect("publish to other channel");
    assert_eq!(other.status(), reqwest::StatusCode::ACCEPTED);

    let response = http
        .post(format!("http://{addr}/ws/node_execution/publish"))
        .json(&json!({"node": "plan", "status": "running"}))
        .send()
        .await
        .expect("publish");
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    let body: Value = response.json().await.expect("publish body");
    assert_eq!(body["receivers"], json!(1));

    let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("frame before timeout")
        .expect("open stream")
        .expect("frame");
    let text = match frame {
        Message::Text(text) => text,
        other => panic!("expected a text frame, got {other:?}"),
    };

    let envelope = Envelope::parse(&text).expect("envelope");
    assert_eq!(envelope.channel(), Some("node_execution"));
    assert_eq!(envelope.get("metadata"), Some(&json!({"node": "plan", "status": "running"})));
    assert_eq!(envelope.get("id"), body.get("id"));
}

#[tokio::test]
async fn unknown_channels_are_not_found() {
    let file = TempFile::new("graph TD\n");
    let addr = start_server(&file).await;
    let http = reqwest::Client::new();

    let subscribe = http
        .get(format!("http://{addr}/ws/nope/subscribe"))
        .send()
        .await
        .expect("request");
    assert_eq!(subscribe.status(), reqwest::StatusCode::NOT_FOUND);

    let publish = http
        .post(format!("http://{addr}/ws/nope/publish"))
        .json(&json!({}))
        .send()
        .await
        .expect("request");
    assert_eq!(publish.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_file_is_a_server_error() {
    let file = TempFile::new("graph TD\n");
    let addr = start_server(&file).await;
    std::fs::remove_file(&file.path).expect("remove file");

    let response = reqwest::get(format!("http://{addr}/graph")).await.expect("request");

    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.expect("error body");
    assert!(body["error"].is_string());
}
