// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Local preview server.
//!
//! Serves one diagram file over `GET /graph` and fans out signals per channel over
//! `GET /ws/{channel}/subscribe`. Edits to the file are announced on `file_changes`; anything
//! POSTed to `/ws/{channel}/publish` is forwarded to that channel's subscribers.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::GraphSource;
use crate::channel::ChannelName;
use crate::config::FILE_CHANGES_CHANNEL;

pub const DEFAULT_PORT: u16 = 8402;
pub const WATCH_INTERVAL: Duration = Duration::from_millis(500);
const BROADCAST_CAPACITY: usize = 256;

/// One message on a channel, as subscribers receive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub channel: String,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub metadata: Value,
}

impl Signal {
    pub fn new(channel: &ChannelName, metadata: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            channel: channel.to_string(),
            timestamp: unix_millis(),
            metadata,
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct PreviewState {
    file: Arc<PathBuf>,
    channels: Arc<Vec<ChannelName>>,
    watch_channel: Option<ChannelName>,
    signals: broadcast::Sender<Signal>,
}

impl PreviewState {
    /// File edits are announced on `file_changes` when that channel is served.
    pub fn new(file: impl Into<PathBuf>, channels: Vec<ChannelName>) -> Self {
        let (signals, _) = broadcast::channel(BROADCAST_CAPACITY);
        let watch_channel =
            channels.iter().find(|channel| channel.as_str() == FILE_CHANGES_CHANNEL).cloned();
        Self { file: Arc::new(file.into()), channels: Arc::new(channels), watch_channel, signals }
    }

    /// Announces file edits on `channel` instead. Ignored unless `channel` is served.
    pub fn with_watch_channel(mut self, channel: &ChannelName) -> Self {
        self.watch_channel = self.channel(channel.as_str()).cloned();
        self
    }

    pub fn watch_channel(&self) -> Option<&ChannelName> {
        self.watch_channel.as_ref()
    }

    pub fn file(&self) -> &FsPath {
        &self.file
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelName> {
        self.channels.iter().find(|channel| channel.as_str() == name)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// Broadcasts a signal and returns it together with the number of subscribers reached.
    pub fn publish(&self, channel: &ChannelName, metadata: Value) -> (Signal, usize) {
        let signal = Signal::new(channel, metadata);
        let receivers = self.signals.send(signal.clone()).unwrap_or(0);
        debug!(channel = %channel, id = %signal.id, receivers, "signal published");
        (signal, receivers)
    }
}

pub fn router(state: PreviewState) -> Router {
    Router::new()
        .route("/graph", get(get_graph))
        .route("/ws/{channel}/subscribe", get(subscribe))
        .route("/ws/{channel}/publish", post(publish))
        .with_state(state)
}

async fn get_graph(State(state): State<PreviewState>) -> Response {
    match tokio::fs::read_to_string(state.file()).await {
        Ok(code) => Json(GraphSource { code }).into_response(),
        Err(err) => {
            warn!(file = %state.file().display(), %err, "failed to read diagram file");
            let body = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn unknown_channel(channel: &str) -> Response {
    let body = json!({ "error": format!("unknown channel '{channel}'") });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

async fn subscribe(
    Path(channel): Path<String>,
    State(state): State<PreviewState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(channel) = state.channel(&channel).cloned() else {
        return unknown_channel(&channel);
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };
    let signals = state.subscribe();
    upgrade.on_upgrade(move |socket| stream_signals(socket, channel, signals))
}

async fn stream_signals(
    socket: WebSocket,
    channel: ChannelName,
    mut signals: broadcast::Receiver<Signal>,
) {
    info!(channel = %channel, "subscriber connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Ok(signal) if signal.channel == channel.as_str() => {
                    let text = match serde_json::to_string(&signal) {
                        Ok(text) => text,
                        Err(err) => {
                            error!(channel = %channel, %err, "failed to encode signal");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %channel, skipped, "subscriber lagging; signals skipped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!(channel = %channel, "subscriber disconnected");
}

async fn publish(
    Path(channel): Path<String>,
    State(state): State<PreviewState>,
    Json(metadata): Json<Value>,
) -> Response {
    let Some(channel) = state.channel(&channel) else {
        return unknown_channel(&channel);
    };
    let (signal, receivers) = state.publish(channel, metadata);
    let body = json!({ "id": signal.id, "receivers": receivers });
    (StatusCode::ACCEPTED, Json(body)).into_response()
}

async fn modified_at(path: &FsPath) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Polls the diagram file and announces every change of its modification time on the watch
/// channel. Does nothing when there is none.
pub async fn watch_file(state: PreviewState, interval: Duration) {
    let Some(channel) = state.watch_channel().cloned() else {
        warn!("no watch channel served; file watcher disabled");
        return;
    };
    let mut last = modified_at(state.file()).await;
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;
        let current = modified_at(state.file()).await;
        if current.is_some() && current != last {
            last = current;
            info!(file = %state.file().display(), "diagram file changed");
            let path = state.file().display().to_string();
            state.publish(&channel, json!({ "type": "modified", "path": path }));
        }
    }
}

/// Serves `state` on `listener` until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    state: PreviewState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServeError> {
    let addr = listener.local_addr().map_err(ServeError::Io)?;
    info!(%addr, file = %state.file().display(), "preview server listening");

    let watcher = tokio::spawn(watch_file(state.clone(), WATCH_INTERVAL));
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServeError::Io);
    watcher.abort();
    info!("preview server stopped");
    result
}

/// Serves `file` on `127.0.0.1:<port>` until Ctrl+C, announcing edits on `watch_channel`.
pub async fn serve(
    file: PathBuf,
    port: u16,
    channels: Vec<ChannelName>,
    watch_channel: &ChannelName,
) -> Result<(), ServeError> {
    if !file.is_file() {
        return Err(ServeError::MissingFile(file));
    }
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|source| ServeError::Bind { port, source })?;
    let state = PreviewState::new(file, channels).with_watch_channel(watch_channel);
    serve_on(listener, state, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "failed to listen for Ctrl+C");
        }
    })
    .await
}

#[derive(Debug)]
pub enum ServeError {
    MissingFile(PathBuf),
    Bind { port: u16, source: io::Error },
    Io(io::Error),
}

impl fmt::Display for ServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile(path) => write!(f, "diagram file not found: {}", path.display()),
            Self::Bind { port, source } => write!(f, "failed to bind port {port}: {source}"),
            Self::Io(err) => write!(f, "preview server error: {err}"),
        }
    }
}

impl std::error::Error for ServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MissingFile(_) => None,
            Self::Bind { source, .. } => Some(source),
            Self::Io(err) => Some(err),
        }
    }
}
