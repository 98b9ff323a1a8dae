// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Tokio side of the live connection: WebSocket tasks, retry timers and graph fetches.
//!
//! Everything here reports back over one unbounded channel of [`LiveEvent`]s, which the UI loop
//! drains between frames.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use crate::backend::{GraphClient, GraphSource, ReloadError};
use crate::channel::{ChannelName, ChannelTransport, LifecycleEvent, Ticket};

#[derive(Debug)]
pub enum LiveEvent {
    Lifecycle { channel: String, ticket: Ticket, event: LifecycleEvent },
    RetryDue { channel: String, ticket: Ticket },
    GraphFetched(Result<GraphSource, ReloadError>),
}

pub type LiveSender = UnboundedSender<LiveEvent>;

/// How long a requested close waits for the close handshake before dropping the socket.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// One open socket task. Dropping it also asks the task to close.
#[derive(Debug)]
pub struct SocketHandle {
    task: JoinHandle<()>,
    close: oneshot::Sender<()>,
}

impl SocketHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// [`ChannelTransport`] backed by `tokio-tungstenite`.
#[derive(Debug)]
pub struct WsTransport {
    runtime: Handle,
    events: LiveSender,
    timers: Vec<JoinHandle<()>>,
}

impl WsTransport {
    pub fn new(runtime: Handle, events: LiveSender) -> Self {
        Self { runtime, events, timers: Vec::new() }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.iter().filter(|timer| !timer.is_finished()).count()
    }
}

impl ChannelTransport for WsTransport {
    type Handle = SocketHandle;

    fn open(&mut self, channel: &ChannelName, url: &str, ticket: Ticket) -> Self::Handle {
        let (close, close_rx) = oneshot::channel();
        let socket =
            run_socket(channel.to_string(), url.to_owned(), ticket, self.events.clone(), close_rx);
        SocketHandle { task: self.runtime.spawn(socket), close }
    }

    /// Sends a close frame and ends the task. A requested close reports nothing back.
    fn close(&mut self, handle: Self::Handle) {
        let _ = handle.close.send(());
    }

    fn schedule_retry(&mut self, channel: &ChannelName, delay: Duration, ticket: Ticket) {
        self.timers.retain(|timer| !timer.is_finished());
        let channel = channel.to_string();
        let events = self.events.clone();
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(LiveEvent::RetryDue { channel, ticket });
        });
        self.timers.push(timer);
    }

    fn cancel_pending(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

/// One connection attempt. A failed handshake reports an error and then a close, so the state
/// machine sees the same sequence as for a connection that dropped.
async fn run_socket(
    channel: String,
    url: String,
    ticket: Ticket,
    events: LiveSender,
    mut close_rx: oneshot::Receiver<()>,
) {
    let emit = |event: LifecycleEvent| {
        events.send(LiveEvent::Lifecycle { channel: channel.clone(), ticket, event }).is_ok()
    };

    let connected = tokio::select! {
        connected = connect_async(url.as_str()) => connected,
        _ = &mut close_rx => return,
    };
    let mut socket = match connected {
        Ok((socket, _response)) => socket,
        Err(err) => {
            debug!(%channel, %url, %err, "channel handshake failed");
            emit(LifecycleEvent::Error(err.to_string()));
            emit(LifecycleEvent::Closed);
            return;
        }
    };
    if !emit(LifecycleEvent::Opened) {
        return;
    }

    loop {
        tokio::select! {
            message = socket.next() => match message {
                Some(Ok(WsMessage::Text(text))) => {
                    if !emit(LifecycleEvent::Message(text)) {
                        return;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    emit(LifecycleEvent::Error(err.to_string()));
                    break;
                }
            },
            _ = &mut close_rx => {
                match tokio::time::timeout(CLOSE_TIMEOUT, socket.close(None)).await {
                    Ok(Ok(())) => debug!(%channel, "channel closed"),
                    Ok(Err(err)) => debug!(%channel, %err, "channel close failed"),
                    Err(_) => debug!(%channel, "channel close timed out"),
                }
                return;
            }
        }
    }
    emit(LifecycleEvent::Closed);
}

/// Fetches the graph in the background and posts the outcome as [`LiveEvent::GraphFetched`].
pub fn spawn_reload(runtime: &Handle, client: GraphClient, events: LiveSender) -> JoinHandle<()> {
    runtime.spawn(async move {
        let result = client.fetch_graph().await;
        if let Err(err) = &result {
            warn!(url = client.graph_url(), %err, "graph fetch failed");
        }
        let _ = events.send(LiveEvent::GraphFetched(result));
    })
}
