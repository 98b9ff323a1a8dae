// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Registry of channel connections and the dispatch of what they receive.

use std::time::Duration;

use tracing::{debug, info};

use super::{
    ChannelCommand, ChannelConnection, ChannelName, ChannelState, ChannelStatus, Envelope,
    LifecycleEvent, RetryPolicy, Ticket,
};

/// Performs the I/O the channel state machines ask for.
///
/// Implementations report lifecycle events and due retries back to the manager
/// ([`ConnectionManager::ingest`], [`ConnectionManager::retry_due`]) tagged with the ticket they
/// were given.
pub trait ChannelTransport {
    type Handle;

    fn open(&mut self, channel: &ChannelName, url: &str, ticket: Ticket) -> Self::Handle;

    fn close(&mut self, handle: Self::Handle);

    fn schedule_retry(&mut self, channel: &ChannelName, delay: Duration, ticket: Ticket);

    /// Drops every outstanding retry timer. Timers that still fire are ignored by the manager.
    fn cancel_pending(&mut self) {}
}

/// Receives what the channels produce.
pub trait ChannelEvents {
    /// Refetch and re-render the diagram.
    fn reload(&mut self);

    /// Any other tagged event, e.g. node execution telemetry.
    fn update(&mut self, channel: &ChannelName, envelope: Envelope);

    fn status(&mut self, channel: &ChannelName, status: ChannelStatus);
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub base_url: String,
    /// Logical channel whose events (and whose successful connection) trigger a reload.
    pub reload_channel: ChannelName,
    pub policy: RetryPolicy,
}

#[derive(Debug)]
struct ChannelEntry<H> {
    connection: ChannelConnection,
    handle: Option<H>,
}

pub struct ConnectionManager<T: ChannelTransport> {
    config: ManagerConfig,
    transport: T,
    registry: Vec<ChannelEntry<T::Handle>>,
}

impl<T: ChannelTransport> ConnectionManager<T> {
    pub fn new(config: ManagerConfig, transport: T) -> Self {
        Self { config, transport, registry: Vec::new() }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Registered channels in connection order.
    pub fn channel_names(&self) -> impl Iterator<Item = &ChannelName> {
        self.registry.iter().map(|entry| entry.connection.name())
    }

    pub fn connection(&self, channel: &str) -> Option<&ChannelConnection> {
        self.position(channel).map(|index| &self.registry[index].connection)
    }

    pub fn state(&self, channel: &str) -> Option<ChannelState> {
        self.connection(channel).map(ChannelConnection::state)
    }

    pub fn attempt_count(&self, channel: &str) -> Option<u32> {
        self.connection(channel).map(ChannelConnection::attempt_count)
    }

    /// Creates and starts one connection per name. Names already registered are skipped.
    pub fn connect<E: ChannelEvents>(
        &mut self,
        channels: impl IntoIterator<Item = ChannelName>,
        events: &mut E,
    ) {
        for name in channels {
            if self.position(name.as_str()).is_some() {
                debug!(channel = %name, "channel already connected");
                continue;
            }
            let primary = name == self.config.reload_channel;
            let connection =
                ChannelConnection::new(name, &self.config.base_url, self.config.policy, primary);
            self.registry.push(ChannelEntry { connection, handle: None });

            let index = self.registry.len() - 1;
            let commands = self.registry[index].connection.start();
            self.execute(index, commands, events);
        }
    }

    /// Feeds a lifecycle event from the transport. Unknown channels are ignored.
    pub fn ingest<E: ChannelEvents>(
        &mut self,
        channel: &str,
        ticket: Ticket,
        event: LifecycleEvent,
        events: &mut E,
    ) {
        let Some(index) = self.position(channel) else {
            debug!(channel, "event for unregistered channel");
            return;
        };
        let commands = self.registry[index].connection.handle(ticket, event);
        self.execute(index, commands, events);
    }

    /// A retry timer fired. After [`Self::shutdown`] this never reopens anything.
    pub fn retry_due<E: ChannelEvents>(&mut self, channel: &str, ticket: Ticket, events: &mut E) {
        let Some(index) = self.position(channel) else {
            debug!(channel, "retry for unregistered channel");
            return;
        };
        let commands = self.registry[index].connection.retry_due(ticket);
        self.execute(index, commands, events);
    }

    /// Routes an envelope by its logical `channel` tag, which may differ from the transport
    /// channel it arrived on.
    pub fn dispatch<E: ChannelEvents>(
        &self,
        channel: &ChannelName,
        envelope: Envelope,
        events: &mut E,
    ) {
        match envelope.channel() {
            Some(tag) if tag == self.config.reload_channel.as_str() => {
                debug!(channel = %channel, "reload requested");
                events.reload();
            }
            Some(tag) if self.position(tag).is_some() => events.update(channel, envelope),
            Some(tag) => debug!(channel = %channel, tag, "ignoring event for unknown channel"),
            None => debug!(channel = %channel, "ignoring untagged event"),
        }
    }

    pub fn status_report<E: ChannelEvents>(
        &self,
        channel: &ChannelName,
        status: ChannelStatus,
        events: &mut E,
    ) {
        debug!(channel = %channel, class = status.css_class(), "{}", status.text(channel));
        events.status(channel, status);
    }

    /// Closes every live connection and forgets all channels. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        for entry in self.registry.drain(..) {
            if let Some(handle) = entry.handle {
                self.transport.close(handle);
            }
        }
        self.transport.cancel_pending();
        info!("all channels shut down");
    }

    fn position(&self, channel: &str) -> Option<usize> {
        self.registry.iter().position(|entry| entry.connection.name().as_str() == channel)
    }

    fn execute<E: ChannelEvents>(
        &mut self,
        index: usize,
        commands: Vec<ChannelCommand>,
        events: &mut E,
    ) {
        let mut statuses = Vec::new();
        let mut deliveries = Vec::new();
        let mut reload = false;

        let entry = &mut self.registry[index];
        for command in commands {
            match command {
                ChannelCommand::Open { url, ticket } => {
                    if let Some(stale) = entry.handle.take() {
                        self.transport.close(stale);
                    }
                    let handle = self.transport.open(entry.connection.name(), &url, ticket);
                    entry.handle = Some(handle);
                }
                ChannelCommand::ScheduleRetry { delay, ticket } => {
                    if let Some(closed) = entry.handle.take() {
                        self.transport.close(closed);
                    }
                    self.transport.schedule_retry(entry.connection.name(), delay, ticket);
                }
                ChannelCommand::Status(status) => statuses.push(status),
                ChannelCommand::Reload => reload = true,
                ChannelCommand::Deliver(envelope) => deliveries.push(envelope),
            }
        }

        let channel = entry.connection.name().clone();
        for status in statuses {
            self.status_report(&channel, status, events);
        }
        if reload {
            events.reload();
        }
        for envelope in deliveries {
            self.dispatch(&channel, envelope, events);
        }
    }
}
