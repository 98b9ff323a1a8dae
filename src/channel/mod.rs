// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Live-update channels.
//!
//! Each configured channel owns one [`ChannelConnection`]: a state machine with its own retry
//! counter, fed synthetic or real lifecycle events through a single entry point
//! ([`ChannelConnection::handle`]). The state machine never performs I/O; it returns
//! [`ChannelCommand`]s that the [`manager::ConnectionManager`] executes against a transport.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub mod envelope;
pub mod manager;

pub use envelope::{Envelope, EnvelopeError};
pub use manager::{ChannelEvents, ChannelTransport, ConnectionManager, ManagerConfig};

/// Identifies one connection attempt of a channel; events carrying an older ticket are stale.
pub type Ticket = u64;

/// A channel name, usable as a single URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(value: impl Into<String>) -> Result<Self, ChannelNameError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ChannelNameError::Empty);
        }
        if value.contains('/') {
            return Err(ChannelNameError::ContainsSlash);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ChannelNameError::ContainsWhitespace);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for ChannelName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for ChannelName {
    type Err = ChannelNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TryFrom<String> for ChannelName {
    type Error = ChannelNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChannelName> for String {
    fn from(value: ChannelName) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelNameError {
    Empty,
    ContainsSlash,
    ContainsWhitespace,
}

impl fmt::Display for ChannelNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("channel name must not be empty"),
            Self::ContainsSlash => f.write_str("channel name must not contain '/'"),
            Self::ContainsWhitespace => f.write_str("channel name must not contain whitespace"),
        }
    }
}

impl std::error::Error for ChannelNameError {}

/// Subscription URL for `channel` under `base_url`: `<base>/<channel>/subscribe`.
pub fn channel_url(base_url: &str, channel: &ChannelName) -> String {
    format!("{}/{channel}/subscribe", base_url.trim_end_matches('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { delay: Duration::from_millis(3000), max_attempts: 5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Open,
    /// Closed with a retry scheduled.
    Closed,
    /// Out of attempts; never retries again.
    Exhausted,
}

/// What the status display shows for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connected,
    Reconnecting { attempt: u32 },
    Disconnected,
}

impl ChannelStatus {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Reconnecting { .. } => "reconnect",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn text(&self, channel: &ChannelName) -> String {
        match self {
            Self::Connected => format!("{channel}: Connected"),
            Self::Reconnecting { attempt } => {
                format!("{channel}: Reconnecting... (Attempt {attempt})")
            }
            Self::Disconnected => format!("{channel}: Disconnected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Opened,
    Message(String),
    /// Transport-level error; the close that follows drives the retry.
    Error(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCommand {
    Open { url: String, ticket: Ticket },
    ScheduleRetry { delay: Duration, ticket: Ticket },
    Status(ChannelStatus),
    /// The primary channel (re)opened; refetch content to catch up.
    Reload,
    Deliver(Envelope),
}

#[derive(Debug, Clone)]
pub struct ChannelConnection {
    name: ChannelName,
    url: String,
    primary: bool,
    policy: RetryPolicy,
    state: ChannelState,
    attempt_count: u32,
    ticket: Ticket,
}

impl ChannelConnection {
    pub fn new(name: ChannelName, base_url: &str, policy: RetryPolicy, primary: bool) -> Self {
        let url = channel_url(base_url, &name);
        Self { name, url, primary, policy, state: ChannelState::Idle, attempt_count: 0, ticket: 0 }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Opens a new connection, or gives up once the attempt budget is spent.
    pub fn start(&mut self) -> Vec<ChannelCommand> {
        if self.attempt_count >= self.policy.max_attempts {
            warn!(
                channel = %self.name,
                attempts = self.attempt_count,
                "giving up on channel after repeated failures"
            );
            self.state = ChannelState::Exhausted;
            return vec![ChannelCommand::Status(ChannelStatus::Disconnected)];
        }

        self.ticket += 1;
        self.state = ChannelState::Connecting;
        debug!(channel = %self.name, url = %self.url, ticket = self.ticket, "opening channel");
        vec![ChannelCommand::Open { url: self.url.clone(), ticket: self.ticket }]
    }

    pub fn handle(&mut self, ticket: Ticket, event: LifecycleEvent) -> Vec<ChannelCommand> {
        if ticket != self.ticket {
            debug!(channel = %self.name, ticket, current = self.ticket, "dropping stale event");
            return Vec::new();
        }

        match (self.state, event) {
            (ChannelState::Connecting, LifecycleEvent::Opened) => {
                info!(channel = %self.name, "channel connected");
                self.state = ChannelState::Open;
                self.attempt_count = 0;
                let mut commands = vec![ChannelCommand::Status(ChannelStatus::Connected)];
                if self.primary {
                    commands.push(ChannelCommand::Reload);
                }
                commands
            }
            (ChannelState::Open, LifecycleEvent::Message(text)) => match Envelope::parse(&text) {
                Ok(envelope) => vec![ChannelCommand::Deliver(envelope)],
                Err(err) => {
                    warn!(channel = %self.name, %err, "ignoring malformed channel message");
                    Vec::new()
                }
            },
            (ChannelState::Connecting | ChannelState::Open, LifecycleEvent::Closed) => {
                let attempt = self.attempt_count + 1;
                warn!(channel = %self.name, attempt, "channel closed; scheduling reconnect");
                self.state = ChannelState::Closed;
                self.attempt_count = attempt;
                vec![
                    ChannelCommand::Status(ChannelStatus::Reconnecting { attempt }),
                    ChannelCommand::ScheduleRetry { delay: self.policy.delay, ticket: self.ticket },
                ]
            }
            (_, LifecycleEvent::Error(message)) => {
                error!(channel = %self.name, %message, "channel transport error");
                Vec::new()
            }
            (state, event) => {
                debug!(channel = %self.name, ?state, ?event, "ignoring event in current state");
                Vec::new()
            }
        }
    }

    /// A scheduled retry fired.
    pub fn retry_due(&mut self, ticket: Ticket) -> Vec<ChannelCommand> {
        if ticket != self.ticket || self.state != ChannelState::Closed {
            debug!(channel = %self.name, ticket, "dropping stale retry");
            return Vec::new();
        }
        self.start()
    }
}
