// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The viewer's application context.
//!
//! [`ViewerApp`] owns the viewport controller, the connection manager and the current diagram.
//! Everything the live runtime and the terminal loop do goes through it.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::backend::{GraphSource, ReloadError};
use crate::channel::{
    ChannelEvents, ChannelName, ChannelStatus, ChannelTransport, ConnectionManager, Envelope,
};
use crate::live::LiveEvent;
use crate::render::{DiagramRenderer, RenderedDiagram, Theme};
use crate::viewport::{InputOutcome, Presentation, Size, ViewportController, ViewportInput};

pub const TELEMETRY_CAPACITY: usize = 64;

/// A [`Presentation`] that also displays the rendered diagram.
pub trait DiagramView: Presentation {
    /// Installs new content. `None` clears it.
    fn set_content_size(&mut self, size: Option<Size>);
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusSlot {
    pub channel: ChannelName,
    pub status: Option<ChannelStatus>,
}

impl StatusSlot {
    pub fn text(&self) -> String {
        match &self.status {
            Some(status) => status.text(&self.channel),
            None => format!("{}: Connecting...", self.channel),
        }
    }

    pub fn css_class(&self) -> &'static str {
        self.status.as_ref().map_or("connecting", ChannelStatus::css_class)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEntry {
    pub channel: ChannelName,
    pub envelope: Envelope,
}

/// Borrows the parts of the app the channels write into, leaving the manager free.
struct AppEvents<'a> {
    statuses: &'a mut [StatusSlot],
    telemetry: &'a mut VecDeque<TelemetryEntry>,
    reload_requests: &'a mut usize,
}

impl ChannelEvents for AppEvents<'_> {
    fn reload(&mut self) {
        *self.reload_requests += 1;
    }

    fn update(&mut self, channel: &ChannelName, envelope: Envelope) {
        if self.telemetry.len() == TELEMETRY_CAPACITY {
            self.telemetry.pop_front();
        }
        self.telemetry.push_back(TelemetryEntry { channel: channel.clone(), envelope });
    }

    fn status(&mut self, channel: &ChannelName, status: ChannelStatus) {
        if let Some(slot) = self.statuses.iter_mut().find(|slot| &slot.channel == channel) {
            slot.status = Some(status);
        }
    }
}

pub struct ViewerApp<P: DiagramView, T: ChannelTransport> {
    controller: ViewportController<P>,
    manager: ConnectionManager<T>,
    channels: Vec<ChannelName>,
    renderer: Box<dyn DiagramRenderer + Send>,
    theme: Theme,
    code: Option<String>,
    content: Option<RenderedDiagram>,
    statuses: Vec<StatusSlot>,
    telemetry: VecDeque<TelemetryEntry>,
    reload_requests: usize,
    reload_in_flight: bool,
    code_panel_visible: bool,
}

impl<P: DiagramView, T: ChannelTransport> ViewerApp<P, T> {
    pub fn new(
        controller: ViewportController<P>,
        manager: ConnectionManager<T>,
        channels: Vec<ChannelName>,
        renderer: Box<dyn DiagramRenderer + Send>,
    ) -> Self {
        let statuses = channels
            .iter()
            .map(|channel| StatusSlot { channel: channel.clone(), status: None })
            .collect();
        Self {
            controller,
            manager,
            channels,
            renderer,
            theme: Theme::default(),
            code: None,
            content: None,
            statuses,
            telemetry: VecDeque::with_capacity(TELEMETRY_CAPACITY),
            reload_requests: 0,
            reload_in_flight: false,
            code_panel_visible: false,
        }
    }

    pub fn controller(&self) -> &ViewportController<P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut ViewportController<P> {
        &mut self.controller
    }

    pub fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn content(&self) -> Option<&RenderedDiagram> {
        self.content.as_ref()
    }

    pub fn statuses(&self) -> &[StatusSlot] {
        &self.statuses
    }

    pub fn telemetry(&self) -> impl DoubleEndedIterator<Item = &TelemetryEntry> {
        self.telemetry.iter()
    }

    pub fn code_panel_visible(&self) -> bool {
        self.code_panel_visible
    }

    /// Connects every configured channel.
    pub fn start(&mut self) {
        let channels = self.channels.clone();
        let (manager, mut events) = self.split_events();
        manager.connect(channels, &mut events);
    }

    pub fn handle_live_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Lifecycle { channel, ticket, event } => {
                let (manager, mut events) = self.split_events();
                manager.ingest(&channel, ticket, event, &mut events);
            }
            LiveEvent::RetryDue { channel, ticket } => {
                let (manager, mut events) = self.split_events();
                manager.retry_due(&channel, ticket, &mut events);
            }
            LiveEvent::GraphFetched(result) => self.apply_graph(result),
        }
    }

    fn split_events(&mut self) -> (&mut ConnectionManager<T>, AppEvents<'_>) {
        let events = AppEvents {
            statuses: &mut self.statuses,
            telemetry: &mut self.telemetry,
            reload_requests: &mut self.reload_requests,
        };
        (&mut self.manager, events)
    }

    pub fn handle_input(&mut self, input: ViewportInput) -> InputOutcome {
        self.controller.handle_input(input)
    }

    /// Queues a reload, e.g. on user request.
    pub fn request_reload(&mut self) {
        self.reload_requests += 1;
    }

    /// Pending reload requests since the last call. Several requests collapse into one fetch.
    ///
    /// A non-zero result marks a fetch as outstanding. Until its result reaches
    /// [`Self::apply_graph`] this returns 0 and new requests stay queued, so fetches never overlap
    /// and cannot land out of order.
    pub fn take_reload_requests(&mut self) -> usize {
        if self.reload_in_flight {
            return 0;
        }
        let requests = std::mem::take(&mut self.reload_requests);
        self.reload_in_flight = requests > 0;
        requests
    }

    pub fn reload_in_flight(&self) -> bool {
        self.reload_in_flight
    }

    pub fn apply_graph(&mut self, result: Result<GraphSource, ReloadError>) {
        self.reload_in_flight = false;
        let source = match result {
            Ok(source) => source,
            Err(err) => {
                warn!(%err, "failed to reload graph");
                return;
            }
        };
        self.code = Some(source.code);
        self.rerender();
    }

    /// Renders the current source with the current theme and centers the result.
    fn rerender(&mut self) {
        let Some(code) = self.code.as_deref() else {
            return;
        };
        match self.renderer.render(code, self.theme) {
            Ok(rendered) => {
                debug!(width = rendered.width(), height = rendered.height(), "diagram rendered");
                self.controller.presentation_mut().set_content_size(Some(rendered.size()));
                self.content = Some(rendered);
                let zoom = self.controller.zoom();
                self.controller.center_diagram(zoom);
            }
            Err(err) => warn!(%err, "failed to render diagram; keeping previous content"),
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        info!(theme = %self.theme, "theme changed");
        self.rerender();
        self.request_reload();
    }

    pub fn toggle_code_panel(&mut self) {
        self.code_panel_visible = !self.code_panel_visible;
    }

    pub fn zoom_in(&mut self) {
        self.controller.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.controller.reset_zoom();
    }

    /// Runs deferred work after the presentation has drawn a frame.
    pub fn on_frame(&mut self) -> bool {
        self.controller.on_frame()
    }

    pub fn shutdown(&mut self) {
        self.manager.shutdown();
    }
}

#[cfg(test)]
mod tests;
