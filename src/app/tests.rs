// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use rstest::{fixture, rstest};

use super::{DiagramView, ViewerApp, TELEMETRY_CAPACITY};
use crate::backend::{GraphSource, ReloadError};
use crate::channel::{
    ChannelName, ChannelStatus, ChannelTransport, ConnectionManager, LifecycleEvent,
    ManagerConfig, RetryPolicy, Ticket,
};
use crate::live::LiveEvent;
use crate::render::{DiagramRenderer, PlainTextRenderer, RenderError, RenderedDiagram, Theme};
use crate::viewport::{
    Point, Presentation, Rect, Size, ViewTransform, ViewportController, ViewportState, ZoomBounds,
};

const FILE_CHANGES: &str = "file_changes";
const NODE_EXECUTION: &str = "node_execution";

fn name(value: &str) -> ChannelName {
    ChannelName::new(value).expect("channel name")
}

#[derive(Debug, Default)]
struct FakeView {
    transform: Option<ViewTransform>,
    label: String,
    content_size: Option<Size>,
}

impl Presentation for FakeView {
    fn apply_transform(&mut self, transform: ViewTransform) {
        self.transform = Some(transform);
    }

    fn set_zoom_label(&mut self, label: &str) {
        self.label = label.to_owned();
    }

    fn viewport_rect(&self) -> Option<Rect> {
        Some(Rect::new(0.0, 0.0, 100.0, 40.0))
    }

    fn content_rect(&self) -> Option<Rect> {
        let size = self.content_size?;
        let transform = self.transform?;
        Some(Rect {
            origin: transform.translate,
            size: size.scale(transform.scale),
        })
    }
}

impl DiagramView for FakeView {
    fn set_content_size(&mut self, size: Option<Size>) {
        self.content_size = size;
    }
}

#[derive(Debug, Default)]
struct FakeTransport {
    opened: Vec<(String, Ticket)>,
    closed: usize,
    retries: Vec<(String, Ticket)>,
    cancelled: bool,
}

impl FakeTransport {
    fn ticket(&self, channel: &str) -> Ticket {
        self.opened
            .iter()
            .rev()
            .find(|(c, _)| c == channel)
            .map(|(_, ticket)| *ticket)
            .expect("channel was opened")
    }
}

impl ChannelTransport for FakeTransport {
    type Handle = ();

    fn open(&mut self, channel: &ChannelName, _url: &str, ticket: Ticket) -> Self::Handle {
        self.opened.push((channel.to_string(), ticket));
    }

    fn close(&mut self, _handle: Self::Handle) {
        self.closed += 1;
    }

    fn schedule_retry(&mut self, channel: &ChannelName, _delay: Duration, ticket: Ticket) {
        self.retries.push((channel.to_string(), ticket));
    }

    fn cancel_pending(&mut self) {
        self.cancelled = true;
    }
}

/// Renders like [`PlainTextRenderer`] but fails on sources containing `boom`.
struct FlakyRenderer;

impl DiagramRenderer for FlakyRenderer {
    fn render(&self, source: &str, theme: Theme) -> Result<RenderedDiagram, RenderError> {
        if source.contains("boom") {
            return Err(RenderError::EmptySource);
        }
        PlainTextRenderer.render(source, theme)
    }
}

type App = ViewerApp<FakeView, FakeTransport>;

#[fixture]
fn app() -> App {
    let state = ViewportState::new(ZoomBounds { min: 0.7, max: 2.5 }).with_center_bias(1.0);
    let controller = ViewportController::new(state, 1.2, FakeView::default());
    let manager = ConnectionManager::new(
        ManagerConfig {
            base_url: "ws://localhost:8402/ws".to_owned(),
            reload_channel: name(FILE_CHANGES),
            policy: RetryPolicy::default(),
        },
        FakeTransport::default(),
    );
    ViewerApp::new(
        controller,
        manager,
        vec![name(FILE_CHANGES), name(NODE_EXECUTION)],
        Box::new(FlakyRenderer),
    )
}

fn lifecycle(app: &mut App, channel: &str, event: LifecycleEvent) {
    let ticket = app.manager().transport().ticket(channel);
    app.handle_live_event(LiveEvent::Lifecycle { channel: channel.to_owned(), ticket, event });
}

fn graph(code: &str) -> Result<GraphSource, ReloadError> {
    Ok(GraphSource { code: code.to_owned() })
}

#[rstest]
fn start_connects_channels_in_configured_order(mut app: App) {
    app.start();

    let opened: Vec<&str> =
        app.manager().transport().opened.iter().map(|(c, _)| c.as_str()).collect();
    assert_eq!(opened, vec![FILE_CHANGES, NODE_EXECUTION]);
    let texts: Vec<String> = app.statuses().iter().map(|slot| slot.text()).collect();
    assert_eq!(texts, vec!["file_changes: Connecting...", "node_execution: Connecting..."]);
}

#[rstest]
fn connecting_the_reload_channel_requests_a_reload(mut app: App) {
    app.start();

    lifecycle(&mut app, NODE_EXECUTION, LifecycleEvent::Opened);
    assert_eq!(app.take_reload_requests(), 0);

    lifecycle(&mut app, FILE_CHANGES, LifecycleEvent::Opened);
    assert_eq!(app.statuses()[0].status, Some(ChannelStatus::Connected));
    assert_eq!(app.statuses()[0].css_class(), "connected");
    assert_eq!(app.take_reload_requests(), 1);
    assert_eq!(app.take_reload_requests(), 0);
}

#[rstest]
fn reload_events_collapse_into_one_take(mut app: App) {
    app.start();
    lifecycle(&mut app, FILE_CHANGES, LifecycleEvent::Opened);
    for _ in 0..3 {
        lifecycle(
            &mut app,
            FILE_CHANGES,
            LifecycleEvent::Message(r#"{"channel":"file_changes","metadata":{}}"#.to_owned()),
        );
    }

    assert_eq!(app.take_reload_requests(), 4);
}

#[rstest]
fn telemetry_is_kept_in_a_bounded_log(mut app: App) {
    app.start();
    lifecycle(&mut app, NODE_EXECUTION, LifecycleEvent::Opened);
    for index in 0..(TELEMETRY_CAPACITY + 3) {
        let frame = format!(r#"{{"channel":"node_execution","metadata":{{"step":{index}}}}}"#);
        lifecycle(&mut app, NODE_EXECUTION, LifecycleEvent::Message(frame));
    }

    assert_eq!(app.telemetry().count(), TELEMETRY_CAPACITY);
    let newest = app.telemetry().next_back().expect("telemetry entry");
    assert_eq!(newest.channel.as_str(), NODE_EXECUTION);
    assert_eq!(newest.envelope.get("metadata"), Some(&serde_json::json!({"step": 66})));
    assert_eq!(app.take_reload_requests(), 0);
}

#[rstest]
fn closed_channel_shows_reconnect_status(mut app: App) {
    app.start();
    lifecycle(&mut app, NODE_EXECUTION, LifecycleEvent::Closed);

    assert_eq!(app.statuses()[1].text(), "node_execution: Reconnecting... (Attempt 1)");
    assert_eq!(app.statuses()[1].css_class(), "reconnect");
    let retries = &app.manager().transport().retries;
    assert_eq!(retries.len(), 1);

    let ticket = retries[0].1;
    app.handle_live_event(LiveEvent::RetryDue { channel: NODE_EXECUTION.to_owned(), ticket });
    assert_eq!(app.manager().transport().opened.len(), 3);
}

#[rstest]
fn fetched_graph_is_rendered_and_centered(mut app: App) {
    app.handle_live_event(LiveEvent::GraphFetched(graph("A")));

    assert_eq!(app.code(), Some("A"));
    let content = app.content().expect("content");
    assert_eq!(content.size(), Size::new(5.0, 3.0));
    assert!(app.controller().has_pending_center());

    assert!(app.on_frame());
    let transform = app.controller().presentation().transform.expect("transform");
    assert_eq!(transform.translate, Point::new(47.5, 17.5));
    assert_eq!(transform.scale, 1.0);
}

#[rstest]
fn failed_fetch_changes_nothing(mut app: App) {
    app.apply_graph(graph("A"));
    app.on_frame();

    app.apply_graph(Err(ReloadError::Status(500)));

    assert_eq!(app.code(), Some("A"));
    assert!(app.content().is_some());
    assert!(!app.controller().has_pending_center());
}

#[rstest]
fn render_failure_keeps_previous_content(mut app: App) {
    app.apply_graph(graph("A"));
    app.on_frame();

    app.apply_graph(graph("boom"));

    assert_eq!(app.code(), Some("boom"));
    assert_eq!(app.content().map(ToString::to_string).as_deref(), Some("┌───┐\n│ A │\n└───┘"));
    assert!(!app.controller().has_pending_center());
}

#[rstest]
fn centering_keeps_the_current_zoom(mut app: App) {
    app.apply_graph(graph("A"));
    app.on_frame();
    app.zoom_in();
    app.on_frame();
    let zoom = app.controller().zoom();
    assert!((zoom - 1.2).abs() < 1e-9);

    app.apply_graph(graph("AB"));
    app.on_frame();

    assert!((app.controller().zoom() - zoom).abs() < 1e-9);
    assert_eq!(app.controller().presentation().label, "120%");
}

#[rstest]
fn zoom_controls_recenter(mut app: App) {
    app.apply_graph(graph("A"));
    app.on_frame();

    app.zoom_out();
    app.on_frame();
    assert_eq!(app.controller().presentation().label, "83%");

    app.reset_zoom();
    app.on_frame();
    assert_eq!(app.controller().presentation().label, "100%");
    let transform = app.controller().presentation().transform.expect("transform");
    assert!((transform.translate.x - 47.5).abs() < 1e-9);
    assert!((transform.translate.y - 17.5).abs() < 1e-9);
}

#[rstest]
fn theme_toggle_rerenders_and_requests_reload(mut app: App) {
    app.apply_graph(graph("A"));

    app.toggle_theme();

    assert_eq!(app.theme(), Theme::Dark);
    assert_eq!(app.content().map(RenderedDiagram::theme), Some(Theme::Dark));
    assert_eq!(app.take_reload_requests(), 1);

    app.toggle_theme();
    assert_eq!(app.theme(), Theme::Default);
}

#[rstest]
fn reloads_wait_for_the_outstanding_fetch(mut app: App) {
    app.request_reload();
    assert_eq!(app.take_reload_requests(), 1);
    assert!(app.reload_in_flight());

    app.toggle_theme();
    app.request_reload();
    assert_eq!(app.take_reload_requests(), 0);

    app.handle_live_event(LiveEvent::GraphFetched(Err(ReloadError::Status(502))));
    assert!(!app.reload_in_flight());
    assert_eq!(app.take_reload_requests(), 2);

    app.apply_graph(graph("A"));
    assert_eq!(app.take_reload_requests(), 0);
    assert!(!app.reload_in_flight());
}

#[rstest]
fn code_panel_toggles(mut app: App) {
    assert!(!app.code_panel_visible());
    app.toggle_code_panel();
    assert!(app.code_panel_visible());
    app.toggle_code_panel();
    assert!(!app.code_panel_visible());
}

#[rstest]
fn shutdown_releases_channels(mut app: App) {
    app.start();
    app.shutdown();

    assert!(app.manager().is_empty());
    assert_eq!(app.manager().transport().closed, 2);
    assert!(app.manager().transport().cancelled);

    app.handle_live_event(LiveEvent::RetryDue { channel: FILE_CHANGES.to_owned(), ticket: 1 });
    assert_eq!(app.manager().transport().opened.len(), 2);
}
