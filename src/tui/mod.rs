// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Terminal UI.
//!
//! Shows the live diagram with ratatui + crossterm. Mouse and keys drive the viewport controller;
//! channel traffic and graph fetches arrive from the tokio runtime as [`LiveEvent`]s and are
//! drained between frames.

use std::{error::Error, io, time::Duration};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};

use crate::app::{DiagramView, TelemetryEntry, ViewerApp};
use crate::backend::GraphClient;
use crate::channel::{ChannelTransport, ConnectionManager};
use crate::config::ViewerConfig;
use crate::live::{spawn_reload, LiveEvent, LiveSender, WsTransport};
use crate::render::{PlainTextRenderer, RenderedDiagram};
use crate::viewport::{
    Point, PointerButton, Presentation, Rect as ViewRect, Size, ViewTransform,
    ViewportController, ViewportInput, ViewportState,
};

mod chrome;

/// Rows the centered diagram is lifted by. Terminal cells are coarse, so this is much smaller than
/// the pixel bias.
pub const TERMINAL_CENTER_BIAS: f64 = 1.0;
/// Cells moved per wheel notch or arrow key.
const PAN_STEP: f64 = 3.0;
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const CODE_PANEL_PERCENT: u16 = 35;
const TELEMETRY_ROWS: u16 = 8;

/// Terminal-side [`Presentation`]: remembers the transform and where the diagram pane is.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalView {
    transform: ViewTransform,
    zoom_label: String,
    viewport: Option<ViewRect>,
    content_size: Option<Size>,
}

impl Default for TerminalView {
    fn default() -> Self {
        Self {
            transform: ViewTransform { translate: Point::ORIGIN, scale: 1.0 },
            zoom_label: "100%".to_owned(),
            viewport: None,
            content_size: None,
        }
    }
}

impl TerminalView {
    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn zoom_label(&self) -> &str {
        &self.zoom_label
    }

    /// Records the diagram pane's inner area, in screen cells.
    pub fn set_viewport(&mut self, area: Rect) {
        self.viewport = Some(ViewRect::new(
            f64::from(area.x),
            f64::from(area.y),
            f64::from(area.width),
            f64::from(area.height),
        ));
    }

    /// The content cell shown at viewport cell (`col`, `row`): the cell center mapped back through
    /// the transform, rounded down to the nearest content cell.
    pub fn sample(&self, content: &RenderedDiagram, col: u16, row: u16) -> Option<char> {
        let ViewTransform { translate, scale } = self.transform;
        if scale <= 0.0 {
            return None;
        }
        let x = (f64::from(col) + 0.5 - translate.x) / scale;
        let y = (f64::from(row) + 0.5 - translate.y) / scale;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        content.cell(x.floor() as usize, y.floor() as usize)
    }
}

impl Presentation for TerminalView {
    fn apply_transform(&mut self, transform: ViewTransform) {
        self.transform = transform;
    }

    fn set_zoom_label(&mut self, label: &str) {
        label.clone_into(&mut self.zoom_label);
    }

    fn viewport_rect(&self) -> Option<ViewRect> {
        self.viewport
    }

    fn content_rect(&self) -> Option<ViewRect> {
        let viewport = self.viewport?;
        let size = self.content_size?.scale(self.transform.scale);
        let origin = viewport.origin.offset(self.transform.translate.x, self.transform.translate.y);
        Some(ViewRect { origin, size })
    }
}

impl DiagramView for TerminalView {
    fn set_content_size(&mut self, size: Option<Size>) {
        self.content_size = size;
    }
}

/// Runs the interactive viewer until the user quits.
///
/// Blocks the calling thread; `runtime` drives the WebSocket, timer and fetch tasks.
pub fn run(config: &ViewerConfig, runtime: Handle) -> Result<(), Box<dyn Error>> {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let channels = config.channels.channel_names()?;
    let transport = WsTransport::new(runtime.clone(), events_tx.clone());
    let manager = ConnectionManager::new(config.channels.manager_config()?, transport);
    let state = ViewportState::new(config.zoom.bounds()).with_center_bias(TERMINAL_CENTER_BIAS);
    let controller = ViewportController::new(state, config.zoom.step, TerminalView::default());
    let mut app = ViewerApp::new(controller, manager, channels, Box::new(PlainTextRenderer));
    let live = LiveLoop {
        runtime,
        client: GraphClient::new(&config.backend_url),
        events_tx,
        events_rx,
    };

    let mut terminal = TerminalSession::new()?;
    info!(backend = %config.backend_url, "viewer started");
    app.start();
    app.request_reload();

    let result = event_loop(&mut terminal, &mut app, live);
    app.shutdown();
    result
}

struct LiveLoop {
    runtime: Handle,
    client: GraphClient,
    events_tx: LiveSender,
    events_rx: UnboundedReceiver<LiveEvent>,
}

impl LiveLoop {
    /// Applies everything the runtime reported since the last frame, then starts one fetch if any
    /// reload was requested and no other fetch is outstanding.
    fn pump<T: ChannelTransport>(&mut self, app: &mut ViewerApp<TerminalView, T>) {
        while let Ok(event) = self.events_rx.try_recv() {
            app.handle_live_event(event);
        }
        let requests = app.take_reload_requests();
        if requests > 0 {
            debug!(requests, "fetching graph");
            spawn_reload(&self.runtime, self.client.clone(), self.events_tx.clone());
        }
    }
}

fn event_loop(
    terminal: &mut TerminalSession,
    app: &mut ViewerApp<TerminalView, WsTransport>,
    mut live: LiveLoop,
) -> Result<(), Box<dyn Error>> {
    loop {
        live.pump(app);
        terminal.draw(|frame| draw(frame, app))?;

        // Centering needs the freshly drawn layout; redraw right away when it moved anything.
        if app.on_frame() {
            continue;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => map_key(key),
            Event::Mouse(mouse) => map_mouse(mouse),
            _ => None,
        };
        match action {
            Some(UiAction::Quit) => return Ok(()),
            Some(action) => apply_action(app, action),
            None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UiAction {
    Viewport(ViewportInput),
    Pan { dx: f64, dy: f64 },
    ZoomIn,
    ZoomOut,
    ResetZoom,
    ToggleTheme,
    ToggleCodePanel,
    Reload,
    Quit,
}

fn map_key(key: KeyEvent) -> Option<UiAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(UiAction::Quit);
    }
    let action = match key.code {
        KeyCode::Char('+') | KeyCode::Char('=') => UiAction::ZoomIn,
        KeyCode::Char('-') => UiAction::ZoomOut,
        KeyCode::Char('0') => UiAction::ResetZoom,
        KeyCode::Left | KeyCode::Char('h') => UiAction::Pan { dx: PAN_STEP, dy: 0.0 },
        KeyCode::Right | KeyCode::Char('l') => UiAction::Pan { dx: -PAN_STEP, dy: 0.0 },
        KeyCode::Up | KeyCode::Char('k') => UiAction::Pan { dx: 0.0, dy: PAN_STEP },
        KeyCode::Down | KeyCode::Char('j') => UiAction::Pan { dx: 0.0, dy: -PAN_STEP },
        KeyCode::Char('t') => UiAction::ToggleTheme,
        KeyCode::Char('c') => UiAction::ToggleCodePanel,
        KeyCode::Char('r') => UiAction::Reload,
        KeyCode::Char('q') | KeyCode::Esc => UiAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Ctrl+wheel zooms around the pointer; a plain wheel pans (Shift swaps the axes). Left button
/// press, drag and release drive the drag gesture.
fn map_mouse(mouse: MouseEvent) -> Option<UiAction> {
    let position = Point::new(f64::from(mouse.column), f64::from(mouse.row));
    let (delta_x, delta_y) = match mouse.kind {
        MouseEventKind::ScrollUp => (0.0, -1.0),
        MouseEventKind::ScrollDown => (0.0, 1.0),
        MouseEventKind::ScrollLeft => (-1.0, 0.0),
        MouseEventKind::ScrollRight => (1.0, 0.0),
        MouseEventKind::Down(button) => {
            let button = pointer_button(button);
            return Some(UiAction::Viewport(ViewportInput::PointerDown { button, position }));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            return Some(UiAction::Viewport(ViewportInput::PointerMove { position }));
        }
        MouseEventKind::Up(_) => return Some(UiAction::Viewport(ViewportInput::PointerUp)),
        _ => return None,
    };

    let input = if mouse.modifiers.contains(KeyModifiers::CONTROL) {
        if delta_y == 0.0 {
            return None;
        }
        ViewportInput::Wheel { delta_x: 0.0, delta_y, position, zoom_modifier: true }
    } else {
        let (dx, dy) = if mouse.modifiers.contains(KeyModifiers::SHIFT) {
            (delta_y, delta_x)
        } else {
            (delta_x, delta_y)
        };
        ViewportInput::Wheel {
            delta_x: dx * PAN_STEP,
            delta_y: dy * PAN_STEP,
            position,
            zoom_modifier: false,
        }
    };
    Some(UiAction::Viewport(input))
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
    }
}

fn apply_action<T: ChannelTransport>(app: &mut ViewerApp<TerminalView, T>, action: UiAction) {
    match action {
        UiAction::Viewport(input) => {
            app.handle_input(input);
        }
        UiAction::Pan { dx, dy } => app.controller_mut().pan_by(dx, dy),
        UiAction::ZoomIn => app.zoom_in(),
        UiAction::ZoomOut => app.zoom_out(),
        UiAction::ResetZoom => app.reset_zoom(),
        UiAction::ToggleTheme => app.toggle_theme(),
        UiAction::ToggleCodePanel => {
            app.toggle_code_panel();
            let zoom = app.controller().zoom();
            app.controller_mut().center_diagram(zoom);
        }
        UiAction::Reload => app.request_reload(),
        UiAction::Quit => {}
    }
}

fn draw<T: ChannelTransport>(frame: &mut Frame<'_>, app: &mut ViewerApp<TerminalView, T>) {
    let area = frame.size();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    let main_area = layout[0];
    let footer_area = layout[1];

    let (diagram_area, side_area) = if app.code_panel_visible() {
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(100 - CODE_PANEL_PERCENT),
                Constraint::Percentage(CODE_PANEL_PERCENT),
            ])
            .split(main_area);
        (panes[0], Some(panes[1]))
    } else {
        (main_area, None)
    };

    let theme = app.theme();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(chrome::diagram_title(theme))
        .border_style(chrome::border_style(theme));
    let inner = block.inner(diagram_area);
    app.controller_mut().presentation_mut().set_viewport(inner);

    let view = app.controller().presentation();
    let lines = match app.content() {
        Some(content) => sample_lines(view, content, inner.width, inner.height),
        None => vec![Line::from("Waiting for diagram...")],
    };
    let diagram = Paragraph::new(lines).style(chrome::diagram_style(theme)).block(block);
    frame.render_widget(diagram, diagram_area);

    if let Some(side_area) = side_area {
        draw_side_panel(frame, app, side_area);
    }

    let footer = Paragraph::new(chrome::footer_line(view.zoom_label(), app.statuses()));
    frame.render_widget(footer, footer_area);
}

fn sample_lines(
    view: &TerminalView,
    content: &RenderedDiagram,
    width: u16,
    height: u16,
) -> Vec<Line<'static>> {
    (0..height)
        .map(|row| {
            let text: String =
                (0..width).map(|col| view.sample(content, col, row).unwrap_or(' ')).collect();
            Line::from(text)
        })
        .collect()
}

fn draw_side_panel<T: ChannelTransport>(
    frame: &mut Frame<'_>,
    app: &ViewerApp<TerminalView, T>,
    area: Rect,
) {
    let panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(TELEMETRY_ROWS)])
        .split(area);

    let code = Paragraph::new(app.code().unwrap_or_default().to_owned())
        .block(Block::default().borders(Borders::ALL).title(" Code "));
    frame.render_widget(code, panes[0]);

    let visible = usize::from(TELEMETRY_ROWS.saturating_sub(2));
    let events: Vec<Line<'static>> = app.telemetry().rev().take(visible).map(telemetry_line).collect();
    let events = Paragraph::new(events)
        .block(Block::default().borders(Borders::ALL).title(" Events "));
    frame.render_widget(events, panes[1]);
}

fn telemetry_line(entry: &TelemetryEntry) -> Line<'static> {
    let detail = entry
        .envelope
        .get("metadata")
        .map_or_else(|| entry.envelope.to_value().to_string(), ToString::to_string);
    Line::from(vec![
        Span::styled(format!("{} ", entry.channel), Style::default().fg(Color::Cyan)),
        Span::raw(detail),
    ])
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, DisableMouseCapture, LeaveAlternateScreen);
}
