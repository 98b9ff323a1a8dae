// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pointer/wheel input → transform model.

use super::{DragSession, Point, Rect, Size, ViewTransform, ViewportState};

/// Where the transform ends up, plus the read-only geometry the controller needs for centering.
pub trait Presentation {
    fn apply_transform(&mut self, transform: ViewTransform);

    fn set_zoom_label(&mut self, label: &str);

    /// Bounding box of the viewport element, `None` before it exists.
    fn viewport_rect(&self) -> Option<Rect>;

    /// Bounding box of the displayed (scaled) content, `None` before the first render.
    fn content_rect(&self) -> Option<Rect>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportInput {
    /// A wheel notch. `position` is in presentation coordinates; `zoom_modifier` is set when the
    /// zoom chord (ctrl/meta) is held.
    Wheel { delta_x: f64, delta_y: f64, position: Point, zoom_modifier: bool },
    PointerDown { button: PointerButton, position: Point },
    PointerMove { position: Point },
    PointerUp,
    DragEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputOutcome {
    /// The host should suppress its native handling of the event (scrolling, drag images).
    pub prevent_default: bool,
    pub changed: bool,
}

impl InputOutcome {
    const IGNORED: Self = Self { prevent_default: false, changed: false };
}

#[derive(Debug)]
pub struct ViewportController<P> {
    state: ViewportState,
    zoom_step: f64,
    drag: Option<DragSession>,
    pending_center: Option<f64>,
    presentation: P,
}

impl<P: Presentation> ViewportController<P> {
    pub fn new(state: ViewportState, zoom_step: f64, presentation: P) -> Self {
        let mut controller =
            Self { state, zoom_step, drag: None, pending_center: None, presentation };
        controller.apply();
        controller
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    pub fn handle_input(&mut self, input: ViewportInput) -> InputOutcome {
        match input {
            ViewportInput::Wheel { delta_x, delta_y, position, zoom_modifier } => {
                if zoom_modifier {
                    let target = if delta_y > 0.0 {
                        self.state.zoom() / self.zoom_step
                    } else {
                        self.state.zoom() * self.zoom_step
                    };
                    let origin = self.presentation.viewport_rect().map(|rect| rect.origin);
                    let cursor = position.minus(origin.unwrap_or(Point::ORIGIN));
                    self.state.set_zoom(target, Some(cursor));
                } else {
                    self.state.pan_by(-delta_x, -delta_y);
                }
                self.apply();
                InputOutcome { prevent_default: true, changed: true }
            }
            ViewportInput::PointerDown { button, position } => {
                if button != PointerButton::Primary {
                    return InputOutcome::IGNORED;
                }
                self.drag = Some(self.state.begin_drag(position));
                InputOutcome { prevent_default: false, changed: false }
            }
            ViewportInput::PointerMove { position } => {
                let Some(session) = self.drag else {
                    return InputOutcome::IGNORED;
                };
                self.state.drag_to(&session, position);
                self.apply();
                InputOutcome { prevent_default: true, changed: true }
            }
            ViewportInput::PointerUp | ViewportInput::DragEnd => {
                if self.drag.take().is_none() {
                    return InputOutcome::IGNORED;
                }
                self.state.end_drag();
                self.apply();
                InputOutcome { prevent_default: false, changed: true }
            }
        }
    }

    /// Zoom without a cursor anchor; translation stays where it was.
    pub fn set_zoom(&mut self, target: f64) {
        self.state.set_zoom(target, None);
        self.apply();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.state.zoom() * self.zoom_step);
        self.center_diagram(self.state.zoom());
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.state.zoom() / self.zoom_step);
        self.center_diagram(self.state.zoom());
    }

    pub fn reset_zoom(&mut self) {
        self.center_diagram(1.0);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.state.pan_by(dx, dy);
        self.apply();
    }

    /// Requests centering at `target_zoom` once the next frame has been laid out.
    ///
    /// The work happens in [`Self::on_frame`]; a later request replaces an earlier one.
    pub fn center_diagram(&mut self, target_zoom: f64) {
        self.pending_center = Some(target_zoom);
    }

    pub fn has_pending_center(&self) -> bool {
        self.pending_center.is_some()
    }

    /// Runs deferred work after a layout/render pass. Returns whether the transform changed.
    pub fn on_frame(&mut self) -> bool {
        let Some(target_zoom) = self.pending_center.take() else {
            return false;
        };
        let (Some(viewport), Some(content)) =
            (self.presentation.viewport_rect(), self.presentation.content_rect())
        else {
            return false;
        };

        let current = self.state.zoom();
        let base = Size::new(content.size.width / current, content.size.height / current);
        self.state.center(target_zoom, viewport.size, base);
        self.apply();
        true
    }

    fn apply(&mut self) {
        self.presentation.apply_transform(self.state.transform());
        let label = self.state.zoom_label();
        self.presentation.set_zoom_label(&label);
    }
}
