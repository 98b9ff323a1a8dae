// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Pan/zoom transform model.
//!
//! `ViewportState` is pure state + math: a zoom factor bounded by [`ZoomBounds`], the visual
//! translation, and the *anchor* translation committed at the end of the last gesture. It does no
//! I/O; [`controller::ViewportController`] feeds it input and pushes the result to a presentation.

use std::fmt;

pub mod controller;

pub use controller::{InputOutcome, PointerButton, Presentation, ViewportController, ViewportInput};

/// Default vertical lift applied when centering, leaving room for on-screen controls.
pub const CENTER_TOP_BIAS: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    pub fn minus(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn scale(self, factor: f64) -> Self {
        Self { width: self.width * factor, height: self.height * factor }
    }
}

/// An axis-aligned box in presentation coordinates (a bounding client rect).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { origin: Point::new(x, y), size: Size::new(width, height) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBounds {
    pub min: f64,
    pub max: f64,
}

impl ZoomBounds {
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.max(self.min).min(self.max)
    }
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self { min: 0.7, max: 2.5 }
    }
}

/// The transform pushed to the presentation layer.
///
/// `Display` renders the CSS form, e.g. `translate(12px, -4px) scale(1.2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub translate: Point,
    pub scale: f64,
}

impl fmt::Display for ViewTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "translate({}px, {}px) scale({})",
            self.translate.x, self.translate.y, self.scale
        )
    }
}

/// An in-progress drag gesture.
///
/// `pointer_start` is the pointer position at press time minus the anchor translate, so
/// `translate = pointer - pointer_start` while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pointer_start: Point,
}

impl DragSession {
    pub fn pointer_start(&self) -> Point {
        self.pointer_start
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    bounds: ZoomBounds,
    center_bias: f64,
    zoom: f64,
    translate: Point,
    anchor_translate: Point,
}

impl ViewportState {
    pub fn new(bounds: ZoomBounds) -> Self {
        Self {
            bounds,
            center_bias: CENTER_TOP_BIAS,
            zoom: bounds.clamp(1.0),
            translate: Point::ORIGIN,
            anchor_translate: Point::ORIGIN,
        }
    }

    pub fn with_center_bias(mut self, center_bias: f64) -> Self {
        self.center_bias = center_bias;
        self
    }

    pub fn bounds(&self) -> ZoomBounds {
        self.bounds
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn translate(&self) -> Point {
        self.translate
    }

    pub fn anchor_translate(&self) -> Point {
        self.anchor_translate
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform { translate: self.translate, scale: self.zoom }
    }

    /// Zoom readout, e.g. `120%`.
    pub fn zoom_label(&self) -> String {
        format!("{}%", (self.zoom * 100.0).round() as i64)
    }

    /// Sets the zoom factor, clamped into bounds.
    ///
    /// With a `cursor`, the content point under the cursor stays where it is on screen. Without
    /// one, the translation is left untouched (callers usually follow up with [`Self::center`]).
    pub fn set_zoom(&mut self, target: f64, cursor: Option<Point>) {
        let target = self.bounds.clamp(target);

        if let Some(cursor) = cursor {
            if target != self.zoom {
                let ratio = target / self.zoom;
                self.translate = Point {
                    x: cursor.x - (cursor.x - self.translate.x) * ratio,
                    y: cursor.y - (cursor.y - self.translate.y) * ratio,
                };
                self.anchor_translate = self.translate;
            }
        }

        self.zoom = target;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.translate = self.translate.offset(dx, dy);
        self.anchor_translate = self.translate;
    }

    pub fn begin_drag(&self, pointer: Point) -> DragSession {
        DragSession { pointer_start: pointer.minus(self.anchor_translate) }
    }

    pub fn drag_to(&mut self, session: &DragSession, pointer: Point) {
        self.translate = pointer.minus(session.pointer_start);
    }

    pub fn end_drag(&mut self) {
        self.anchor_translate = self.translate;
    }

    /// Centers content of unscaled size `content_base` inside `viewport` at `target_zoom`.
    ///
    /// Horizontal centering is exact; the vertical position is lifted by the center bias
    /// ([`CENTER_TOP_BIAS`] unless overridden).
    pub fn center(&mut self, target_zoom: f64, viewport: Size, content_base: Size) {
        let zoom = self.bounds.clamp(target_zoom);
        let scaled = content_base.scale(zoom);
        let centered = Point {
            x: (viewport.width - scaled.width) / 2.0,
            y: (viewport.height - scaled.height) / 2.0 - self.center_bias,
        };

        self.zoom = zoom;
        self.translate = centered;
        self.anchor_translate = centered;
    }
}

impl Default for ViewportState {
    fn default() -> Self {
        Self::new(ZoomBounds::default())
    }
}
