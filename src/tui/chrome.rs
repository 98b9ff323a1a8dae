// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use ratatui::prelude::*;

use crate::app::StatusSlot;
use crate::render::Theme;

const FOOTER_LABEL_COLOR: Color = Color::Gray;
const FOOTER_KEY_COLOR: Color = Color::Cyan;
const SEPARATOR: &str = " | ";

pub(super) fn diagram_style(theme: Theme) -> Style {
    match theme {
        Theme::Default => Style::default(),
        Theme::Dark => Style::default().fg(Color::Gray).bg(Color::Black),
    }
}

pub(super) fn border_style(theme: Theme) -> Style {
    match theme {
        Theme::Default => Style::default(),
        Theme::Dark => Style::default().fg(Color::DarkGray).bg(Color::Black),
    }
}

pub(super) fn status_color(css_class: &str) -> Color {
    match css_class {
        "connected" => Color::Green,
        "reconnect" => Color::Yellow,
        "disconnected" => Color::Red,
        _ => Color::DarkGray,
    }
}

pub(super) fn diagram_title(theme: Theme) -> String {
    format!(" livegraph · {theme} ")
}

pub(super) fn footer_line(zoom_label: &str, statuses: &[StatusSlot]) -> Line<'static> {
    let mut spans = Vec::<Span<'static>>::new();
    spans.push(Span::styled(
        zoom_label.to_owned(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    ));

    for slot in statuses {
        push_separator(&mut spans);
        spans.push(Span::styled(slot.text(), Style::default().fg(status_color(slot.css_class()))));
    }

    push_footer_entry(&mut spans, "ZOOM", "+/-");
    push_footer_entry(&mut spans, "RESET", "0");
    push_footer_entry(&mut spans, "PAN", "hjkl");
    push_footer_entry(&mut spans, "THEME", "t");
    push_footer_entry(&mut spans, "CODE", "c");
    push_footer_entry(&mut spans, "RELOAD", "r");
    push_footer_entry(&mut spans, "QUIT", "q");

    Line::from(spans)
}

fn push_separator(spans: &mut Vec<Span<'static>>) {
    if !spans.is_empty() {
        spans.push(Span::styled(SEPARATOR.to_owned(), Style::default().fg(FOOTER_LABEL_COLOR)));
    }
}

fn push_footer_entry(spans: &mut Vec<Span<'static>>, label: &str, value: &str) {
    push_separator(spans);
    spans.push(Span::styled(
        format!("{}:", footer_label_ucfirst(label)),
        Style::default().fg(FOOTER_LABEL_COLOR),
    ));
    spans.push(Span::styled(
        value.to_owned(),
        Style::default().fg(FOOTER_KEY_COLOR).add_modifier(Modifier::BOLD),
    ));
}

fn footer_label_ucfirst(label: &str) -> String {
    let lower = label.to_lowercase();
    let mut chars = lower.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out = first.to_uppercase().collect::<String>();
    out.push_str(chars.as_str());
    out
}
