// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Turning diagram source into displayable content.
//!
//! Rendered output is a grid of character cells. Its unscaled size in cells is what the viewport
//! treats as the content base size.

use std::fmt;
use std::str::FromStr;

use crate::viewport::Size;

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Default,
    Dark,
}

impl Theme {
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Default => Self::Dark,
            Self::Dark => Self::Default,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "dark" => Ok(Self::Dark),
            other => Err(RenderError::UnknownTheme(other.to_owned())),
        }
    }
}

/// Renders diagram source with a theme.
pub trait DiagramRenderer {
    fn render(&self, source: &str, theme: Theme) -> Result<RenderedDiagram, RenderError>;
}

/// A rendered diagram: rows of cells, all padded to the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    rows: Vec<Vec<char>>,
    width: usize,
    theme: Theme,
}

impl RenderedDiagram {
    pub fn from_rows(rows: Vec<Vec<char>>, theme: Theme) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, ' ');
                row
            })
            .collect();
        Self { rows, width, theme }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Unscaled size in cells.
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.rows.len() as f64)
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        self.rows.get(y).and_then(|row| row.get(x)).copied()
    }

    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.rows.iter().map(|row| row.iter().collect::<String>().trim_end().to_owned())
    }
}

impl fmt::Display for RenderedDiagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.lines().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            f.write_str(&line)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct FrameGlyphs {
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    horizontal: char,
    vertical: char,
}

const LIGHT_FRAME: FrameGlyphs = FrameGlyphs {
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    horizontal: '─',
    vertical: '│',
};

const HEAVY_FRAME: FrameGlyphs = FrameGlyphs {
    top_left: '┏',
    top_right: '┓',
    bottom_left: '┗',
    bottom_right: '┛',
    horizontal: '━',
    vertical: '┃',
};

fn frame_glyphs(theme: Theme) -> FrameGlyphs {
    match theme {
        Theme::Default => LIGHT_FRAME,
        Theme::Dark => HEAVY_FRAME,
    }
}

/// Draws the source text verbatim inside a frame.
///
/// Tabs expand to four columns; trailing whitespace and leading/trailing blank lines are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl DiagramRenderer for PlainTextRenderer {
    fn render(&self, source: &str, theme: Theme) -> Result<RenderedDiagram, RenderError> {
        let mut lines: Vec<Vec<char>> = source.lines().map(expand_line).collect();
        while matches!(lines.last(), Some(line) if line.is_empty()) {
            lines.pop();
        }
        let first = lines.iter().position(|line| !line.is_empty());
        let Some(first) = first else {
            return Err(RenderError::EmptySource);
        };
        lines.drain(..first);

        let inner = lines.iter().map(Vec::len).max().unwrap_or(0);
        let glyphs = frame_glyphs(theme);
        let mut rows = Vec::with_capacity(lines.len() + 2);

        let mut top = vec![glyphs.top_left];
        top.extend(std::iter::repeat(glyphs.horizontal).take(inner + 2));
        top.push(glyphs.top_right);
        rows.push(top);

        for line in lines {
            let mut row = Vec::with_capacity(inner + 4);
            row.push(glyphs.vertical);
            row.push(' ');
            let len = line.len();
            row.extend(line);
            row.extend(std::iter::repeat(' ').take(inner - len + 1));
            row.push(glyphs.vertical);
            rows.push(row);
        }

        let mut bottom = vec![glyphs.bottom_left];
        bottom.extend(std::iter::repeat(glyphs.horizontal).take(inner + 2));
        bottom.push(glyphs.bottom_right);
        rows.push(bottom);

        Ok(RenderedDiagram::from_rows(rows, theme))
    }
}

fn expand_line(line: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(line.len());
    for ch in line.chars() {
        match ch {
            '\t' => {
                let pad = TAB_WIDTH - (out.len() % TAB_WIDTH);
                out.extend(std::iter::repeat(' ').take(pad));
            }
            ch if ch.is_control() => {}
            ch => out.push(ch),
        }
    }
    while out.last() == Some(&' ') {
        out.pop();
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    EmptySource,
    UnknownTheme(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySource => f.write_str("diagram source is empty"),
            Self::UnknownTheme(name) => write!(f, "unknown theme '{name}'"),
        }
    }
}

impl std::error::Error for RenderError {}
