// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Livegraph: a terminal viewer for diagrams that update live.
//!
//! The viewer fetches diagram source from a backend, keeps one reconnecting WebSocket
//! subscription per channel, and shows the rendered diagram in a pannable, zoomable viewport.

pub mod app;
pub mod backend;
pub mod channel;
pub mod config;
pub mod live;
pub mod render;
pub mod serve;
pub mod tui;
pub mod viewport;
