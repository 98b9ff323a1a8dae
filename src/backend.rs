// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Client for the backend's `GET /graph` endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagram source as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSource {
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    graph_url: String,
}

impl GraphClient {
    pub fn new(backend_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), backend_url)
    }

    pub fn with_client(http: reqwest::Client, backend_url: &str) -> Self {
        let graph_url = graph_url(backend_url);
        Self { http, graph_url }
    }

    pub fn graph_url(&self) -> &str {
        &self.graph_url
    }

    pub async fn fetch_graph(&self) -> Result<GraphSource, ReloadError> {
        let response =
            self.http.get(&self.graph_url).send().await.map_err(ReloadError::Network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReloadError::Status(status.as_u16()));
        }
        let body = response.bytes().await.map_err(ReloadError::Network)?;
        serde_json::from_slice(&body).map_err(ReloadError::Decode)
    }
}

pub fn graph_url(backend_url: &str) -> String {
    format!("{}/graph", backend_url.trim_end_matches('/'))
}

#[derive(Debug)]
pub enum ReloadError {
    Network(reqwest::Error),
    Status(u16),
    Decode(serde_json::Error),
}

impl fmt::Display for ReloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(err) => write!(f, "graph request failed: {err}"),
            Self::Status(status) => write!(f, "graph request returned HTTP {status}"),
            Self::Decode(err) => write!(f, "graph response is not valid: {err}"),
        }
    }
}

impl std::error::Error for ReloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(err) => Some(err),
            Self::Status(_) => None,
            Self::Decode(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{graph_url, GraphClient, GraphSource};

    #[test]
    fn graph_url_joins_without_double_slash() {
        assert_eq!(graph_url("http://localhost:8402"), "http://localhost:8402/graph");
        assert_eq!(graph_url("http://localhost:8402/"), "http://localhost:8402/graph");
        assert_eq!(GraphClient::new("http://host:1/api").graph_url(), "http://host:1/api/graph");
    }

    #[test]
    fn graph_source_ignores_extra_fields() {
        let source: GraphSource =
            serde_json::from_str(r#"{"code":"graph TD\nA-->B","version":3}"#).expect("decode");
        assert_eq!(source.code, "graph TD\nA-->B");
    }
}
