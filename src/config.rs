// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Viewer configuration.
//!
//! Loaded from an optional JSON file; any field left out keeps its default.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelName, ChannelNameError, ManagerConfig, RetryPolicy};
use crate::viewport::ZoomBounds;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8402";
pub const DEFAULT_CHANNEL_BASE_URL: &str = "ws://localhost:8402/ws";
pub const FILE_CHANGES_CHANNEL: &str = "file_changes";
pub const NODE_EXECUTION_CHANNEL: &str = "node_execution";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    pub backend_url: String,
    pub zoom: ZoomConfig,
    pub channels: ChannelsConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_owned(),
            zoom: ZoomConfig::default(),
            channels: ChannelsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self { min: 0.7, max: 2.5, step: 1.2 }
    }
}

impl ZoomConfig {
    pub fn bounds(&self) -> ZoomBounds {
        ZoomBounds { min: self.min, max: self.max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelsConfig {
    pub base_url: String,
    pub names: Vec<String>,
    pub reload_channel: String,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHANNEL_BASE_URL.to_owned(),
            names: vec![FILE_CHANGES_CHANNEL.to_owned(), NODE_EXECUTION_CHANNEL.to_owned()],
            reload_channel: FILE_CHANGES_CHANNEL.to_owned(),
            reconnect_delay_ms: 3000,
            max_reconnect_attempts: 5,
        }
    }
}

impl ChannelsConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_millis(self.reconnect_delay_ms),
            max_attempts: self.max_reconnect_attempts,
        }
    }

    /// Validated channel names, in configured order.
    pub fn channel_names(&self) -> Result<Vec<ChannelName>, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut names = Vec::with_capacity(self.names.len());
        for raw in &self.names {
            let name = ChannelName::new(raw.as_str()).map_err(|reason| {
                ConfigError::InvalidChannel { name: raw.clone(), reason }
            })?;
            if !seen.insert(raw.as_str()) {
                return Err(ConfigError::DuplicateChannel(raw.clone()));
            }
            names.push(name);
        }
        Ok(names)
    }

    pub fn manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        let reload_channel = ChannelName::new(self.reload_channel.as_str()).map_err(|reason| {
            ConfigError::InvalidChannel { name: self.reload_channel.clone(), reason }
        })?;
        Ok(ManagerConfig {
            base_url: self.base_url.clone(),
            reload_channel,
            policy: self.policy(),
        })
    }
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let zoom = &self.zoom;
        if !(zoom.min > 0.0) || !(zoom.min <= zoom.max) {
            return Err(ConfigError::InvalidZoomBounds { min: zoom.min, max: zoom.max });
        }
        if !(zoom.step > 1.0) {
            return Err(ConfigError::InvalidZoomStep(zoom.step));
        }

        let names = self.channels.channel_names()?;
        if names.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        let manager = self.channels.manager_config()?;
        if !names.contains(&manager.reload_channel) {
            return Err(ConfigError::UnknownReloadChannel(self.channels.reload_channel.clone()));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    InvalidZoomBounds { min: f64, max: f64 },
    InvalidZoomStep(f64),
    NoChannels,
    DuplicateChannel(String),
    InvalidChannel { name: String, reason: ChannelNameError },
    UnknownReloadChannel(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to read config {}: {source}", path.display()),
            Self::Parse { path, source } => {
                write!(f, "failed to parse config {}: {source}", path.display())
            }
            Self::InvalidZoomBounds { min, max } => {
                write!(f, "zoom bounds must satisfy 0 < min <= max (min={min}, max={max})")
            }
            Self::InvalidZoomStep(step) => write!(f, "zoom step must be greater than 1 (step={step})"),
            Self::NoChannels => f.write_str("at least one channel must be configured"),
            Self::DuplicateChannel(name) => write!(f, "channel '{name}' is configured twice"),
            Self::InvalidChannel { name, reason } => write!(f, "invalid channel '{name}': {reason}"),
            Self::UnknownReloadChannel(name) => {
                write!(f, "reload channel '{name}' is not among the configured channels")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::InvalidChannel { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::{ConfigError, ViewerConfig};

    #[test]
    fn defaults_match_the_preview_server() {
        let config = ViewerConfig::default();
        config.validate().expect("defaults are valid");

        assert_eq!(config.backend_url, "http://localhost:8402");
        assert_eq!(config.zoom.min, 0.7);
        assert_eq!(config.zoom.max, 2.5);
        assert_eq!(config.zoom.step, 1.2);
        assert_eq!(config.channels.base_url, "ws://localhost:8402/ws");
        assert_eq!(config.channels.names, vec!["file_changes", "node_execution"]);
        assert_eq!(config.channels.reload_channel, "file_changes");
        assert_eq!(config.channels.policy().delay, Duration::from_millis(3000));
        assert_eq!(config.channels.policy().max_attempts, 5);
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config: ViewerConfig = serde_json::from_str(
            r#"{"zoom":{"max":4.0},"channels":{"names":["content","telemetry"],"reload_channel":"content"}}"#,
        )
        .expect("parse config");
        config.validate().expect("valid config");

        assert_eq!(config.zoom.max, 4.0);
        assert_eq!(config.zoom.min, 0.7);
        assert_eq!(config.channels.max_reconnect_attempts, 5);
        let names = config.channels.channel_names().expect("channel names");
        assert_eq!(names.iter().map(|n| n.as_str()).collect::<Vec<_>>(), vec!["content", "telemetry"]);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_json::from_str::<ViewerConfig>(r#"{"zoom":{"speed":2}}"#).is_err());
    }

    #[rstest]
    #[case(r#"{"zoom":{"min":0.0}}"#)]
    #[case(r#"{"zoom":{"min":3.0,"max":2.0}}"#)]
    #[case(r#"{"zoom":{"step":1.0}}"#)]
    #[case(r#"{"channels":{"names":[]}}"#)]
    #[case(r#"{"channels":{"names":["file_changes","file_changes"]}}"#)]
    #[case(r#"{"channels":{"names":["a/b"],"reload_channel":"a/b"}}"#)]
    #[case(r#"{"channels":{"names":["node_execution"]}}"#)]
    fn rejects_invalid_settings(#[case] raw: &str) {
        let config: ViewerConfig = serde_json::from_str(raw).expect("parse config");
        config.validate().unwrap_err();
    }

    #[test]
    fn load_reports_missing_file_with_path() {
        let err = ViewerConfig::load("/definitely/not/here/livegraph.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here/livegraph.json"));
    }
}
