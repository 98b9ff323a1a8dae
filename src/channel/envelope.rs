// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Livegraph-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Livegraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde_json::{Map, Value};

/// A parsed inbound frame: the logical `channel` tag plus everything else, untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    channel: Option<String>,
    payload: Map<String, Value>,
}

impl Envelope {
    /// Parses a text frame. The frame must be a JSON object; a missing or non-string `channel`
    /// field yields an untagged envelope rather than an error.
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(text).map_err(EnvelopeError::Json)?;
        let Value::Object(mut payload) = value else {
            return Err(EnvelopeError::NotAnObject);
        };
        let channel = match payload.remove("channel") {
            Some(Value::String(channel)) => Some(channel),
            _ => None,
        };
        Ok(Self { channel, payload })
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// The frame as a JSON object again, `channel` included.
    pub fn to_value(&self) -> Value {
        let mut object = self.payload.clone();
        if let Some(channel) = &self.channel {
            object.insert("channel".to_owned(), Value::String(channel.clone()));
        }
        Value::Object(object)
    }
}

#[derive(Debug)]
pub enum EnvelopeError {
    Json(serde_json::Error),
    NotAnObject,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid JSON frame: {err}"),
            Self::NotAnObject => f.write_str("frame is not a JSON object"),
        }
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::NotAnObject => None,
        }
    }
}
