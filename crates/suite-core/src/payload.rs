//! Opaque payloads passed between components.
//!
//! The scheduler moves these values around without interpreting them;
//! producers and consumers agree on the variant out of band.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Data flowing between components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// No value (initial state, failed components)
    Empty,
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Reference to a file on disk
    FilePath(PathBuf),
    /// Structured data
    Json(serde_json::Value),
    /// Multiple payloads from one producer
    Multiple(Vec<Payload>),
}

impl Payload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Structured view, if this payload carries JSON
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// File reference, if this payload points at the filesystem
    #[must_use]
    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Payload::FilePath(path) => Some(path.as_path()),
            _ => None,
        }
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Empty
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::FilePath(path)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}
