//! Error types for trawl operations

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TrawlError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Remote error [{status}] {kind}: {reason}")]
    Remote {
        status: u16,
        kind: String,
        reason: String,
    },

    #[error("Malformed error response with status {status}")]
    Malformed { status: u16 },

    #[error("Decode error: unexpected shape for field '{field}'")]
    Decode { field: String },

    #[error("Aggregation cancelled")]
    Cancelled,

    #[error("Config already exists at {}", .0.display())]
    ConfigExists(PathBuf),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TrawlError {
    pub fn decode(field: impl Into<String>) -> Self {
        Self::Decode {
            field: field.into(),
        }
    }

    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// True for failures that never reached a server response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout(_))
    }
}
