//! Error types for dw-core

use crate::types::EventKind;

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum DwError {
    #[error("Unknown signal name: {0}")]
    UnknownSignal(String),

    #[error("Handler does not accept {expected} events (got a {actual} handler)")]
    HandlerMismatch {
        expected: EventKind,
        actual: EventKind,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}
