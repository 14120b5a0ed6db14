use std::path::PathBuf;

/// Errors raised while building or stepping an ecosystem.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(
        "state shape mismatch: approximator expects {expected_rows}x{expected_width}, got {rows}x{width}"
    )]
    StateShape {
        expected_rows: usize,
        expected_width: usize,
        rows: usize,
        width: usize,
    },

    #[error("action {action} out of range for {actions} actions")]
    ActionOutOfRange { action: usize, actions: usize },

    #[error("resilience for chemical '{0}' is zero")]
    ZeroResilience(String),

    #[error("no resilience configured for chemical '{0}'")]
    MissingResilience(String),

    #[error("no kick configured for chemical '{0}'")]
    MissingKick(String),

    #[error("food '{0}' has no profile")]
    UnknownFood(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("failed to access model {}: {source}", path.display())]
    ModelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode model {}: {source}", path.display())]
    ModelFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model {} is incompatible: {reason}", path.display())]
    ModelIncompatible { path: PathBuf, reason: String },

    #[error("sink '{sink}' failed: {source}")]
    Sink {
        sink: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
