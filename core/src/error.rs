use serde::Serialize;
use thiserror::Error;

/// Stable error classes reported in the failure envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ResourceLoad,
    Input,
    Computation,
}

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Cannot load {path}: {reason}")]
    ResourceLoad { path: String, reason: String },

    #[error("{0}")]
    Input(String),

    #[error("{0}")]
    Computation(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing feature '{name}'")]
    MissingFeature { name: String },

    #[error("History database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashError {
    pub fn resource(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceLoad {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ResourceLoad { .. } | Self::Database(_) => ErrorKind::ResourceLoad,
            Self::Input(_) | Self::UnknownCommand(_)      => ErrorKind::Input,
            Self::Computation(_)
            | Self::MissingFeature { .. }
            | Self::Serialization(_)
            | Self::Other(_)                              => ErrorKind::Computation,
        }
    }
}

pub type DashResult<T> = Result<T, DashError>;
