//! Error taxonomy shared by every taproot crate

use serde::Serialize;
use thiserror::Error;

use crate::model::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("no node at path: {0}")]
    PathNotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Whole-build structural failure (missing root, nothing to index).
    #[error("build failed: {0}")]
    BuildFailure(String),

    #[error("link {from} -> {to} references a node outside the snapshot")]
    DanglingLink { from: NodeId, to: NodeId },

    #[error("two file nodes share the path {0}")]
    DuplicatePath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    BuildFailure,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::BuildFailure => "build_failure",
            ErrorKind::Internal => "internal",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NodeNotFound(_) | Error::PathNotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::BuildFailure(_) => ErrorKind::BuildFailure,
            Error::DanglingLink { .. }
            | Error::DuplicatePath(_)
            | Error::Io(_)
            | Error::Encoding(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}
