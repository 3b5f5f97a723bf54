use thiserror::Error;

use crate::Path;

/// Failures while reading or mutating a [`crate::Document`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("No node at path {path}")]
    NodeNotFound { path: Path },

    #[error("Node at {path} is not a text leaf")]
    NotText { path: Path },

    #[error("Node at {path} is not an element")]
    NotElement { path: Path },

    #[error("Offset {offset} is out of bounds for node at {path}")]
    OffsetOutOfBounds { path: Path, offset: usize },

    #[error("Cannot move node at {path} to {new_path}")]
    InvalidMove { path: Path, new_path: Path },

    #[error("Cannot merge node at {path}: no compatible previous sibling")]
    InvalidMerge { path: Path },

    #[error("Operation {kind} cannot target the root")]
    RootOperation { kind: &'static str },
}
