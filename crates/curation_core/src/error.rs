use std::fmt;

use shared::domain::{CollectionKey, Role};
use thiserror::Error;

/// Which remote listing a fetch was reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Candidates,
    Selection,
    Gallery,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Candidates => "candidates",
            SourceKind::Selection => "selection",
            SourceKind::Gallery => "gallery",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
pub enum CurationError {
    #[error("failed to fetch {source_kind} for {collection}: {message}")]
    FetchFailed {
        collection: CollectionKey,
        source_kind: SourceKind,
        message: String,
    },
    #[error("failed to save {collection}: {message}")]
    CommitFailed {
        collection: CollectionKey,
        message: String,
    },
    #[error("role {role} may not curate {collection}")]
    Forbidden {
        collection: CollectionKey,
        role: Role,
    },
}

impl CurationError {
    pub(crate) fn fetch(
        collection: &CollectionKey,
        source_kind: SourceKind,
        err: &anyhow::Error,
    ) -> Self {
        Self::FetchFailed {
            collection: collection.clone(),
            source_kind,
            message: format!("{err:#}"),
        }
    }

    pub(crate) fn commit(collection: &CollectionKey, err: &anyhow::Error) -> Self {
        Self::CommitFailed {
            collection: collection.clone(),
            message: format!("{err:#}"),
        }
    }

    /// True for failures the user can retry from the same screen.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CurationError::Forbidden { .. })
    }
}
