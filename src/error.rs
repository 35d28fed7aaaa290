use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Source unreadable: {}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed input{}", .line.map(|l| format!(" at line {l}")).unwrap_or_default())]
    MalformedInput {
        line: Option<u64>,
        #[source]
        source: csv::Error,
    },

    #[error("Parser task aborted: {0}")]
    ParseAborted(#[from] tokio::task::JoinError),

    #[error("Unresolved category: {title:?}")]
    UnresolvedCategory { title: String },

    #[error("Persistence failed while {context}")]
    Persistence {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Category title already exists: {title:?}")]
    Conflict { title: String },

    #[error("Unknown category id: {0}")]
    MissingCategory(i64),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Source deletion failed after the import was committed.
#[derive(Debug)]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub source: io::Error,
}
