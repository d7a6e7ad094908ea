//! Crate-level error type for the sync engine. Module errors convert in via
//! `From`; the binary maps anything that escapes to a nonzero exit.

use thiserror::Error;

use crate::document::DocumentError;
use crate::notion::NotionError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error(transparent)]
    Remote(#[from] NotionError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate page id {0} in multiple files")]
    DuplicateIdentity(String),
    #[error("cannot resolve folder chain for {0}")]
    FolderResolution(String),
    #[error("no root page id given (flag or NOTION_ROOT_PAGE_ID)")]
    MissingRoot,
    #[error("remote client not configured")]
    NotConfigured,
}
