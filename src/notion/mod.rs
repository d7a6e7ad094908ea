//! Remote content-service interface.
//!
//! [`RemoteApi`] mirrors the raw API surface one call per endpoint, with
//! pagination and batching left to [`PageOps`]. Production traffic goes
//! through [`NotionClient`]; orchestrator tests run against an in-memory
//! implementation.

mod client;
mod page_ops;
#[cfg(test)]
pub(crate) mod testing;

pub use client::NotionClient;
pub use page_ops::{PageOps, MAX_CHILDREN_PER_REQUEST};

use serde_json::{json, Value};
use thiserror::Error;

use crate::blocks::Block;

#[derive(Error, Debug)]
pub enum NotionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl NotionError {
    /// Whether an update failure should be reclassified as "page is gone,
    /// create a fresh one". Keyed on the structured error code rather than
    /// message text.
    pub fn is_recoverable_as_create(&self) -> bool {
        match self {
            NotionError::Api { status, code, .. } => {
                *status == 404 || code == "object_not_found" || code == "validation_error"
            }
            _ => false,
        }
    }

    /// Whether a create failure looks like a rejected optional property.
    pub fn is_validation_rejection(&self) -> bool {
        matches!(self, NotionError::Api { code, .. } if code == "validation_error")
    }
}

/// Parent reference for page creation. A database parent takes a named title
/// property and optionally a classification property; a page parent takes a
/// plain title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    Page(String),
    Database(String),
}

impl ParentRef {
    pub fn to_value(&self) -> Value {
        match self {
            ParentRef::Page(id) => json!({ "page_id": id }),
            ParentRef::Database(id) => json!({ "database_id": id }),
        }
    }
}

/// Page metadata as returned by the retrieve endpoint.
#[derive(Debug, Clone)]
pub struct RemotePage {
    pub id: String,
    pub title: String,
    pub archived: bool,
}

/// One block from a children listing.
#[derive(Debug, Clone)]
pub struct FetchedBlock {
    pub id: String,
    pub has_children: bool,
    pub block: Block,
}

/// One page of a children listing; the caller must follow the cursor chain
/// until `has_more` is false.
#[derive(Debug, Default)]
pub struct BlockPage {
    pub results: Vec<FetchedBlock>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: String,
    pub object: String,
    pub title: String,
}

#[derive(Debug, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Blocking transport to the remote store, one method per endpoint.
pub trait RemoteApi {
    fn retrieve_page(&self, page_id: &str) -> Result<RemotePage, NotionError>;

    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<BlockPage, NotionError>;

    /// Append up to [`MAX_CHILDREN_PER_REQUEST`] blocks; larger batches must
    /// be chunked by the caller.
    fn append_children(&self, block_id: &str, blocks: &[Block]) -> Result<(), NotionError>;

    fn delete_block(&self, block_id: &str) -> Result<(), NotionError>;

    fn create_page(
        &self,
        parent: &ParentRef,
        properties: &Value,
        children: &[Block],
    ) -> Result<String, NotionError>;

    fn update_page(
        &self,
        page_id: &str,
        properties: Option<&Value>,
        archived: Option<bool>,
    ) -> Result<(), NotionError>;

    fn search(&self, cursor: Option<&str>) -> Result<SearchPage, NotionError>;
}

/// Extract a page title from its `properties` object. Pages carry it under
/// `title`, database rows under whichever property has type `title`.
pub(crate) fn title_from_properties(properties: &Value) -> String {
    let Some(map) = properties.as_object() else {
        return "Untitled".to_string();
    };
    for value in map.values() {
        if value["type"] == "title" || value.get("title").is_some() {
            if let Some(first) = value["title"].as_array().and_then(|a| a.first()) {
                if let Some(text) = first["plain_text"]
                    .as_str()
                    .or_else(|| first["text"]["content"].as_str())
                {
                    return text.to_string();
                }
            }
        }
    }
    "Untitled".to_string()
}
