//! Page-level operations layered over the raw [`RemoteApi`]: cursor chains
//! are always drained, block batches are chunked to the API limit, and the
//! two narrow retry behaviors (stale identity, rejected classification
//! property) live here.

use log::{debug, error, info, warn};
use serde_json::{json, Value};

use crate::blocks::Block;

use super::{FetchedBlock, NotionError, ParentRef, RemoteApi, RemotePage, SearchResult};

/// The API accepts at most this many child blocks per create or append call.
pub const MAX_CHILDREN_PER_REQUEST: usize = 100;

pub struct PageOps<T: RemoteApi> {
    api: T,
}

impl<T: RemoteApi> PageOps<T> {
    pub fn new(api: T) -> Self {
        Self { api }
    }

    /// Retrieve a page, mapping any failure to `None` with a warning. Used
    /// where a missing page is an expected condition, not a fault.
    pub fn get_page(&self, page_id: &str) -> Option<RemotePage> {
        match self.api.retrieve_page(page_id) {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Could not retrieve page {page_id}: {e}");
                None
            }
        }
    }

    /// Fetch every block under a page or block, draining the cursor chain
    /// and descending into nested children. Child pages are collected as
    /// edges, never descended into.
    pub fn get_all_blocks(&self, block_id: &str) -> Result<Vec<FetchedBlock>, NotionError> {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.api.list_children(block_id, cursor.as_deref())?;
            for mut fetched in page.results {
                if fetched.has_children && !matches!(fetched.block, Block::ChildPage { .. }) {
                    let nested = self.get_all_blocks(&fetched.id)?;
                    fetched
                        .block
                        .set_children(nested.into_iter().map(|f| f.block).collect());
                }
                results.push(fetched);
            }
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }
        Ok(results)
    }

    /// Find a child page with the given title directly under `parent_id`.
    pub fn find_child_page(
        &self,
        parent_id: &str,
        title: &str,
    ) -> Result<Option<String>, NotionError> {
        let mut cursor: Option<String> = None;
        loop {
            let page = self.api.list_children(parent_id, cursor.as_deref())?;
            for fetched in &page.results {
                if let Block::ChildPage { title: t } = &fetched.block {
                    if t == title {
                        return Ok(Some(fetched.id.clone()));
                    }
                }
            }
            if !page.has_more {
                return Ok(None);
            }
            cursor = page.next_cursor;
        }
    }

    /// Create an empty folder page under a parent page.
    pub fn create_child_page(&self, parent_id: &str, title: &str) -> Result<String, NotionError> {
        self.create_page(&ParentRef::Page(parent_id.to_string()), title, &[], None)
    }

    /// Create a page with its content. The first batch of blocks rides along
    /// with the create call; the remainder is appended in chunks. If an
    /// append fails the page exists but is incomplete, and the error
    /// propagates so the caller reports the file as failed.
    ///
    /// `topic` is an optional classification property that only exists on
    /// database parents; if the database rejects it, the create is retried
    /// exactly once without it.
    pub fn create_page(
        &self,
        parent: &ParentRef,
        title: &str,
        blocks: &[Block],
        topic: Option<&str>,
    ) -> Result<String, NotionError> {
        let title_key = match parent {
            ParentRef::Page(_) => "title",
            ParentRef::Database(_) => "Name",
        };
        let mut properties = serde_json::Map::new();
        properties.insert(
            title_key.to_string(),
            json!({ "title": [{ "text": { "content": title } }] }),
        );
        if let (Some(topic), ParentRef::Database(_)) = (topic, parent) {
            properties.insert("Topic".to_string(), json!({ "select": { "name": topic } }));
        }

        let initial = &blocks[..blocks.len().min(MAX_CHILDREN_PER_REQUEST)];
        let remaining = &blocks[initial.len()..];

        let page_id = match self
            .api
            .create_page(parent, &Value::Object(properties.clone()), initial)
        {
            Ok(id) => id,
            Err(e)
                if properties.contains_key("Topic") && e.is_validation_rejection() =>
            {
                warn!(
                    "Failed to create page with Topic '{}'; retrying without it ({e})",
                    topic.unwrap_or_default()
                );
                properties.remove("Topic");
                self.api
                    .create_page(parent, &Value::Object(properties), initial)?
            }
            Err(e) => {
                error!("Failed to create page: {e}");
                return Err(e);
            }
        };

        info!("Created new page {page_id} with {} blocks", initial.len());

        if !remaining.is_empty() {
            if let Err(e) = self.append_blocks(&page_id, remaining) {
                error!("Page {page_id} created, but failed to append remaining blocks: {e}");
                return Err(e);
            }
        }

        Ok(page_id)
    }

    /// Replace a page's content: clear its existing blocks, then append the
    /// new ones in batches.
    pub fn update_page(&self, page_id: &str, blocks: &[Block]) -> Result<(), NotionError> {
        self.clear_page_content(page_id)?;
        self.append_blocks(page_id, blocks)
    }

    /// Append blocks in chunks no larger than the API limit.
    pub fn append_blocks(&self, page_id: &str, blocks: &[Block]) -> Result<(), NotionError> {
        for chunk in blocks.chunks(MAX_CHILDREN_PER_REQUEST) {
            self.api.append_children(page_id, chunk)?;
            debug!("Appended batch of {} blocks to {page_id}", chunk.len());
        }
        Ok(())
    }

    /// Delete a page's content blocks. Child pages are structural edges, not
    /// content, and are left in place. Individual delete failures are logged
    /// and skipped so one stuck block does not abort the update.
    pub fn clear_page_content(&self, page_id: &str) -> Result<(), NotionError> {
        // Drain the full listing before deleting anything; deleting while
        // following cursors would skip blocks.
        let mut to_delete = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.api.list_children(page_id, cursor.as_deref())?;
            for fetched in page.results {
                if !matches!(fetched.block, Block::ChildPage { .. }) {
                    to_delete.push(fetched.id);
                }
            }
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }

        debug!("Clearing {} blocks from {page_id}", to_delete.len());
        for block_id in to_delete {
            if let Err(e) = self.api.delete_block(&block_id) {
                warn!("Failed to delete block {block_id}: {e}");
            }
        }
        Ok(())
    }

    pub fn archive_page(&self, page_id: &str) -> Result<(), NotionError> {
        self.api.update_page(page_id, None, Some(true))?;
        info!("Archived page {page_id}");
        Ok(())
    }

    /// Drain the search endpoint; operator tooling only.
    pub fn search_all(&self) -> Result<Vec<SearchResult>, NotionError> {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.api.search(cursor.as_deref())?;
            results.extend(page.results);
            if !page.has_more {
                return Ok(results);
            }
            cursor = page.next_cursor;
        }
    }
}
