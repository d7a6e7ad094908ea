//! In-memory [`RemoteApi`] implementation for tests. Pages live in a shared
//! store behind `Rc<RefCell>` so a test can keep a handle for assertions
//! while the code under test owns a clone. Call counters record the request
//! pattern, and `page_size` is small and tunable so cursor chains are
//! exercised without thousands of fixtures.

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use uuid::Uuid;

use crate::blocks::Block;

use super::{
    BlockPage, FetchedBlock, NotionError, ParentRef, RemoteApi, RemotePage, SearchPage,
    SearchResult,
};

#[derive(Debug, Clone)]
pub struct FakePage {
    pub parent: Option<String>,
    pub title: String,
    pub blocks: Vec<(String, Block)>,
    pub child_ids: Vec<String>,
    pub archived: bool,
    pub topic: Option<String>,
}

#[derive(Debug, Default)]
pub struct State {
    pub pages: HashMap<String, FakePage>,
    page_order: Vec<String>,
    next_id: u128,
    pub page_size: usize,
    pub create_calls: usize,
    pub create_children_sizes: Vec<usize>,
    pub append_batches: Vec<usize>,
    pub list_calls: usize,
    pub delete_calls: usize,
    pub reject_topic: bool,
    /// Listing this block id fails with a server error.
    pub fail_list_for: Option<String>,
    /// Append calls fail once this many have succeeded.
    pub fail_append_after: Option<usize>,
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        Uuid::from_u128(self.next_id).to_string()
    }

    fn insert_page(&mut self, id: &str, parent: Option<&str>, title: &str, blocks: Vec<Block>) {
        let blocks = blocks
            .into_iter()
            .map(|block| {
                let block_id = format!("blk-{}", self.next_id());
                (block_id, block)
            })
            .collect();
        self.pages.insert(
            id.to_string(),
            FakePage {
                parent: parent.map(str::to_string),
                title: title.to_string(),
                blocks,
                child_ids: Vec::new(),
                archived: false,
                topic: None,
            },
        );
        self.page_order.push(id.to_string());
        if let Some(parent) = parent {
            if let Some(page) = self.pages.get_mut(parent) {
                page.child_ids.push(id.to_string());
            }
        }
    }
}

fn not_found(what: &str) -> NotionError {
    NotionError::Api {
        status: 404,
        code: "object_not_found".to_string(),
        message: format!("Could not find {what}"),
    }
}

fn server_error() -> NotionError {
    NotionError::Api {
        status: 500,
        code: "internal_server_error".to_string(),
        message: "something went wrong".to_string(),
    }
}

#[derive(Clone)]
pub struct FakeApi(Rc<RefCell<State>>);

impl FakeApi {
    /// Fresh store containing one root page with the given id.
    pub fn with_root(root_id: &str) -> Self {
        let api = FakeApi(Rc::new(RefCell::new(State {
            page_size: 100,
            ..State::default()
        })));
        api.state_mut().insert_page(root_id, None, "Root", Vec::new());
        api
    }

    pub fn state(&self) -> Ref<'_, State> {
        self.0.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, State> {
        self.0.borrow_mut()
    }

    pub fn add_page(&self, id: &str, parent: Option<&str>, title: &str, blocks: Vec<Block>) {
        self.state_mut().insert_page(id, parent, title, blocks);
    }
}

impl RemoteApi for FakeApi {
    fn retrieve_page(&self, page_id: &str) -> Result<RemotePage, NotionError> {
        let state = self.0.borrow();
        let page = state.pages.get(page_id).ok_or_else(|| not_found("page"))?;
        Ok(RemotePage {
            id: page_id.to_string(),
            title: page.title.clone(),
            archived: page.archived,
        })
    }

    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<BlockPage, NotionError> {
        let mut state = self.0.borrow_mut();
        state.list_calls += 1;
        if state.fail_list_for.as_deref() == Some(block_id) {
            return Err(server_error());
        }
        let page_size = state.page_size;
        let page = state.pages.get(block_id).ok_or_else(|| not_found("block"))?;

        // Content blocks first, then child-page edges, mirroring how the
        // sync engine writes them.
        let mut all: Vec<FetchedBlock> = page
            .blocks
            .iter()
            .map(|(id, block)| FetchedBlock {
                id: id.clone(),
                has_children: false,
                block: block.clone(),
            })
            .collect();
        for child_id in &page.child_ids {
            if let Some(child) = state.pages.get(child_id) {
                all.push(FetchedBlock {
                    id: child_id.clone(),
                    has_children: true,
                    block: Block::ChildPage {
                        title: child.title.clone(),
                    },
                });
            }
        }

        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + page_size).min(all.len());
        let has_more = end < all.len();
        Ok(BlockPage {
            results: all[start..end].to_vec(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    fn append_children(&self, block_id: &str, blocks: &[Block]) -> Result<(), NotionError> {
        let mut state = self.0.borrow_mut();
        if !state.pages.contains_key(block_id) {
            return Err(not_found("block"));
        }
        if let Some(limit) = state.fail_append_after {
            if state.append_batches.len() >= limit {
                return Err(server_error());
            }
        }
        state.append_batches.push(blocks.len());
        let with_ids: Vec<(String, Block)> = blocks
            .iter()
            .map(|block| (format!("blk-{}", state.next_id()), block.clone()))
            .collect();
        if let Some(page) = state.pages.get_mut(block_id) {
            page.blocks.extend(with_ids);
        }
        Ok(())
    }

    fn delete_block(&self, block_id: &str) -> Result<(), NotionError> {
        let mut state = self.0.borrow_mut();
        for page in state.pages.values_mut() {
            if let Some(pos) = page.blocks.iter().position(|(id, _)| id == block_id) {
                page.blocks.remove(pos);
                state.delete_calls += 1;
                return Ok(());
            }
        }
        Err(not_found("block"))
    }

    fn create_page(
        &self,
        parent: &ParentRef,
        properties: &Value,
        children: &[Block],
    ) -> Result<String, NotionError> {
        let mut state = self.0.borrow_mut();
        state.create_calls += 1;

        let topic = properties["Topic"]["select"]["name"]
            .as_str()
            .map(str::to_string);
        if state.reject_topic && topic.is_some() {
            return Err(NotionError::Api {
                status: 400,
                code: "validation_error".to_string(),
                message: "Topic is not a property that exists".to_string(),
            });
        }
        state.create_children_sizes.push(children.len());

        let title = properties
            .as_object()
            .and_then(|map| map.values().find(|v| v.get("title").is_some()))
            .and_then(|v| v["title"][0]["text"]["content"].as_str())
            .unwrap_or("Untitled")
            .to_string();
        let parent_id = match parent {
            ParentRef::Page(id) | ParentRef::Database(id) => id.clone(),
        };

        let id = state.next_id();
        state.insert_page(&id, Some(&parent_id), &title, children.to_vec());
        if let Some(page) = state.pages.get_mut(&id) {
            page.topic = topic;
        }
        Ok(id)
    }

    fn update_page(
        &self,
        page_id: &str,
        properties: Option<&Value>,
        archived: Option<bool>,
    ) -> Result<(), NotionError> {
        let mut state = self.0.borrow_mut();
        let page = state
            .pages
            .get_mut(page_id)
            .ok_or_else(|| not_found("page"))?;
        if let Some(properties) = properties {
            if let Some(title) = properties["title"]["title"][0]["text"]["content"].as_str() {
                page.title = title.to_string();
            }
        }
        if let Some(archived) = archived {
            page.archived = archived;
        }
        Ok(())
    }

    fn search(&self, cursor: Option<&str>) -> Result<SearchPage, NotionError> {
        let state = self.0.borrow();
        let all: Vec<SearchResult> = state
            .page_order
            .iter()
            .filter_map(|id| {
                state.pages.get(id).map(|page| SearchResult {
                    id: id.clone(),
                    object: "page".to_string(),
                    title: page.title.clone(),
                })
            })
            .collect();

        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + state.page_size).min(all.len());
        let has_more = end < all.len();
        Ok(SearchPage {
            results: all[start..end].to_vec(),
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }
}
