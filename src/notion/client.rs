//! HTTP transport for the Notion API.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::blocks::Block;

use super::{
    title_from_properties, BlockPage, FetchedBlock, NotionError, ParentRef, RemoteApi, RemotePage,
    SearchPage, SearchResult,
};

const BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: usize = 100;

pub struct NotionClient {
    http: Client,
    token: String,
    base_url: String,
}

impl NotionClient {
    pub fn new(token: &str) -> Result<Self, NotionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            token: token.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode the JSON body, mapping non-success statuses
    /// to a structured [`NotionError::Api`].
    fn send(&self, request: RequestBuilder) -> Result<Value, NotionError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }

        let body: Value = response.json().unwrap_or(Value::Null);
        Err(api_error(status, &body))
    }
}

fn api_error(status: StatusCode, body: &Value) -> NotionError {
    NotionError::Api {
        status: status.as_u16(),
        code: body["code"].as_str().unwrap_or("unknown").to_string(),
        message: body["message"].as_str().unwrap_or_default().to_string(),
    }
}

fn block_page_from_value(body: &Value) -> Result<BlockPage, NotionError> {
    let results = body["results"]
        .as_array()
        .ok_or_else(|| NotionError::Malformed("children list without results".to_string()))?;
    Ok(BlockPage {
        results: results
            .iter()
            .map(|value| FetchedBlock {
                id: value["id"].as_str().unwrap_or_default().to_string(),
                has_children: value["has_children"].as_bool().unwrap_or(false),
                block: Block::from_value(value),
            })
            .collect(),
        has_more: body["has_more"].as_bool().unwrap_or(false),
        next_cursor: body["next_cursor"].as_str().map(str::to_string),
    })
}

impl RemoteApi for NotionClient {
    fn retrieve_page(&self, page_id: &str) -> Result<RemotePage, NotionError> {
        let body = self.send(self.http.get(self.url(&format!("pages/{page_id}"))))?;
        let id = body["id"]
            .as_str()
            .ok_or_else(|| NotionError::Malformed("page without id".to_string()))?;
        Ok(RemotePage {
            id: id.to_string(),
            title: title_from_properties(&body["properties"]),
            archived: body["archived"].as_bool().unwrap_or(false),
        })
    }

    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<BlockPage, NotionError> {
        let mut request = self
            .http
            .get(self.url(&format!("blocks/{block_id}/children")))
            .query(&[("page_size", PAGE_SIZE.to_string())]);
        if let Some(cursor) = cursor {
            request = request.query(&[("start_cursor", cursor)]);
        }
        block_page_from_value(&self.send(request)?)
    }

    fn append_children(&self, block_id: &str, blocks: &[Block]) -> Result<(), NotionError> {
        let children: Vec<Value> = blocks.iter().map(Block::to_value).collect();
        self.send(
            self.http
                .patch(self.url(&format!("blocks/{block_id}/children")))
                .json(&json!({ "children": children })),
        )?;
        Ok(())
    }

    fn delete_block(&self, block_id: &str) -> Result<(), NotionError> {
        self.send(self.http.delete(self.url(&format!("blocks/{block_id}"))))?;
        Ok(())
    }

    fn create_page(
        &self,
        parent: &ParentRef,
        properties: &Value,
        children: &[Block],
    ) -> Result<String, NotionError> {
        let children: Vec<Value> = children.iter().map(Block::to_value).collect();
        let body = self.send(self.http.post(self.url("pages")).json(&json!({
            "parent": parent.to_value(),
            "properties": properties,
            "children": children,
        })))?;
        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| NotionError::Malformed("created page without id".to_string()))
    }

    fn update_page(
        &self,
        page_id: &str,
        properties: Option<&Value>,
        archived: Option<bool>,
    ) -> Result<(), NotionError> {
        let mut payload = serde_json::Map::new();
        if let Some(properties) = properties {
            payload.insert("properties".to_string(), properties.clone());
        }
        if let Some(archived) = archived {
            payload.insert("archived".to_string(), Value::Bool(archived));
        }
        self.send(
            self.http
                .patch(self.url(&format!("pages/{page_id}")))
                .json(&Value::Object(payload)),
        )?;
        Ok(())
    }

    fn search(&self, cursor: Option<&str>) -> Result<SearchPage, NotionError> {
        let mut payload = json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            payload["start_cursor"] = json!(cursor);
        }
        let body = self.send(self.http.post(self.url("search")).json(&payload))?;
        let results = body["results"]
            .as_array()
            .ok_or_else(|| NotionError::Malformed("search without results".to_string()))?;
        Ok(SearchPage {
            results: results
                .iter()
                .map(|value| {
                    let object = value["object"].as_str().unwrap_or("unknown").to_string();
                    let title = if object == "database" {
                        value["title"]
                            .as_array()
                            .and_then(|a| a.first())
                            .and_then(|t| t["plain_text"].as_str())
                            .unwrap_or("Untitled")
                            .to_string()
                    } else {
                        title_from_properties(&value["properties"])
                    };
                    SearchResult {
                        id: value["id"].as_str().unwrap_or_default().to_string(),
                        object,
                        title,
                    }
                })
                .collect(),
            has_more: body["has_more"].as_bool().unwrap_or(false),
            next_cursor: body["next_cursor"].as_str().map(str::to_string),
        })
    }
}
