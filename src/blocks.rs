//! Typed block model mirroring the remote page content schema.
//!
//! Blocks are constructed fresh per conversion call and serialized to the
//! Notion wire format on demand. Exactly one block-type key is populated per
//! wire object, and an empty `children` array is never emitted because the
//! API rejects present-but-empty child lists.

use serde_json::{json, Value};

use crate::richtext::RichText;

/// Fallback language tag for fences with no info string.
pub const PLAIN_TEXT_LANGUAGE: &str = "plain text";

/// One structural unit of page content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph {
        rich_text: Vec<RichText>,
    },
    /// Heading level is clamped to 1..=3 by the markdown importer.
    Heading {
        level: u8,
        rich_text: Vec<RichText>,
    },
    BulletedListItem {
        rich_text: Vec<RichText>,
        children: Vec<Block>,
    },
    NumberedListItem {
        rich_text: Vec<RichText>,
        children: Vec<Block>,
    },
    Code {
        language: String,
        rich_text: Vec<RichText>,
    },
    Divider,
    /// A structural edge to a sub-page; never inlined as content.
    ChildPage {
        title: String,
    },
    /// Remote-only: the markdown importer never produces these, but pull
    /// renders them as task-list items so checkbox state survives.
    ToDo {
        checked: bool,
        rich_text: Vec<RichText>,
    },
    /// Remote-only, rendered as a `>` quote on pull.
    Quote {
        rich_text: Vec<RichText>,
    },
    /// Any remote block type outside the supported dialect. Kept so pull can
    /// fall back to rendering its text; the validator rejects these on push.
    Unsupported {
        block_type: String,
        rich_text: Vec<RichText>,
    },
}

impl Block {
    pub fn paragraph(rich_text: Vec<RichText>) -> Self {
        Block::Paragraph { rich_text }
    }

    /// The wire name of this block's type key.
    pub fn type_name(&self) -> &str {
        match self {
            Block::Paragraph { .. } => "paragraph",
            Block::Heading { level, .. } => match level {
                1 => "heading_1",
                2 => "heading_2",
                _ => "heading_3",
            },
            Block::BulletedListItem { .. } => "bulleted_list_item",
            Block::NumberedListItem { .. } => "numbered_list_item",
            Block::Code { .. } => "code",
            Block::Divider => "divider",
            Block::ChildPage { .. } => "child_page",
            Block::ToDo { .. } => "to_do",
            Block::Quote { .. } => "quote",
            Block::Unsupported { block_type, .. } => block_type,
        }
    }

    pub fn rich_text(&self) -> &[RichText] {
        match self {
            Block::Paragraph { rich_text }
            | Block::Heading { rich_text, .. }
            | Block::BulletedListItem { rich_text, .. }
            | Block::NumberedListItem { rich_text, .. }
            | Block::Code { rich_text, .. }
            | Block::ToDo { rich_text, .. }
            | Block::Quote { rich_text }
            | Block::Unsupported { rich_text, .. } => rich_text,
            Block::Divider | Block::ChildPage { .. } => &[],
        }
    }

    pub fn children(&self) -> &[Block] {
        match self {
            Block::BulletedListItem { children, .. }
            | Block::NumberedListItem { children, .. } => children,
            _ => &[],
        }
    }

    /// Attach fetched children to a block. Only list items carry children in
    /// the local model; anything else drops them (out of the dialect).
    pub fn set_children(&mut self, blocks: Vec<Block>) {
        match self {
            Block::BulletedListItem { children, .. }
            | Block::NumberedListItem { children, .. } => *children = blocks,
            other => {
                if !blocks.is_empty() {
                    log::debug!(
                        "Dropping {} nested blocks under unsupported parent '{}'",
                        blocks.len(),
                        other.type_name()
                    );
                }
            }
        }
    }

    /// Wire representation suitable for page create / append requests.
    pub fn to_value(&self) -> Value {
        let type_name = self.type_name().to_string();
        let payload = match self {
            Block::Paragraph { rich_text } | Block::Heading { rich_text, .. } => {
                json!({ "rich_text": runs_to_value(rich_text) })
            }
            Block::BulletedListItem {
                rich_text,
                children,
            }
            | Block::NumberedListItem {
                rich_text,
                children,
            } => {
                let mut payload = json!({ "rich_text": runs_to_value(rich_text) });
                if !children.is_empty() {
                    payload["children"] =
                        Value::Array(children.iter().map(Block::to_value).collect());
                }
                payload
            }
            Block::Code {
                language,
                rich_text,
            } => json!({
                "rich_text": runs_to_value(rich_text),
                "language": language,
            }),
            Block::Divider => json!({}),
            Block::ChildPage { title } => json!({ "title": title }),
            Block::ToDo {
                checked,
                rich_text,
            } => json!({
                "rich_text": runs_to_value(rich_text),
                "checked": checked,
            }),
            Block::Quote { rich_text } => json!({ "rich_text": runs_to_value(rich_text) }),
            Block::Unsupported { rich_text, .. } => {
                json!({ "rich_text": runs_to_value(rich_text) })
            }
        };
        let mut wire = serde_json::Map::new();
        wire.insert("object".to_string(), json!("block"));
        wire.insert("type".to_string(), json!(type_name));
        wire.insert(type_name, payload);
        Value::Object(wire)
    }

    /// Parse a block object as returned by the children-list endpoint.
    /// Unknown types degrade to [`Block::Unsupported`], keeping whatever
    /// rich text they carry.
    pub fn from_value(value: &Value) -> Self {
        let type_name = value["type"].as_str().unwrap_or_default();
        let payload = &value[type_name];
        let rich_text = runs_from_value(&payload["rich_text"]);
        match type_name {
            "paragraph" => Block::Paragraph { rich_text },
            "heading_1" => Block::Heading {
                level: 1,
                rich_text,
            },
            "heading_2" => Block::Heading {
                level: 2,
                rich_text,
            },
            "heading_3" => Block::Heading {
                level: 3,
                rich_text,
            },
            "bulleted_list_item" => Block::BulletedListItem {
                rich_text,
                children: blocks_from_value(&payload["children"]),
            },
            "numbered_list_item" => Block::NumberedListItem {
                rich_text,
                children: blocks_from_value(&payload["children"]),
            },
            "code" => Block::Code {
                language: payload["language"]
                    .as_str()
                    .unwrap_or(PLAIN_TEXT_LANGUAGE)
                    .to_string(),
                rich_text,
            },
            "divider" => Block::Divider,
            "child_page" => Block::ChildPage {
                title: payload["title"].as_str().unwrap_or("Untitled").to_string(),
            },
            "to_do" => Block::ToDo {
                checked: payload["checked"].as_bool().unwrap_or(false),
                rich_text,
            },
            "quote" => Block::Quote { rich_text },
            other => Block::Unsupported {
                block_type: other.to_string(),
                rich_text,
            },
        }
    }
}

fn runs_to_value(runs: &[RichText]) -> Value {
    Value::Array(runs.iter().map(RichText::to_value).collect())
}

fn runs_from_value(value: &Value) -> Vec<RichText> {
    value
        .as_array()
        .map(|items| items.iter().map(RichText::from_value).collect())
        .unwrap_or_default()
}

fn blocks_from_value(value: &Value) -> Vec<Block> {
    value
        .as_array()
        .map(|items| items.iter().map(Block::from_value).collect())
        .unwrap_or_default()
}
