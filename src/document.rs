//! Local document format: a YAML frontmatter block followed by a markdown
//! body. The sync engine only ever rewrites the `notion_page_id` field;
//! every other frontmatter key round-trips untouched.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use thiserror::Error;

/// Frontmatter key holding the remote page identity.
pub const IDENTITY_KEY: &str = "notion_page_id";

#[derive(Serialize, Deserialize, Default)]
struct Frontmatter {
    #[serde(skip_serializing_if = "Option::is_none")]
    notion_page_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(flatten)]
    extra: Mapping,
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One markdown file with its parsed frontmatter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Remote page id, if this document has been synced before.
    pub identity: Option<String>,
    pub title: Option<String>,
    /// Frontmatter keys other than identity and title, preserved verbatim.
    pub extra: Mapping,
    pub body: String,
}

impl Document {
    pub fn new(identity: Option<&str>, title: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            identity: identity.map(str::to_string),
            title: title.map(str::to_string),
            extra: Mapping::new(),
            body: body.into(),
        }
    }

    /// Parse file content. Text without a leading `---` delimiter is all body.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let Some(rest) = text.strip_prefix("---\n").or_else(|| text.strip_prefix("---\r\n"))
        else {
            return Ok(Self {
                body: text.to_string(),
                ..Self::default()
            });
        };
        let Some(end) = rest.find("\n---") else {
            return Ok(Self {
                body: text.to_string(),
                ..Self::default()
            });
        };

        let yaml = &rest[..end];
        let body = rest[end + 4..].trim_start_matches(['\r', '\n']).to_string();

        let frontmatter: Frontmatter = if yaml.trim().is_empty() {
            Frontmatter::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        Ok(Self {
            identity: frontmatter.notion_page_id.filter(|s| !s.is_empty()),
            title: frontmatter.title.filter(|s| !s.is_empty()),
            extra: frontmatter.extra,
            body,
        })
    }

    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Serialize back to file content. Identity and title lead the
    /// frontmatter, followed by any preserved keys.
    pub fn to_text(&self) -> Result<String, DocumentError> {
        let mut body = self.body.clone();
        if !body.ends_with('\n') {
            body.push('\n');
        }

        if self.identity.is_none() && self.title.is_none() && self.extra.is_empty() {
            return Ok(body);
        }

        let yaml = serde_yaml::to_string(&Frontmatter {
            notion_page_id: self.identity.clone(),
            title: self.title.clone(),
            extra: self.extra.clone(),
        })?;
        Ok(format!("---\n{yaml}---\n\n{body}"))
    }

    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        fs::write(path, self.to_text()?)?;
        Ok(())
    }

    pub fn set_identity(&mut self, id: &str) {
        self.identity = Some(id.to_string());
    }
}
