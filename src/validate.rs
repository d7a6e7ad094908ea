//! Static checks run before any remote mutation is attempted.
//!
//! Three layers, matching the push pipeline: raw markdown (unsupported
//! constructs), frontmatter (identity format), and the converted block tree
//! (remote schema limits). Each returns plain error strings; an empty list
//! means the document passed.

use pulldown_cmark::{Event, Options, Parser, Tag};
use uuid::Uuid;

use crate::blocks::Block;
use crate::document::Document;

/// Maximum code points per rich text run accepted by the remote API.
pub const MAX_TEXT_LENGTH: usize = 2000;

/// Hard failures over raw markdown. Tables and raw HTML have no block
/// representation, so they are rejected outright rather than degraded.
pub fn validate_markdown(content: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if content.trim().is_empty() {
        errors.push("Markdown content is empty.".to_string());
        return errors;
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    for (event, range) in Parser::new_ext(content, options).into_offset_iter() {
        let message = match event {
            Event::Start(Tag::Table(_)) => "Tables are not supported.",
            Event::Start(Tag::HtmlBlock) => "HTML blocks are not supported.",
            Event::InlineHtml(_) => "Inline HTML is not supported.",
            _ => continue,
        };
        errors.push(format!(
            "Line {}: {}",
            line_of(content, range.start),
            message
        ));
    }

    errors
}

/// Non-blocking warnings over raw markdown. Overlong runs are warned about
/// here and hard-failed by [`validate_blocks`] after conversion.
pub fn markdown_warnings(content: &str) -> Vec<String> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut warnings = Vec::new();
    for (event, range) in Parser::new_ext(content, options).into_offset_iter() {
        let len = match &event {
            Event::Text(text) => text.chars().count(),
            Event::Code(text) => text.chars().count(),
            _ => continue,
        };
        if len > MAX_TEXT_LENGTH {
            warnings.push(format!(
                "Line {}: Text run exceeds {} characters and will be rejected by the remote API.",
                line_of(content, range.start),
                MAX_TEXT_LENGTH
            ));
        }
    }
    warnings
}

/// Frontmatter checks: a stored identity must be a syntactically valid UUID,
/// hyphenated or bare.
pub fn validate_frontmatter(doc: &Document) -> Vec<String> {
    let mut errors = Vec::new();
    if let Some(id) = &doc.identity {
        if Uuid::parse_str(id).is_err() {
            errors.push(format!("Invalid {} format: {id}", crate::document::IDENTITY_KEY));
        }
    }
    errors
}

/// Hard checks over the converted block tree.
pub fn validate_blocks(blocks: &[Block]) -> Vec<String> {
    let mut errors = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        walk_block(block, &format!("#{index}"), &mut errors);
    }
    errors
}

fn walk_block(block: &Block, position: &str, errors: &mut Vec<String>) {
    if let Block::Unsupported { block_type, .. } = block {
        errors.push(format!(
            "Block {position}: unsupported block type '{block_type}'."
        ));
    }
    for (run_index, run) in block.rich_text().iter().enumerate() {
        let len = run.content.chars().count();
        if len > MAX_TEXT_LENGTH {
            errors.push(format!(
                "Block {position} ({}) run #{run_index}: text exceeds {MAX_TEXT_LENGTH} characters.",
                block.type_name()
            ));
        }
    }
    for (child_index, child) in block.children().iter().enumerate() {
        walk_block(child, &format!("{position}.{child_index}"), errors);
    }
}

fn line_of(content: &str, offset: usize) -> usize {
    content[..offset.min(content.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1
}
