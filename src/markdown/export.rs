//! Block tree to markdown text conversion, the inverse of [`super::import`].

use crate::blocks::Block;
use crate::richtext::{self, RichText};

/// Render a block sequence to markdown, one blank line between blocks.
pub fn to_markdown(blocks: &[Block]) -> String {
    let rendered: Vec<String> = blocks.iter().map(render_block).collect();
    rendered.join("\n\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph { rich_text } => richtext::render(rich_text),
        Block::Heading { level, rich_text } => {
            let marker = "#".repeat((*level).clamp(1, 3) as usize);
            format!("{marker} {}", richtext::render(rich_text))
        }
        Block::BulletedListItem {
            rich_text,
            children,
        } => with_children(format!("- {}", richtext::render(rich_text)), children),
        // Always `1.`; ordering is positional and renderers renumber.
        Block::NumberedListItem {
            rich_text,
            children,
        } => with_children(format!("1. {}", richtext::render(rich_text)), children),
        Block::Code {
            language,
            rich_text,
        } => {
            let content: String = rich_text.iter().map(|r| r.content.as_str()).collect();
            format!("```{language}\n{content}\n```")
        }
        Block::Divider => "---".to_string(),
        // Sub-pages are structural edges; the pull orchestrator turns them
        // into files, so the text rendering is just a placeholder label.
        Block::ChildPage { title } => format!("[{title}](subpage)"),
        Block::ToDo {
            checked,
            rich_text,
        } => {
            let mark = if *checked { "x" } else { " " };
            format!("- [{mark}] {}", richtext::render(rich_text))
        }
        Block::Quote { rich_text } => format!("> {}", richtext::render(rich_text)),
        Block::Unsupported {
            block_type,
            rich_text,
        } => {
            log::debug!("Rendering unsupported block type '{block_type}' as plain text");
            richtext::render(rich_text)
        }
    }
}

/// Nested paragraph children render indented under their list item so they
/// re-parse as children of the same item.
fn with_children(mut line: String, children: &[Block]) -> String {
    for child in children {
        if let Block::Paragraph { rich_text } = child {
            let indented = richtext::render(rich_text)
                .lines()
                .map(|l| format!("    {l}"))
                .collect::<Vec<_>>()
                .join("\n");
            line.push_str("\n\n");
            line.push_str(&indented);
        } else {
            log::debug!(
                "Skipping nested '{}' under list item during render",
                child.type_name()
            );
        }
    }
    line
}
