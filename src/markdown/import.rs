//! Markdown text to block tree conversion.
//!
//! The event stream from pulldown-cmark is flat, so the tree is built with an
//! explicit stack of open list items plus an auxiliary stack tracking list
//! type (the item event itself does not say bullet vs numbered). Unsupported
//! constructs produce no blocks here; rejecting them is the validator's job.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::blocks::{Block, PLAIN_TEXT_LANGUAGE};
use crate::richtext::InlineCollector;

/// Convert markdown text into an ordered block sequence. Never fails: input
/// the validator rejects simply loses its unsupported constructs.
pub fn to_blocks(markdown: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options);

    let mut builder = TreeBuilder::default();
    for event in parser {
        builder.handle(event);
    }
    builder.finish()
}

#[derive(Clone, Copy)]
enum ListKind {
    Bulleted,
    Numbered,
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Block>,
    /// Open list items; the top is the current insertion container.
    open_items: Vec<Block>,
    /// Bullet/numbered context for items, pushed on list open.
    list_kinds: Vec<ListKind>,
    inline: InlineCollector,
    heading_level: u8,
    /// Fence language and accumulated content while inside a code block.
    code: Option<(String, String)>,
    /// Depth of image tags being skipped (alt text must not leak into runs).
    image_depth: usize,
}

impl TreeBuilder {
    fn handle(&mut self, event: Event) {
        if self.image_depth > 0 {
            match event {
                Event::Start(Tag::Image { .. }) => self.image_depth += 1,
                Event::End(TagEnd::Image) => self.image_depth -= 1,
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                self.heading_level = heading_level_to_int(level);
            }
            Event::End(TagEnd::Heading(_)) => {
                let rich_text = self.inline.take();
                // Levels past 3 clamp rather than fail.
                let level = self.heading_level.clamp(1, 3);
                self.push_block(Block::Heading { level, rich_text });
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                let runs = self.inline.take();
                if runs.is_empty() {
                    return;
                }
                match self.open_items.last_mut() {
                    // The first paragraph of a list item is the item's own
                    // text; later paragraphs become nested children.
                    Some(item) if item.rich_text().is_empty() => item_set_text(item, runs),
                    Some(item) => item_push_child(item, Block::paragraph(runs)),
                    None => self.root.push(Block::paragraph(runs)),
                }
            }
            Event::Start(Tag::List(start)) => {
                self.list_kinds.push(if start.is_some() {
                    ListKind::Numbered
                } else {
                    ListKind::Bulleted
                });
            }
            Event::End(TagEnd::List(_)) => {
                self.list_kinds.pop();
            }
            Event::Start(Tag::Item) => {
                // Defaulting to bulleted should not happen on well-formed
                // input; items always arrive inside an open list.
                let kind = self.list_kinds.last().copied().unwrap_or(ListKind::Bulleted);
                self.open_items.push(match kind {
                    ListKind::Bulleted => Block::BulletedListItem {
                        rich_text: Vec::new(),
                        children: Vec::new(),
                    },
                    ListKind::Numbered => Block::NumberedListItem {
                        rich_text: Vec::new(),
                        children: Vec::new(),
                    },
                });
            }
            Event::End(TagEnd::Item) => {
                // Tight lists deliver item text without paragraph events.
                let runs = self.inline.take();
                if let Some(mut item) = self.open_items.pop() {
                    if !runs.is_empty() {
                        if item.rich_text().is_empty() {
                            item_set_text(&mut item, runs);
                        } else {
                            item_push_child(&mut item, Block::paragraph(runs));
                        }
                    }
                    self.push_block(item);
                }
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .unwrap_or(PLAIN_TEXT_LANGUAGE)
                        .to_string(),
                    CodeBlockKind::Indented => PLAIN_TEXT_LANGUAGE.to_string(),
                };
                self.code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, content)) = self.code.take() {
                    let content = content.trim_end_matches('\n').to_string();
                    self.push_block(Block::Code {
                        language,
                        rich_text: vec![crate::richtext::RichText::plain(content)],
                    });
                }
            }
            Event::Rule => self.push_block(Block::Divider),
            Event::Text(text) => match &mut self.code {
                Some((_, buffer)) => buffer.push_str(&text),
                None => self.inline.push_text(&text),
            },
            Event::Code(text) => self.inline.push_inline_code(&text),
            Event::SoftBreak | Event::HardBreak => self.inline.push_text(" "),
            Event::Start(Tag::Strong) => self.inline.set_bold(true),
            Event::End(TagEnd::Strong) => self.inline.set_bold(false),
            Event::Start(Tag::Emphasis) => self.inline.set_italic(true),
            Event::End(TagEnd::Emphasis) => self.inline.set_italic(false),
            Event::Start(Tag::Strikethrough) => self.inline.set_strikethrough(true),
            Event::End(TagEnd::Strikethrough) => self.inline.set_strikethrough(false),
            Event::Start(Tag::Link { dest_url, .. }) => self.inline.open_link(&dest_url),
            Event::End(TagEnd::Link) => self.inline.close_link(),
            Event::Start(Tag::Image { .. }) => self.image_depth = 1,
            // Tables, HTML, block quotes and anything else unsupported emit
            // no block of their own; their text falls through structurally.
            _ => {}
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.open_items.last_mut() {
            Some(item) => item_push_child(item, block),
            None => self.root.push(block),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        // Unbalanced input could leave items open; attach them anyway.
        while let Some(item) = self.open_items.pop() {
            self.push_block(item);
        }
        self.root
    }
}

fn item_set_text(item: &mut Block, runs: Vec<crate::richtext::RichText>) {
    if let Block::BulletedListItem { rich_text, .. } | Block::NumberedListItem { rich_text, .. } =
        item
    {
        *rich_text = runs;
    }
}

fn item_push_child(item: &mut Block, block: Block) {
    if let Block::BulletedListItem { children, .. } | Block::NumberedListItem { children, .. } =
        item
    {
        children.push(block);
    }
}

fn heading_level_to_int(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
