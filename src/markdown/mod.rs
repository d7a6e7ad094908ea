//! Markdown ⇄ block tree transcoding.

mod export;
mod import;

pub use export::to_markdown;
pub use import::to_blocks;
