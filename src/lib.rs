//! Bidirectional sync between a local Markdown tree and a Notion page
//! hierarchy. Push maps directories onto folder pages and documents onto
//! child pages; pull mirrors a remote page tree back onto the filesystem.

pub mod blocks;
pub mod document;
pub mod error;
pub mod markdown;
pub mod notion;
pub mod richtext;
pub mod sync;
pub mod validate;

pub use blocks::Block;
pub use document::Document;
pub use error::SyncError;
pub use richtext::RichText;
pub use sync::{IdentityMap, PullStats, PullSync, PushStats, PushSync};
