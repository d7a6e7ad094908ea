//! Tree synchronization engine: identity bookkeeping plus the push and pull
//! orchestrators.

mod idmap;
mod pull;
mod push;

pub use idmap::IdentityMap;
pub use pull::{PullStats, PullSync};
pub use push::{PushStats, PushSync};

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

/// Name of the document that represents a directory's own page.
pub const INDEX_FILE: &str = "index.md";

/// All markdown files under `root`, in lexicographic path order. Duplicate
/// identity resolution depends on this order being stable.
pub fn markdown_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
        .map(|entry| entry.into_path())
        .collect()
}
