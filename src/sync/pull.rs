//! Remote-to-local sync: walk the remote page tree from a root and mirror it
//! onto the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::blocks::Block;
use crate::document::Document;
use crate::error::SyncError;
use crate::markdown::to_markdown;
use crate::notion::{PageOps, RemoteApi};

use super::{IdentityMap, INDEX_FILE};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PullStats {
    pub written: usize,
    pub failed: usize,
}

pub struct PullSync<T: RemoteApi> {
    ops: PageOps<T>,
    source_dir: PathBuf,
    id_map: IdentityMap,
}

impl<T: RemoteApi> PullSync<T> {
    /// Scans the target directory up front so pages that were pushed from
    /// here land back in their original files.
    pub fn new(ops: PageOps<T>, source_dir: &Path) -> Self {
        Self {
            ops,
            source_dir: source_dir.to_path_buf(),
            id_map: IdentityMap::scan(source_dir),
        }
    }

    #[cfg(test)]
    pub fn identity_map(&self) -> &IdentityMap {
        &self.id_map
    }

    /// Mirror the tree under `root_page_id` into the source directory. A
    /// page that cannot be fetched or written fails with its subtree and
    /// the walk continues with the remaining siblings.
    pub fn run(&mut self, root_page_id: &str) -> Result<PullStats, SyncError> {
        fs::create_dir_all(&self.source_dir)?;
        if let Some(page) = self.ops.get_page(root_page_id) {
            if page.archived {
                warn!("Root page '{}' is archived", page.title);
            }
            info!(
                "Pulling '{}' into {}",
                page.title,
                self.source_dir.display()
            );
        }
        let stats = self.process_page(root_page_id, "index", &self.source_dir.clone(), true);
        info!(
            "Pull complete: {} pages written, {} failed",
            stats.written, stats.failed
        );
        Ok(stats)
    }

    fn process_page(
        &mut self,
        page_id: &str,
        title: &str,
        base_dir: &Path,
        is_root: bool,
    ) -> PullStats {
        let (target, edges) = match self.mirror_page(page_id, title, base_dir, is_root) {
            Ok(mirrored) => mirrored,
            Err(e) => {
                error!("Skipping page {page_id} and its subtree: {e}");
                return PullStats {
                    written: 0,
                    failed: 1,
                };
            }
        };

        let child_base = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.source_dir.clone());
        let mut stats = PullStats {
            written: 1,
            failed: 0,
        };
        for (child_id, child_title) in edges {
            let child = self.process_page(&child_id, &child_title, &child_base, false);
            stats.written += child.written;
            stats.failed += child.failed;
        }
        stats
    }

    /// Fetch one page, resolve its local path and write it. Returns the
    /// written path plus the child-page edges to recurse into.
    fn mirror_page(
        &mut self,
        page_id: &str,
        title: &str,
        base_dir: &Path,
        is_root: bool,
    ) -> Result<(PathBuf, Vec<(String, String)>), SyncError> {
        let fetched = self.ops.get_all_blocks(page_id)?;

        // Child pages are tree edges to recurse into, not content.
        let mut content = Vec::new();
        let mut edges = Vec::new();
        for item in fetched {
            match item.block {
                Block::ChildPage { title } => edges.push((item.id, title)),
                block => content.push(block),
            }
        }
        let has_children = !edges.is_empty();

        let target = if is_root {
            base_dir.join(INDEX_FILE)
        } else if let Some(existing) = self.id_map.get(page_id).map(Path::to_path_buf) {
            let is_index = existing
                .file_name()
                .is_some_and(|name| name == INDEX_FILE);
            if has_children && !is_index {
                self.promote(&existing)?
            } else {
                existing
            }
        } else {
            let name = sanitize_filename(title);
            if has_children {
                let page_dir = base_dir.join(&name);
                fs::create_dir_all(&page_dir)?;
                page_dir.join(INDEX_FILE)
            } else {
                base_dir.join(format!("{name}.md"))
            }
        };

        self.write_document(&target, page_id, title, &content, is_root)?;
        self.id_map.set_path(page_id, target.clone());
        Ok((target, edges))
    }

    /// Turn a flat document into a directory with an index document, because
    /// its page gained children remotely.
    fn promote(&mut self, existing: &Path) -> Result<PathBuf, SyncError> {
        let dir = existing.with_extension("");
        fs::create_dir_all(&dir)?;
        let target = dir.join(INDEX_FILE);
        fs::rename(existing, &target)?;
        info!(
            "Promoted {} to {}",
            existing.display(),
            target.display()
        );
        Ok(target)
    }

    /// Existing files keep their title and other frontmatter; only identity
    /// and body are overwritten.
    fn write_document(
        &self,
        target: &Path,
        page_id: &str,
        title: &str,
        content: &[Block],
        is_root: bool,
    ) -> Result<(), SyncError> {
        let mut doc = if target.exists() {
            Document::load(target)?
        } else {
            Document::new(None, (!is_root).then_some(title), "")
        };
        doc.set_identity(page_id);
        doc.body = to_markdown(content);
        doc.save(target)?;
        debug!("Wrote {}", target.display());
        Ok(())
    }
}

/// Title to filename: keep alphanumerics and ` ._-`, spaces become
/// underscores, everything else is dropped.
fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "Untitled".to_string()
    } else {
        cleaned
    }
}
