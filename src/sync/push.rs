//! Local-to-remote sync: walk the file tree, resolve folder pages, create or
//! update one remote page per document.
//!
//! Remote pages whose local file was removed are never cleaned up here; that
//! is an intentional limitation of push mode, not an oversight.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::document::Document;
use crate::error::SyncError;
use crate::markdown::to_blocks;
use crate::notion::{PageOps, ParentRef, RemoteApi};
use crate::validate::{markdown_warnings, validate_blocks, validate_frontmatter, validate_markdown};

use super::markdown_files;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PushStats {
    pub processed: usize,
    pub synced: usize,
    pub failed: usize,
}

pub struct PushSync<T: RemoteApi> {
    /// `None` only in dry-run mode, where no remote call is ever made.
    ops: Option<PageOps<T>>,
    root_page_id: String,
    source_dir: PathBuf,
    dry_run: bool,
    /// (parent id, folder name) -> folder page id, scoped to this run.
    folder_cache: HashMap<(String, String), String>,
}

impl<T: RemoteApi> PushSync<T> {
    pub fn new(
        ops: Option<PageOps<T>>,
        root_page_id: &str,
        source_dir: &Path,
        dry_run: bool,
    ) -> Self {
        Self {
            ops,
            root_page_id: root_page_id.to_string(),
            source_dir: source_dir.to_path_buf(),
            dry_run,
            folder_cache: HashMap::new(),
        }
    }

    fn remote(&self) -> Result<&PageOps<T>, SyncError> {
        self.ops.as_ref().ok_or(SyncError::NotConfigured)
    }

    /// Sync every document under the source directory. Per-file failures are
    /// recorded and the run continues; the error return is reserved for
    /// being unable to run at all.
    pub fn run(&mut self) -> Result<PushStats, SyncError> {
        if !self.dry_run {
            self.remote()?;
        }

        let files = markdown_files(&self.source_dir);
        info!(
            "Syncing {} files from {}",
            files.len(),
            self.source_dir.display()
        );

        let mut outcomes: Vec<(PathBuf, Result<String, SyncError>)> = Vec::new();
        for path in files {
            let outcome = self.sync_file(&path);
            if let Err(e) = &outcome {
                error!("{}: {e}", path.display());
            }
            outcomes.push((path, outcome));
        }

        // Two files resolving to the same page means neither can be trusted
        // to own it, so both are failed.
        let mut claims: HashMap<String, usize> = HashMap::new();
        for (_, outcome) in &outcomes {
            if let Ok(id) = outcome {
                *claims.entry(id.clone()).or_default() += 1;
            }
        }
        for (path, outcome) in &mut outcomes {
            if let Ok(id) = outcome {
                if claims.get(id.as_str()).copied().unwrap_or(0) > 1 {
                    let dup = SyncError::DuplicateIdentity(id.clone());
                    error!("{}: {dup}", path.display());
                    *outcome = Err(dup);
                }
            }
        }

        let stats = PushStats {
            processed: outcomes.len(),
            synced: outcomes.iter().filter(|(_, o)| o.is_ok()).count(),
            failed: outcomes.iter().filter(|(_, o)| o.is_err()).count(),
        };
        info!(
            "Push complete: {} processed, {} synced, {} failed",
            stats.processed, stats.synced, stats.failed
        );
        Ok(stats)
    }

    /// Sync one document; returns the remote page id it now maps to.
    fn sync_file(&mut self, path: &Path) -> Result<String, SyncError> {
        let mut doc = Document::load(path)?;

        let mut errors = validate_markdown(&doc.body);
        errors.extend(validate_frontmatter(&doc));
        if !errors.is_empty() {
            return Err(SyncError::Validation(errors));
        }
        for warning in markdown_warnings(&doc.body) {
            warn!("{}: {warning}", path.display());
        }

        let blocks = to_blocks(&doc.body);
        let block_errors = validate_blocks(&blocks);
        if !block_errors.is_empty() {
            return Err(SyncError::Validation(block_errors));
        }

        let relative = path
            .strip_prefix(&self.source_dir)
            .map_err(|_| SyncError::FolderResolution(path.display().to_string()))?;
        let mut segments = Vec::new();
        if let Some(parent) = relative.parent() {
            for component in parent.components() {
                let segment = component
                    .as_os_str()
                    .to_str()
                    .ok_or_else(|| SyncError::FolderResolution(path.display().to_string()))?;
                segments.push(segment.to_string());
            }
        }
        let stem = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or("untitled");

        // An index document is the directory's own page, not a child of it.
        if stem == "index" {
            return self.sync_index_file(path, &mut doc, &segments, &blocks);
        }

        let mut parent_id = self.root_page_id.clone();
        for segment in &segments {
            parent_id = self.get_or_create_folder(&parent_id, segment)?;
        }

        let title = doc.title.clone().unwrap_or_else(|| stem.to_string());

        if let Some(id) = doc.identity.clone() {
            if self.dry_run {
                info!(
                    "[dry-run] Would update page {id} from {} ({} blocks)",
                    path.display(),
                    blocks.len()
                );
                return Ok(id);
            }
            match self.remote()?.update_page(&id, &blocks) {
                Ok(()) => {
                    info!("Updated page {id} from {}", path.display());
                    return Ok(id);
                }
                Err(e) if e.is_recoverable_as_create() => {
                    warn!(
                        "{}: stored page {id} is gone ({e}); creating a new page",
                        path.display()
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        if self.dry_run {
            info!(
                "[dry-run] Would create page '{title}' under {parent_id} ({} blocks)",
                blocks.len()
            );
            return Ok(format!("dry-run-{}", Uuid::new_v4()));
        }

        let id =
            self.remote()?
                .create_page(&ParentRef::Page(parent_id), &title, &blocks, None)?;
        info!("Created page {id} from {}", path.display());
        doc.set_identity(&id);
        doc.save(path)?;
        Ok(id)
    }

    fn sync_index_file(
        &mut self,
        path: &Path,
        doc: &mut Document,
        segments: &[String],
        blocks: &[crate::blocks::Block],
    ) -> Result<String, SyncError> {
        let mut page_id = self.root_page_id.clone();
        for segment in segments {
            page_id = self.get_or_create_folder(&page_id, segment)?;
        }

        if self.dry_run {
            info!(
                "[dry-run] Would update directory page {page_id} from {}",
                path.display()
            );
            return Ok(page_id);
        }

        self.remote()?.update_page(&page_id, blocks)?;
        info!("Updated directory page {page_id} from {}", path.display());
        if doc.identity.as_deref() != Some(page_id.as_str()) {
            doc.set_identity(&page_id);
            doc.save(path)?;
        }
        Ok(page_id)
    }

    /// Resolve one folder-page level, creating it remotely at most once per
    /// (parent, name) pair per run.
    fn get_or_create_folder(&mut self, parent_id: &str, name: &str) -> Result<String, SyncError> {
        let key = (parent_id.to_string(), name.to_string());
        if let Some(id) = self.folder_cache.get(&key) {
            return Ok(id.clone());
        }

        let id = if self.dry_run {
            info!("[dry-run] Would ensure folder page '{name}' under {parent_id}");
            format!("dry-run-folder-{}", Uuid::new_v4())
        } else if let Some(existing) = self.remote()?.find_child_page(parent_id, name)? {
            debug!("Folder page '{name}' already exists as {existing}");
            existing
        } else {
            info!("Creating folder page '{name}' under {parent_id}");
            self.remote()?.create_child_page(parent_id, name)?
        };

        self.folder_cache.insert(key, id.clone());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notion::testing::FakeApi;
    use std::fs;

    fn engine(api: &FakeApi, dir: &Path) -> PushSync<FakeApi> {
        PushSync::new(Some(PageOps::new(api.clone())), "root", dir, false)
    }

    #[test]
    fn test_create_with_folder_chain_and_writeback() {
        let api = FakeApi::with_root("root");
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("a.md"), "# Hello\n\nBody text.\n").unwrap();
        fs::write(dir.path().join("docs/guide.md"), "Guide content.\n").unwrap();

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(
            stats,
            PushStats {
                processed: 2,
                synced: 2,
                failed: 0
            }
        );

        // Root page, folder page, two documents.
        let state = api.state();
        assert_eq!(state.pages.len(), 4);
        assert_eq!(state.pages["root"].child_ids.len(), 2);
        drop(state);

        let doc = Document::load(&dir.path().join("a.md")).unwrap();
        assert!(doc.identity.is_some());
        let guide = Document::load(&dir.path().join("docs/guide.md")).unwrap();
        let guide_id = guide.identity.unwrap();
        let state = api.state();
        let folder_id = state.pages[&guide_id].parent.clone().unwrap();
        assert_eq!(state.pages[&folder_id].title, "docs");
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let api = FakeApi::with_root("root");
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("a.md"), "Alpha.\n").unwrap();
        fs::write(dir.path().join("docs/guide.md"), "Guide.\n").unwrap();

        engine(&api, dir.path()).run().unwrap();
        let first_id = Document::load(&dir.path().join("a.md"))
            .unwrap()
            .identity
            .unwrap();
        let creates_after_first = api.state().create_calls;

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(stats.failed, 0);
        assert_eq!(api.state().create_calls, creates_after_first);
        assert_eq!(api.state().pages.len(), 4);
        let second_id = Document::load(&dir.path().join("a.md"))
            .unwrap()
            .identity
            .unwrap();
        assert_eq!(first_id, second_id);
    }

    #[test]
    fn test_validation_failure_makes_no_remote_calls() {
        let api = FakeApi::with_root("root");
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.md"),
            "| a | b |\n| --- | --- |\n| 1 | 2 |\n",
        )
        .unwrap();

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.synced, 0);
        let state = api.state();
        assert_eq!(state.create_calls, 0);
        assert_eq!(state.list_calls, 0);
        assert_eq!(state.append_batches.len(), 0);
    }

    #[test]
    fn test_stale_identity_falls_back_to_create() {
        let api = FakeApi::with_root("root");
        let dir = tempfile::tempdir().unwrap();
        let stale = "a1b2c3d4-e5f6-7788-99aa-bbccddeeff00";
        fs::write(
            dir.path().join("a.md"),
            format!("---\nnotion_page_id: {stale}\n---\n\nContent.\n"),
        )
        .unwrap();

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(stats.synced, 1);

        let doc = Document::load(&dir.path().join("a.md")).unwrap();
        let new_id = doc.identity.unwrap();
        assert_ne!(new_id, stale);
        assert!(api.state().pages.contains_key(&new_id));
    }

    #[test]
    fn test_partial_append_fails_file_without_identity_writeback() {
        let api = FakeApi::with_root("root");
        // Initial create succeeds with its first 100 blocks; the follow-up
        // append fails, leaving the page incomplete.
        api.state_mut().fail_append_after = Some(0);
        let dir = tempfile::tempdir().unwrap();
        let body: Vec<String> = (0..150).map(|i| format!("paragraph {i}")).collect();
        fs::write(dir.path().join("big.md"), body.join("\n\n")).unwrap();

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.synced, 0);

        let doc = Document::load(&dir.path().join("big.md")).unwrap();
        assert_eq!(doc.identity, None);
    }

    #[test]
    fn test_duplicate_identity_fails_both_files() {
        let api = FakeApi::with_root("root");
        let id = "a1b2c3d4-e5f6-7788-99aa-bbccddeeff00";
        api.add_page(id, Some("root"), "Shared", Vec::new());
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.md", "b.md"] {
            fs::write(
                dir.path().join(name),
                format!("---\nnotion_page_id: {id}\n---\n\nContent.\n"),
            )
            .unwrap();
        }

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.synced, 0);
    }

    #[test]
    fn test_index_file_updates_directory_page() {
        let api = FakeApi::with_root("root");
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("index.md"), "Root overview.\n").unwrap();
        fs::write(dir.path().join("docs/index.md"), "Docs overview.\n").unwrap();

        let stats = engine(&api, dir.path()).run().unwrap();
        assert_eq!(stats.synced, 2);

        let state = api.state();
        // Root index lands on the root page itself; docs/index on the
        // folder page, so only the folder was created.
        assert_eq!(state.pages.len(), 2);
        assert_eq!(state.pages["root"].blocks.len(), 1);
        drop(state);

        let doc = Document::load(&dir.path().join("index.md")).unwrap();
        assert_eq!(doc.identity.as_deref(), Some("root"));
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let api = FakeApi::with_root("root");
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/a.md"), "Content.\n").unwrap();

        let mut engine =
            PushSync::new(Some(PageOps::new(api.clone())), "root", dir.path(), true);
        let stats = engine.run().unwrap();
        assert_eq!(stats.synced, 1);

        let state = api.state();
        assert_eq!(state.create_calls, 0);
        assert_eq!(state.list_calls, 0);
        drop(state);
        let doc = Document::load(&dir.path().join("docs/a.md")).unwrap();
        assert_eq!(doc.identity, None);
    }

    #[test]
    fn test_dry_run_without_client() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "Content.\n").unwrap();
        let mut engine = PushSync::<FakeApi>::new(None, "root", dir.path(), true);
        let stats = engine.run().unwrap();
        assert_eq!(stats.synced, 1);
    }
}
