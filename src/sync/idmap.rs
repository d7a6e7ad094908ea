//! Index from remote page identity to local file path, built once per run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;

use crate::document::Document;

use super::markdown_files;

/// Remote ids come in hyphenated and bare forms; keys are normalized so both
/// spellings hit the same entry.
fn normalize(id: &str) -> String {
    id.chars().filter(|c| *c != '-').collect()
}

#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: HashMap<String, PathBuf>,
}

impl IdentityMap {
    /// Scan every local document under `root` and index its stored identity.
    /// When two files claim the same identity the first in path order wins
    /// and the conflict is logged.
    pub fn scan(root: &Path) -> Self {
        let mut entries: HashMap<String, PathBuf> = HashMap::new();
        for path in markdown_files(root) {
            let doc = match Document::load(&path) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping {}: {e}", path.display());
                    continue;
                }
            };
            let Some(id) = doc.identity else { continue };
            let key = normalize(&id);
            if let Some(existing) = entries.get(&key) {
                warn!(
                    "Both {} and {} claim page {id}; keeping the first",
                    existing.display(),
                    path.display()
                );
                continue;
            }
            entries.insert(key, path);
        }
        Self { entries }
    }

    pub fn get(&self, id: &str) -> Option<&Path> {
        self.entries.get(&normalize(id)).map(PathBuf::as_path)
    }

    pub fn set_path(&mut self, id: &str, path: PathBuf) {
        self.entries.insert(normalize(id), path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_indexes_identities() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.md"),
            "---\nnotion_page_id: a1b2c3d4-e5f6-7788-99aa-bbccddeeff00\n---\n\nA\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.md"), "No frontmatter.\n").unwrap();

        let map = IdentityMap::scan(dir.path());
        assert_eq!(map.len(), 1);
        // Both spellings resolve.
        assert!(map.get("a1b2c3d4-e5f6-7788-99aa-bbccddeeff00").is_some());
        assert!(map.get("a1b2c3d4e5f6778899aabbccddeeff00").is_some());
    }

    #[test]
    fn test_duplicate_keeps_first_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        let id = "a1b2c3d4-e5f6-7788-99aa-bbccddeeff00";
        fs::write(
            dir.path().join("a.md"),
            format!("---\nnotion_page_id: {id}\n---\n\nfirst\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("z.md"),
            format!("---\nnotion_page_id: {id}\n---\n\nsecond\n"),
        )
        .unwrap();

        let map = IdentityMap::scan(dir.path());
        assert_eq!(map.get(id).unwrap(), dir.path().join("a.md"));
    }

    #[test]
    fn test_set_path_overrides() {
        let mut map = IdentityMap::default();
        map.set_path("abc-def", PathBuf::from("old.md"));
        map.set_path("abcdef", PathBuf::from("new/index.md"));
        assert_eq!(map.get("abc-def").unwrap(), Path::new("new/index.md"));
        assert_eq!(map.len(), 1);
    }
}
