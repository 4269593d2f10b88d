//! Local persistence for the credential, the file tree snapshot and the
//! chat transcript.
//!
//! Each value lives in its own file in the data directory and any of them
//! may be absent; absence is never an error.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::session::ChatMessage;
use crate::tree::FileNode;

const API_KEY_FILE: &str = "api_key";
const FILE_SYSTEM_FILE: &str = "file_system.json";
const TRANSCRIPT_FILE: &str = "transcript.json";

/// Environment variable consulted when no key has been stored.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Debug)]
pub struct StudioStore {
    dir: PathBuf,
}

impl StudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// The stored key, or `ANTHROPIC_API_KEY` when nothing is stored.
    pub fn load_api_key(&self) -> Option<String> {
        let stored = std::fs::read_to_string(self.dir.join(API_KEY_FILE))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        stored.or_else(|| {
            std::env::var(API_KEY_ENV)
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        })
    }

    pub fn save_api_key(&self, key: &str) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(API_KEY_FILE);
        std::fs::write(&path, key.trim())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// The saved tree, if one exists and passes validation.
    pub fn load_tree(&self) -> Option<FileNode> {
        let path = self.dir.join(FILE_SYSTEM_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        let tree: FileNode = match serde_json::from_str(&content) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load saved file system");
                return None;
            }
        };
        if let Err(e) = tree.validate() {
            warn!(path = %path.display(), error = %e, "saved file system is inconsistent");
            return None;
        }
        debug!(path = %path.display(), "restored saved file system");
        Some(tree)
    }

    pub fn save_tree(&self, tree: &FileNode) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string(tree)?;
        std::fs::write(self.dir.join(FILE_SYSTEM_FILE), json)?;
        Ok(())
    }

    /// Remove the saved tree so the next session starts from the default skeleton.
    pub fn clear_tree(&self) -> Result<()> {
        self.remove(FILE_SYSTEM_FILE)
    }

    /// The saved chat transcript. Missing or unreadable gives an empty one.
    pub fn load_transcript(&self) -> Vec<ChatMessage> {
        let path = self.dir.join(TRANSCRIPT_FILE);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Vec::new();
        };
        match serde_json::from_str(&content) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load saved transcript");
                Vec::new()
            }
        }
    }

    pub fn save_transcript(&self, messages: &[ChatMessage]) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string(messages)?;
        std::fs::write(self.dir.join(TRANSCRIPT_FILE), json)?;
        Ok(())
    }

    pub fn clear_transcript(&self) -> Result<()> {
        self.remove(TRANSCRIPT_FILE)
    }

    fn remove(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.dir.join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::Role;
    use crate::templates::default_file_system;
    use crate::tree::MAX_PATH_DEPTH;

    #[test]
    fn tree_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StudioStore::new(dir.path().join("data"));
        assert!(store.load_tree().is_none());

        let tree = default_file_system()
            .update_content("/src/extra/page.html", "<p>x</p>")
            .unwrap();
        store.save_tree(&tree).unwrap();
        assert_eq!(store.load_tree(), Some(tree));

        store.clear_tree().unwrap();
        assert!(store.load_tree().is_none());
        store.clear_tree().unwrap();
    }

    #[test]
    fn deepest_buildable_tree_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = StudioStore::new(dir.path());
        let path = format!("{}/leaf.txt", "/dir".repeat(MAX_PATH_DEPTH - 1));
        let tree = FileNode::root().update_content(&path, "deep").unwrap();

        store.save_tree(&tree).unwrap();
        let loaded = store.load_tree().unwrap();
        assert_eq!(loaded.find_by_path(&path).and_then(FileNode::content), Some("deep"));
        assert_eq!(loaded, tree);
    }

    #[test]
    fn transcript_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StudioStore::new(dir.path());
        assert!(store.load_transcript().is_empty());

        let messages = vec![
            ChatMessage { role: Role::User, content: "hi".into(), is_error: false },
            ChatMessage { role: Role::Assistant, content: "oops".into(), is_error: true },
        ];
        store.save_transcript(&messages).unwrap();
        assert_eq!(store.load_transcript(), messages);

        store.clear_transcript().unwrap();
        assert!(store.load_transcript().is_empty());

        std::fs::write(dir.path().join(TRANSCRIPT_FILE), "[{").unwrap();
        assert!(store.load_transcript().is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(FILE_SYSTEM_FILE), "{\"path\":").unwrap();
        let store = StudioStore::new(dir.path());
        assert!(store.load_tree().is_none());
    }

    #[test]
    fn stored_key_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let store = StudioStore::new(dir.path());
        store.save_api_key("  sk-test \n").unwrap();
        assert_eq!(store.load_api_key().as_deref(), Some("sk-test"));
    }
}
