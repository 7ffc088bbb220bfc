//! Scope → context prompt mapping
//!
//! Each scope (a guild, a group chat or a synthesized DM identity) may be
//! mapped to a text file under the prompts directory. The mapping lives in a
//! JSON file that is rewritten in full on every mutation:
//!
//! ```text
//! { "guild-42": "pirate.txt", "User-7": "tutor.txt" }
//! ```

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Context prompt store
pub struct ContextStore {
    context_file: PathBuf,
    prompts_dir: PathBuf,
    mappings: Arc<RwLock<BTreeMap<String, String>>>,
    /// Serializes mutate-then-write sequences
    persist_lock: Mutex<()>,
}

impl ContextStore {
    /// Open the store, creating the prompts directory and an empty mapping
    /// file when they do not exist yet.
    pub async fn open(context_file: PathBuf, prompts_dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&prompts_dir).await?;

        let mappings = Self::load_mappings(&context_file).await;
        let store = Self {
            context_file,
            prompts_dir,
            mappings: Arc::new(RwLock::new(mappings.unwrap_or_default())),
            persist_lock: Mutex::new(()),
        };

        if !tokio::fs::try_exists(&store.context_file).await.unwrap_or(false) {
            store.persist(&BTreeMap::new()).await?;
            tracing::info!(
                "Context file {} not found, created empty context file",
                store.context_file.display()
            );
        }

        Ok(store)
    }

    pub fn prompts_dir(&self) -> &Path {
        &self.prompts_dir
    }

    /// Context prompt text for a scope.
    ///
    /// Unmapped scopes yield an empty string. A mapped file that is missing
    /// or unreadable also yields an empty string and is reported in the log.
    pub async fn get_context_prompt(&self, scope_name: &str) -> String {
        let filename = match self.mappings.read().await.get(scope_name) {
            Some(filename) => filename.clone(),
            None => return String::new(),
        };

        let path = self.prompts_dir.join(&filename);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                tracing::info!(
                    "Context file '{}' applied for scope '{}'",
                    filename,
                    scope_name
                );
                content
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Context file '{}' not found for scope '{}'",
                    filename,
                    scope_name
                );
                String::new()
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load context file '{}' for scope '{}': {}",
                    filename,
                    scope_name,
                    e
                );
                String::new()
            }
        }
    }

    /// Map `scope_name` to `filename`.
    ///
    /// Returns false, leaving the mapping untouched, when the file does not
    /// exist under the prompts directory, the name would escape it, or the
    /// mapping file cannot be written.
    pub async fn set_context_file(&self, scope_name: &str, filename: &str) -> bool {
        if !is_plain_filename(filename) {
            tracing::warn!("Rejected context filename '{}'", filename);
            return false;
        }

        let path = self.prompts_dir.join(filename);
        let exists = tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !exists {
            return false;
        }

        let _guard = self.persist_lock.lock().await;
        let (previous, snapshot) = {
            let mut mappings = self.mappings.write().await;
            let previous = mappings.insert(scope_name.to_string(), filename.to_string());
            (previous, mappings.clone())
        };
        if !self.persist_or_log(&snapshot).await {
            self.restore(scope_name, previous).await;
            return false;
        }

        tracing::info!("Context file '{}' set for scope '{}'", filename, scope_name);
        true
    }

    /// Remove the mapping for `scope_name`.
    ///
    /// Returns whether one existed and the removal was written.
    pub async fn reset_context(&self, scope_name: &str) -> bool {
        let _guard = self.persist_lock.lock().await;
        let (removed, snapshot) = {
            let mut mappings = self.mappings.write().await;
            let Some(removed) = mappings.remove(scope_name) else {
                return false;
            };
            (removed, mappings.clone())
        };
        if !self.persist_or_log(&snapshot).await {
            self.restore(scope_name, Some(removed)).await;
            return false;
        }

        tracing::info!("Context reset for scope '{}'", scope_name);
        true
    }

    /// Filename mapped to a scope
    pub async fn context_file_for(&self, scope_name: &str) -> Option<String> {
        self.mappings.read().await.get(scope_name).cloned()
    }

    /// Copy of every scope mapping
    pub async fn mappings(&self) -> BTreeMap<String, String> {
        self.mappings.read().await.clone()
    }

    /// Sorted `.txt` files available in the prompts directory
    pub async fn list_context_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.prompts_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(name.to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn load_mappings(path: &Path) -> Option<BTreeMap<String, String>> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::error!("Failed to load context {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&data) {
            Ok(mappings) => Some(mappings),
            Err(e) => {
                tracing::error!("Failed to parse context {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn persist_or_log(&self, mappings: &BTreeMap<String, String>) -> bool {
        match self.persist(mappings).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "Failed to save context to {}: {}",
                    self.context_file.display(),
                    e
                );
                false
            }
        }
    }

    /// Put back the in-memory mapping a failed write replaced
    async fn restore(&self, scope_name: &str, previous: Option<String>) {
        let mut mappings = self.mappings.write().await;
        match previous {
            Some(filename) => mappings.insert(scope_name.to_string(), filename),
            None => mappings.remove(scope_name),
        };
    }

    async fn persist(&self, mappings: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.context_file.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(mappings)?;
        let temp_path = self.context_file.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.context_file).await?;
        Ok(())
    }
}

/// Append `.txt` unless the name already carries it
pub fn normalize_context_filename(name: &str) -> String {
    let name = name.trim();
    if name.ends_with(".txt") {
        name.to_string()
    } else {
        format!("{}.txt", name)
    }
}

/// A bare file name: no separators, no parent references
fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn make_store() -> (ContextStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ContextStore::open(
            dir.path().join("config").join("context.json"),
            dir.path().join("prompts"),
        )
        .await
        .unwrap();
        (store, dir)
    }

    async fn write_prompt(dir: &TempDir, name: &str, content: &str) {
        tokio::fs::write(dir.path().join("prompts").join(name), content)
            .await
            .unwrap();
    }

    async fn read_mapping_file(dir: &TempDir) -> BTreeMap<String, String> {
        let data = tokio::fs::read_to_string(dir.path().join("config").join("context.json"))
            .await
            .unwrap();
        serde_json::from_str(&data).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_empty_mapping_file() {
        let (store, dir) = make_store().await;
        assert!(store.mappings().await.is_empty());
        assert!(read_mapping_file(&dir).await.is_empty());
        assert!(dir.path().join("prompts").is_dir());
    }

    #[tokio::test]
    async fn test_unmapped_scope_is_empty() {
        let (store, _dir) = make_store().await;
        assert_eq!(store.get_context_prompt("guild-1").await, "");
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "demo.txt", "You are a pirate.\n").await;

        assert!(store.set_context_file("guild-42", "demo.txt").await);
        assert_eq!(store.get_context_prompt("guild-42").await, "You are a pirate.\n");
        assert_eq!(
            read_mapping_file(&dir).await.get("guild-42").map(String::as_str),
            Some("demo.txt")
        );
    }

    #[tokio::test]
    async fn test_set_missing_file_rejected() {
        let (store, dir) = make_store().await;
        assert!(!store.set_context_file("guild-42", "nope.txt").await);
        assert!(store.context_file_for("guild-42").await.is_none());
        assert!(read_mapping_file(&dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_set_rejects_path_escape() {
        let (store, dir) = make_store().await;
        tokio::fs::write(dir.path().join("outside.txt"), "secret")
            .await
            .unwrap();
        assert!(!store.set_context_file("guild-42", "../outside.txt").await);
        assert!(store.mappings().await.is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_mapping() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "a.txt", "A").await;
        write_prompt(&dir, "b.txt", "B").await;

        assert!(store.set_context_file("g", "a.txt").await);
        assert!(store.set_context_file("g", "b.txt").await);
        assert_eq!(store.get_context_prompt("g").await, "B");
    }

    /// Replace the mapping file's directory with a plain file
    async fn break_mapping_dir(dir: &TempDir) {
        let config_dir = dir.path().join("config");
        tokio::fs::remove_dir_all(&config_dir).await.unwrap();
        tokio::fs::write(&config_dir, "not a directory").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_fails_and_rolls_back_when_unwritable() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "a.txt", "A").await;
        write_prompt(&dir, "b.txt", "B").await;
        assert!(store.set_context_file("g", "a.txt").await);

        break_mapping_dir(&dir).await;
        assert!(!store.set_context_file("g", "b.txt").await);
        assert!(!store.set_context_file("other", "b.txt").await);

        assert_eq!(store.context_file_for("g").await.as_deref(), Some("a.txt"));
        assert!(store.context_file_for("other").await.is_none());
    }

    #[tokio::test]
    async fn test_reset_fails_and_rolls_back_when_unwritable() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "a.txt", "A").await;
        assert!(store.set_context_file("g", "a.txt").await);

        break_mapping_dir(&dir).await;
        assert!(!store.reset_context("g").await);
        assert_eq!(store.get_context_prompt("g").await, "A");
    }

    #[tokio::test]
    async fn test_reset_context() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "demo.txt", "ctx").await;
        store.set_context_file("g", "demo.txt").await;

        assert!(store.reset_context("g").await);
        assert_eq!(store.get_context_prompt("g").await, "");
        assert!(read_mapping_file(&dir).await.is_empty());

        // Second reset is a no-op
        assert!(!store.reset_context("g").await);
    }

    #[tokio::test]
    async fn test_mapped_file_deleted_later() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "gone.txt", "ctx").await;
        store.set_context_file("g", "gone.txt").await;

        tokio::fs::remove_file(dir.path().join("prompts").join("gone.txt"))
            .await
            .unwrap();
        assert_eq!(store.get_context_prompt("g").await, "");
        // The mapping itself survives
        assert_eq!(store.context_file_for("g").await.as_deref(), Some("gone.txt"));
    }

    #[tokio::test]
    async fn test_reopen_keeps_mappings() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "demo.txt", "ctx").await;
        store.set_context_file("g", "demo.txt").await;
        drop(store);

        let reopened = ContextStore::open(
            dir.path().join("config").join("context.json"),
            dir.path().join("prompts"),
        )
        .await
        .unwrap();
        assert_eq!(reopened.get_context_prompt("g").await, "ctx");
    }

    #[tokio::test]
    async fn test_corrupt_mapping_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let context_file = dir.path().join("context.json");
        tokio::fs::write(&context_file, "[1, 2").await.unwrap();

        let store = ContextStore::open(context_file, dir.path().join("prompts"))
            .await
            .unwrap();
        assert!(store.mappings().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_context_files() {
        let (store, dir) = make_store().await;
        write_prompt(&dir, "b.txt", "").await;
        write_prompt(&dir, "a.txt", "").await;
        write_prompt(&dir, "notes.md", "").await;

        let files = store.list_context_files().await.unwrap();
        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn test_normalize_context_filename() {
        assert_eq!(normalize_context_filename("pirate"), "pirate.txt");
        assert_eq!(normalize_context_filename(" pirate.txt "), "pirate.txt");
    }

    #[test]
    fn test_plain_filename() {
        assert!(is_plain_filename("demo.txt"));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename("../x.txt"));
        assert!(!is_plain_filename("dir/x.txt"));
        assert!(!is_plain_filename("dir\\x.txt"));
    }
}
