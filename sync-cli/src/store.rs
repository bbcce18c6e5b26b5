//! Directory-backed document store.
//!
//! Documents are the files under a root directory, addressed by their
//! `/`-separated path relative to that root. Hidden entries (names starting
//! with `.`) are never listed.

use markit_sync_types::{FileRecord, PulledFile};
use std::path::{Component, Path, PathBuf};

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Path is empty, absolute, or escapes the store root.
    #[error("unsafe document path {0:?}")]
    UnsafePath(String),

    /// A document already exists at this path.
    #[error("{0} already exists")]
    Exists(PathBuf),

    /// File is not valid UTF-8 text.
    #[error("{0} is not a UTF-8 text file")]
    NotText(PathBuf),

    /// Filesystem error.
    #[error("{path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A directory of text documents.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative document path under the root.
    ///
    /// Only plain components are allowed; `.` components are dropped.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, StoreError> {
        let unsafe_path = || StoreError::UnsafePath(relative.to_string());
        let mut resolved = self.root.clone();
        let mut depth = 0;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path());
                }
            }
        }
        if depth == 0 {
            return Err(unsafe_path());
        }
        Ok(resolved)
    }

    /// Relative paths of every visible file under the root, sorted.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut found = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_error(&dir))?;
            while let Some(entry) = entries.next_entry().await.map_err(io_error(&dir))? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with('.') {
                    continue;
                }
                let relative = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let file_type = entry.file_type().await.map_err(io_error(&entry.path()))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), relative));
                } else if file_type.is_file() {
                    found.push(relative);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Load documents as push records, all carrying `commit_message`.
    ///
    /// With no `paths`, every listed document is loaded. Records come back
    /// sorted by path with duplicates removed.
    pub async fn load(
        &self,
        paths: &[String],
        commit_message: &str,
    ) -> Result<Vec<FileRecord>, StoreError> {
        let mut paths: Vec<String> = if paths.is_empty() {
            self.list().await?
        } else {
            paths
                .iter()
                .map(|p| normalize(p))
                .collect::<Result<_, _>>()?
        };
        paths.sort();
        paths.dedup();

        let mut records = Vec::with_capacity(paths.len());
        for relative in paths {
            let full = self.resolve(&relative)?;
            let bytes = tokio::fs::read(&full).await.map_err(io_error(&full))?;
            let content = String::from_utf8(bytes).map_err(|_| StoreError::NotText(full))?;
            records.push(FileRecord::new(&relative, &content, commit_message));
        }
        Ok(records)
    }

    /// Create a new document, failing if one already exists at `relative`.
    pub async fn create(&self, relative: &str, content: &str) -> Result<PathBuf, StoreError> {
        use tokio::io::AsyncWriteExt;

        let target = self.resolve(relative)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_error(parent))?;
        }
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Exists(target));
            }
            Err(source) => return Err(StoreError::Io { path: target, source }),
        };
        file.write_all(content.as_bytes())
            .await
            .map_err(io_error(&target))?;
        Ok(target)
    }

    /// Write pulled files under the root, creating directories as needed.
    ///
    /// Every path is checked before anything is written, so one unsafe path
    /// leaves the store untouched.
    pub async fn save(&self, files: &[PulledFile]) -> Result<usize, StoreError> {
        let targets = files
            .iter()
            .map(|file| self.resolve(&file.path))
            .collect::<Result<Vec<_>, _>>()?;

        for (file, target) in files.iter().zip(&targets) {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(io_error(parent))?;
            }
            tokio::fs::write(target, &file.content)
                .await
                .map_err(io_error(target))?;
            tracing::debug!("wrote {}", file.path);
        }
        Ok(targets.len())
    }
}

/// Canonical `/`-separated form of a user-supplied relative path.
fn normalize(relative: &str) -> Result<String, StoreError> {
    let mut parts = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return Err(StoreError::UnsafePath(relative.to_string())),
        }
    }
    if parts.is_empty() {
        return Err(StoreError::UnsafePath(relative.to_string()));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pulled(path: &str, content: &str) -> PulledFile {
        PulledFile {
            path: path.to_string(),
            content: content.to_string(),
            sha: String::new(),
        }
    }

    // ===========================================
    // Path safety
    // ===========================================

    #[test]
    fn resolve_rejects_escapes() {
        let store = DocumentStore::new("/tmp/docs");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("notes/../../x").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
        assert!(store.resolve(".").is_err());
    }

    #[test]
    fn resolve_accepts_nested_paths() {
        let store = DocumentStore::new("/tmp/docs");
        assert_eq!(
            store.resolve("./notes/a.md").unwrap(),
            PathBuf::from("/tmp/docs/notes/a.md")
        );
    }

    #[test]
    fn normalize_strips_current_dir() {
        assert_eq!(normalize("./notes/./a.md").unwrap(), "notes/a.md");
        assert!(normalize("../a.md").is_err());
    }

    // ===========================================
    // Listing and loading
    // ===========================================

    #[tokio::test]
    async fn list_is_sorted_and_skips_hidden() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("notes")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join("b.md"), "b").unwrap();
        std::fs::write(dir.path().join("notes/a.md"), "a").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join(".hidden"), "h").unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();

        let store = DocumentStore::new(dir.path());
        assert_eq!(store.list().await.unwrap(), ["a.md", "b.md", "notes/a.md"]);
    }

    #[tokio::test]
    async fn load_builds_records_in_path_order() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("z.md"), "zed").unwrap();
        std::fs::write(dir.path().join("a.md"), "学习笔记").unwrap();

        let store = DocumentStore::new(dir.path());
        let records = store.load(&[], "feat: update 2 files").await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "a.md");
        assert_eq!(records[0].content, "学习笔记");
        assert_eq!(records[1].path, "z.md");
        assert!(records
            .iter()
            .all(|r| r.commit_message == "feat: update 2 files" && r.sha.is_none()));
    }

    #[tokio::test]
    async fn load_selected_paths_dedups() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("b.md"), "b").unwrap();

        let store = DocumentStore::new(dir.path());
        let paths = vec!["./b.md".to_string(), "b.md".to_string()];
        let records = store.load(&paths, "msg").await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "b.md");
    }

    #[tokio::test]
    async fn load_rejects_binary_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("image.png"), [0xff, 0xd8, 0xff]).unwrap();

        let store = DocumentStore::new(dir.path());
        let err = store.load(&[], "msg").await.unwrap_err();
        assert!(matches!(err, StoreError::NotText(_)));
    }

    #[tokio::test]
    async fn load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let err = store
            .load(&["missing.md".to_string()], "msg")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    // ===========================================
    // Saving
    // ===========================================

    #[tokio::test]
    async fn save_creates_directories() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let written = store
            .save(&[pulled("a.md", "a"), pulled("deep/nested/b.md", "🎉")])
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("deep/nested/b.md")).unwrap(),
            "🎉"
        );
    }

    #[tokio::test]
    async fn create_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let path = store.create("notes/new.md", "# New\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# New\n");

        let err = store.create("notes/new.md", "other").await.unwrap_err();
        assert!(matches!(err, StoreError::Exists(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# New\n");
    }

    #[tokio::test]
    async fn save_writes_nothing_when_any_path_is_unsafe() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("docs"));

        let result = store
            .save(&[pulled("ok.md", "ok"), pulled("../escape.md", "x")])
            .await;

        assert!(matches!(result, Err(StoreError::UnsafePath(_))));
        assert!(!dir.path().join("docs/ok.md").exists());
        assert!(!dir.path().join("escape.md").exists());
    }
}
