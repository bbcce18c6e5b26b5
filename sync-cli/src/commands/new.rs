//! Create a local document from a title.

use anyhow::{Context, Result};
use markit_sync_client::format_file_path;
use std::path::{Path, PathBuf};

use crate::store::DocumentStore;

/// Extension used when none is given.
pub const DEFAULT_EXTENSION: &str = ".md";

/// Run the new command. Returns the path of the created document.
pub async fn run(dir: &Path, title: &str, extension: &str) -> Result<PathBuf> {
    let title = title.trim();
    if title.is_empty() {
        anyhow::bail!("Title must not be empty");
    }

    let relative = format_file_path(title, extension);
    let store = DocumentStore::new(dir);
    let path = store
        .create(&relative, &format!("# {title}\n"))
        .await
        .with_context(|| format!("Failed to create document for {title:?}"))?;

    println!("Created {}", path.display());
    println!();
    println!("Push it with: markit-sync push --dir {} {}", dir.display(), relative);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn title_becomes_sanitized_path() {
        let dir = tempdir().unwrap();

        let path = run(dir.path(), "学习笔记: week 1", DEFAULT_EXTENSION)
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("学习笔记__week_1.md"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# 学习笔记: week 1\n"
        );
    }

    #[tokio::test]
    async fn custom_extension() {
        let dir = tempdir().unwrap();
        let path = run(dir.path(), "todo", ".txt").await.unwrap();
        assert_eq!(path, dir.path().join("todo.txt"));
    }

    #[tokio::test]
    async fn existing_document_is_not_overwritten() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("My_Notes.md"), "keep me").unwrap();

        let result = run(dir.path(), "My Notes", DEFAULT_EXTENSION).await;

        assert!(result.is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("My_Notes.md")).unwrap(),
            "keep me"
        );
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(run(dir.path(), "   ", DEFAULT_EXTENSION).await.is_err());
    }
}
