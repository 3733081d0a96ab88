use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::ObjectStore;

/// Keys mapped onto files below a root directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |path, part| path.join(part))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read '{key}'")),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory for '{key}'"))?;
        }
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("failed to write '{key}'"))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("failed to list '{}'", dir.display()));
                }
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = format!("{key_prefix}{name}");
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), format!("{key}/")));
                } else if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to delete '{key}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CONTENT_TYPE_JSON;

    #[tokio::test]
    async fn test_put_get_roundtrip_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.put("a/b/c.json", b"{}".to_vec(), CONTENT_TYPE_JSON).await.unwrap();
        assert_eq!(store.get("a/b/c.json").await.unwrap(), Some(b"{}".to_vec()));
        assert!(store.exists("a/b/c.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert_eq!(store.get("nope.json").await.unwrap(), None);
        store.delete("nope.json").await.unwrap();
    }

    #[tokio::test]
    async fn test_append_concatenates() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.append("log.jsonl", b"1\n").await.unwrap();
        store.append("log.jsonl", b"2\n").await.unwrap();
        assert_eq!(store.get("log.jsonl").await.unwrap(), Some(b"1\n2\n".to_vec()));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        for key in ["data/2025/11/07.jsonl", "data/2025/11/06.jsonl", "other/x.json"] {
            store.put(key, Vec::new(), CONTENT_TYPE_JSON).await.unwrap();
        }

        let keys = store.list("data/").await.unwrap();
        assert_eq!(keys, vec!["data/2025/11/06.jsonl", "data/2025/11/07.jsonl"]);
    }

    #[tokio::test]
    async fn test_copy_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.put("old.json", b"x".to_vec(), CONTENT_TYPE_JSON).await.unwrap();

        store.copy("old.json", "_backup/old.json").await.unwrap();
        store.delete("old.json").await.unwrap();

        assert!(!store.exists("old.json").await.unwrap());
        assert_eq!(store.get("_backup/old.json").await.unwrap(), Some(b"x".to_vec()));
        assert!(store.copy("old.json", "again.json").await.is_err());
    }
}
