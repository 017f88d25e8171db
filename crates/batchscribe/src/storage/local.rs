use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use walkdir::WalkDir;

use crate::error::StorageError;
use crate::storage::ObjectStore;

/// Object store backed by a local directory: each container is a
/// subdirectory of `root` and each key a relative file path inside it.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_path(&self, container: &str) -> Result<PathBuf, StorageError> {
        validate_segment(container)?;
        Ok(self.root.join(container))
    }

    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.container_path(container)?.join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }
}

fn validate_segment(container: &str) -> Result<(), StorageError> {
    if container.is_empty() || container.contains('/') || container.contains('\\') || container == ".." {
        return Err(StorageError::InvalidKey(container.to_string()));
    }
    Ok(())
}

fn map_io(container: &str, key: &str, path: &Path, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound {
            container: container.to_string(),
            key: key.to_string(),
        }
    } else {
        StorageError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn create_container_if_absent(
        &self,
        container: &str,
        _region: &str,
    ) -> Result<(), StorageError> {
        let path = self.container_path(container)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| StorageError::Io { path, source: e })
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StorageError> {
        let base = self.container_path(container)?;
        if !base.is_dir() {
            return Err(StorageError::NotFound {
                container: container.to_string(),
                key: String::new(),
            });
        }

        let mut keys = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::Backend(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&base) else {
                continue;
            };
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if prefix.map_or(true, |p| key.starts_with(p)) {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let target = self.object_path(container, key)?;
        self.ensure_parent(&target).await?;
        tokio::fs::copy(local_path, &target)
            .await
            .map_err(|e| StorageError::Io {
                path: local_path.to_path_buf(),
                source: e,
            })?;
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        let target = self.object_path(container, key)?;
        self.ensure_parent(&target).await?;
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| StorageError::Io {
                path: target.clone(),
                source: e,
            })
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let bytes = self.get_object_bytes(container, key).await?;
        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(local_path, bytes)
            .await
            .map_err(|e| StorageError::Io {
                path: local_path.to_path_buf(),
                source: e,
            })
    }

    async fn get_object_bytes(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(container, key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| map_io(container, key, &path, e))
    }

    async fn copy(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        let src = self.object_path(src_container, src_key)?;
        let dst = self.object_path(dst_container, dst_key)?;
        if !src.is_file() {
            return Err(StorageError::NotFound {
                container: src_container.to_string(),
                key: src_key.to_string(),
            });
        }
        self.ensure_parent(&dst).await?;
        tokio::fs::copy(&src, &dst)
            .await
            .map_err(|e| map_io(src_container, src_key, &src, e))?;
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(container, key)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| map_io(container, key, &path, e))
    }

    fn object_uri(&self, container: &str, key: &str) -> String {
        format!("file://{}", self.root.join(container).join(key).display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store_with_container(temp_dir: &TempDir) -> LocalObjectStore {
        let store = LocalObjectStore::new(temp_dir.path());
        store.create_container_if_absent("media", "local").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_put_and_get_object() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_container(&temp_dir).await;

        store
            .put_object("media", "a.mp3", b"Hello".to_vec())
            .await
            .unwrap();

        assert_eq!(store.get_object_bytes("media", "a.mp3").await.unwrap(), b"Hello");
    }

    #[tokio::test]
    async fn test_list_objects_includes_nested_keys_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_container(&temp_dir).await;
        for key in ["b.mp3", "a.mp3", "archive/2026-01-01/c.mp3"] {
            store.put_object("media", key, vec![1]).await.unwrap();
        }

        let all = store.list_objects("media", None).await.unwrap();
        assert_eq!(all, vec!["a.mp3", "archive/2026-01-01/c.mp3", "b.mp3"]);

        let archived = store.list_objects("media", Some("archive/")).await.unwrap();
        assert_eq!(archived, vec!["archive/2026-01-01/c.mp3"]);
    }

    #[tokio::test]
    async fn test_list_missing_container_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalObjectStore::new(temp_dir.path());
        assert!(store.list_objects("nope", None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_container(&temp_dir).await;
        let local = temp_dir.path().join("local.wav");
        std::fs::write(&local, b"wave").unwrap();

        store.upload("media", "local.wav", &local).await.unwrap();

        let target = temp_dir.path().join("out/copy.wav");
        store.download("media", "local.wav", &target).await.unwrap();
        assert_eq!(std::fs::read(target).unwrap(), b"wave");
    }

    #[tokio::test]
    async fn test_copy_and_delete_missing_report_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_container(&temp_dir).await;

        let copy_err = store
            .copy("media", "missing.mp3", "media", "archive/missing.mp3")
            .await
            .unwrap_err();
        assert!(copy_err.is_not_found());

        let delete_err = store.delete("media", "missing.mp3").await.unwrap_err();
        assert!(delete_err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_with_container(&temp_dir).await;

        let err = store
            .put_object("media", "../escape.mp3", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));

        let err = store.put_object("media", "", vec![]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn test_object_uri() {
        let store = LocalObjectStore::new("/data");
        assert_eq!(store.object_uri("media", "a.mp3"), "file:///data/media/a.mp3");
    }
}
