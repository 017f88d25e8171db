//! Object storage holding the input and output containers.

pub mod local;
#[cfg(feature = "aws")]
pub mod s3;

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageError;

pub use local::LocalObjectStore;
#[cfg(feature = "aws")]
pub use s3::S3ObjectStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn create_container_if_absent(
        &self,
        container: &str,
        region: &str,
    ) -> Result<(), StorageError>;

    /// Keys in `container`, optionally restricted to those starting with
    /// `prefix`. Nested keys (`archive/2026-01-01/a.mp3`) are included.
    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StorageError>;

    async fn upload(&self, container: &str, key: &str, local_path: &Path)
        -> Result<(), StorageError>;

    async fn put_object(&self, container: &str, key: &str, bytes: Vec<u8>)
        -> Result<(), StorageError>;

    async fn download(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError>;

    async fn get_object_bytes(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn copy(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> Result<(), StorageError>;

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError>;

    /// URI the transcription service uses to read an object.
    fn object_uri(&self, container: &str, key: &str) -> String;
}

/// Moves an object with copy-then-delete. The source is only deleted once
/// the copy has succeeded, so an interrupted move never loses the object.
pub async fn move_object(
    store: &dyn ObjectStore,
    src_container: &str,
    src_key: &str,
    dst_container: &str,
    dst_key: &str,
) -> Result<(), StorageError> {
    store
        .copy(src_container, src_key, dst_container, dst_key)
        .await?;
    store.delete(src_container, src_key).await
}

/// Top-level keys only; archived objects live under a `/`-separated prefix.
pub fn is_top_level(key: &str) -> bool {
    !key.contains('/')
}
