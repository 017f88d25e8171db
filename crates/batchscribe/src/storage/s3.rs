//! Object storage on S3 (or an S3-compatible endpoint such as MinIO).

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::StorageError;
use crate::storage::ObjectStore;

/// Characters left as is in a `CopySource` key; everything else is
/// percent-encoded. `/` stays literal as the key's path separator.
const COPY_SOURCE_KEY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `bucket/key` with the key URL-encoded, as `CopyObject` expects.
fn copy_source(container: &str, key: &str) -> String {
    format!("{}/{}", container, utf8_percent_encode(key, COPY_SOURCE_KEY))
}

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from shared AWS config, pointing at a custom endpoint
    /// (path-style addressing) when one is given.
    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_s3::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

fn map_sdk_error<E, R>(container: &str, key: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.code() {
        Some("NoSuchKey") | Some("NotFound") => StorageError::NotFound {
            container: container.to_string(),
            key: key.to_string(),
        },
        _ => StorageError::Backend(DisplayErrorContext(&err).to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn create_container_if_absent(
        &self,
        container: &str,
        region: &str,
    ) -> Result<(), StorageError> {
        if self.client.head_bucket().bucket(container).send().await.is_ok() {
            log::debug!("Bucket {} already exists", container);
            return Ok(());
        }

        let mut request = self.client.create_bucket().bucket(container);
        // us-east-1 rejects an explicit location constraint.
        if region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                log::info!("Created bucket {}", container);
                Ok(())
            }
            Err(e) if matches!(e.code(), Some("BucketAlreadyOwnedByYou")) => Ok(()),
            Err(e) => Err(map_sdk_error(container, "", e)),
        }
    }

    async fn list_objects(
        &self,
        container: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<String>, StorageError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(container)
            .set_prefix(prefix.map(str::to_string))
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_sdk_error(container, "", e))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );
        }
        Ok(keys)
    }

    async fn upload(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| map_sdk_error(container, key, e))?;
        Ok(())
    }

    async fn put_object(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(container)
            .key(key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| map_sdk_error(container, key, e))?;
        Ok(())
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let bytes = self.get_object_bytes(container, key).await?;
        tokio::fs::write(local_path, bytes)
            .await
            .map_err(|e| StorageError::Io {
                path: local_path.to_path_buf(),
                source: e,
            })
    }

    async fn get_object_bytes(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(container, key, e))?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn copy(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        self.client
            .copy_object()
            .copy_source(copy_source(src_container, src_key))
            .bucket(dst_container)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| map_sdk_error(src_container, src_key, e))?;
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(container)
            .key(key)
            .send()
            .await
            .map_err(|e| map_sdk_error(container, key, e))?;
        Ok(())
    }

    fn object_uri(&self, container: &str, key: &str) -> String {
        format!("s3://{}/{}", container, key)
    }
}
