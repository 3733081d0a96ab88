use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use super::ObjectStore;
use crate::config::StoreConfig;

/// An S3-compatible bucket.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client for the configured endpoint with static credentials.
    pub async fn from_config(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.access_key_secret,
            None,
            None,
            "oss-env",
        );

        let sdk_config = aws_config::from_env()
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        Self::new(aws_sdk_s3::Client::new(&sdk_config), config.bucket.clone())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match response {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .with_context(|| format!("failed to read body of '{key}'"))?
                    .into_bytes();
                Ok(Some(bytes.to_vec()))
            }
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    debug!(key, "Object does not exist");
                    return Ok(None);
                }
                Err(anyhow::Error::new(err).context(format!("GetObject failed for '{key}'")))
            }
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("PutObject failed for '{key}'"))?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.with_context(|| format!("ListObjectsV2 failed for '{prefix}'"))?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|o| o.key().map(str::to_string)),
            );
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("DeleteObject failed for '{key}'"))?;
        Ok(())
    }
}
