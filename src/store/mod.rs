//! Object storage for raw readings and generated outputs.
//!
//! [`ObjectStore`] is the async trait every pipeline talks to.
//! [`S3Store`] targets any S3-compatible bucket (Aliyun OSS in production),
//! [`LocalStore`] maps keys onto a directory.

mod local;
mod s3;

pub use local::LocalStore;
pub use s3::S3Store;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_JSONL: &str = "application/x-ndjson";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns the object body, or `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Removes `key`. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Copies `from` to `to`. Missing sources are an error.
    async fn copy(&self, from: &str, to: &str) -> Result<()> {
        let body = self
            .get(from)
            .await?
            .ok_or_else(|| anyhow::anyhow!("cannot copy missing object '{from}'"))?;
        self.put(to, body, CONTENT_TYPE_JSONL).await
    }

    /// Appends bytes to an object, creating it if needed.
    ///
    /// S3 objects are immutable, so this reads the whole object and writes it
    /// back. Concurrent appends to the same key can lose data.
    async fn append(&self, key: &str, body: &[u8]) -> Result<()> {
        let mut existing = self.get(key).await?.unwrap_or_default();
        existing.extend_from_slice(body);
        self.put(key, existing, CONTENT_TYPE_JSONL).await
    }
}

/// Serializes a value to pretty JSON and stores it with `application/json` content type.
pub async fn write_json<S: ObjectStore + ?Sized>(
    store: &S,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)?;
    store.put(key, body, CONTENT_TYPE_JSON).await
}
