pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access policy attached to an uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclPolicy {
    pub owner: String,
    pub visibility: Visibility,
}

impl AclPolicy {
    pub fn public(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            visibility: Visibility::Public,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 request failed for '{key}': {source}")]
    S3 {
        key: String,
        #[source]
        source: Box<aws_sdk_s3::Error>,
    },

    #[error("Failed to read body of '{key}': {message}")]
    Body { key: String, message: String },

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid ACL policy: {0}")]
    InvalidPolicy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn s3(key: &str, source: impl Into<aws_sdk_s3::Error>) -> Self {
        Self::S3 {
            key: key.to_string(),
            source: Box::new(source.into()),
        }
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch `object_path` into the local file `dest`, returning the byte count.
    async fn download_object(&self, object_path: &str, dest: &Path) -> Result<u64, StorageError>;

    /// Store `body` at `target_path`, returning the canonical path it is served from.
    async fn upload_buffer(
        &self,
        body: Bytes,
        content_type: &str,
        target_path: &str,
    ) -> Result<String, StorageError>;

    async fn set_acl_policy(&self, object_path: &str, policy: &AclPolicy) -> Result<(), StorageError>;

    async fn object_exists(&self, object_path: &str) -> Result<bool, StorageError>;
}
