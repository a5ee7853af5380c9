use super::{AclPolicy, ObjectStore, StorageError, Visibility};
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, Tag, Tagging};
use aws_sdk_s3::{Client, config::BehaviorVersion, config::Credentials, config::Region};
use bytes::Bytes;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::settings::AppConfig;

#[derive(Clone)]
pub struct StorageService {
    pub client: Client,
    pub bucket: String,
    /// Prefix for canonical object paths, e.g. `https://cdn.example.com/videos`.
    /// Falls back to `/<bucket>` when unset.
    public_base_url: Option<String>,
    canned_acl: bool,
}

impl StorageService {
    pub async fn new(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            &config.minio_access_key,
            &config.minio_secret_key,
            None,
            None,
            "static",
        );

        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.minio_region.clone()))
            .endpoint_url(&config.minio_url)
            .credentials_provider(credentials)
            .force_path_style(true) // Required for MinIO
            .build();

        let client = Client::from_conf(s3_config);

        info!("✅ Connected to S3 (MinIO) bucket '{}'", config.minio_bucket);

        Self {
            client,
            bucket: config.minio_bucket.clone(),
            public_base_url: config
                .public_base_url
                .as_ref()
                .map(|u| u.as_str().trim_end_matches('/').to_string()),
            canned_acl: config.storage_canned_acl,
        }
    }

    /// Canonical path other systems serve `key` from.
    pub fn public_path(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base, key),
            None => format!("/{}/{}", self.bucket, key),
        }
    }

    /// Accepts a canonical path, a `/<bucket>/<key>` path or a bare key.
    pub fn key_from_path<'a>(&self, object_path: &'a str) -> &'a str {
        if let Some(base) = &self.public_base_url {
            if let Some(rest) = object_path.strip_prefix(base.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    return rest.trim_start_matches('/');
                }
            }
        }
        let trimmed = object_path.trim_start_matches('/');
        match trimmed.strip_prefix(self.bucket.as_str()) {
            Some(rest) if rest.starts_with('/') => &rest[1..],
            _ => trimmed,
        }
    }
}

#[async_trait]
impl ObjectStore for StorageService {
    async fn download_object(&self, object_path: &str, dest: &Path) -> Result<u64, StorageError> {
        let key = self.key_from_path(object_path);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::s3(key, e)
                }
            })?;

        let mut body = response.body;
        let mut file = File::create(dest).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = body.try_next().await.map_err(|e| StorageError::Body {
            key: key.to_string(),
            message: e.to_string(),
        })? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded s3://{}/{} ({} bytes)", self.bucket, key, written);
        Ok(written)
    }

    async fn upload_buffer(
        &self,
        body: Bytes,
        content_type: &str,
        target_path: &str,
    ) -> Result<String, StorageError> {
        let key = self.key_from_path(target_path);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::s3(key, e))?;

        Ok(self.public_path(key))
    }

    async fn set_acl_policy(&self, object_path: &str, policy: &AclPolicy) -> Result<(), StorageError> {
        let key = self.key_from_path(object_path);

        let tag = |k: &str, v: &str| {
            Tag::builder()
                .key(k)
                .value(v)
                .build()
                .map_err(|e| StorageError::InvalidPolicy(e.to_string()))
        };
        let tagging = Tagging::builder()
            .tag_set(tag("owner", &policy.owner)?)
            .tag_set(tag("visibility", policy.visibility.as_str())?)
            .build()
            .map_err(|e| StorageError::InvalidPolicy(e.to_string()))?;

        self.client
            .put_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .tagging(tagging)
            .send()
            .await
            .map_err(|e| StorageError::s3(key, e))?;

        if self.canned_acl {
            let acl = match policy.visibility {
                Visibility::Public => ObjectCannedAcl::PublicRead,
                Visibility::Private => ObjectCannedAcl::Private,
            };
            self.client
                .put_object_acl()
                .bucket(&self.bucket)
                .key(key)
                .acl(acl)
                .send()
                .await
                .map_err(|e| StorageError::s3(key, e))?;
        }

        Ok(())
    }

    async fn object_exists(&self, object_path: &str) -> Result<bool, StorageError> {
        let key = self.key_from_path(object_path);

        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(StorageError::s3(key, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(public_base_url: Option<&str>) -> StorageService {
        let client = Client::from_conf(
            Builder::new()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .build(),
        );
        StorageService {
            client,
            bucket: "videos".to_string(),
            public_base_url: public_base_url.map(str::to_string),
            canned_acl: false,
        }
    }

    #[test]
    fn test_public_path_without_base_url() {
        let storage = service(None);
        assert_eq!(
            storage.public_path("hls/abc/segment_000.ts"),
            "/videos/hls/abc/segment_000.ts"
        );
    }

    #[test]
    fn test_public_path_with_base_url() {
        let storage = service(Some("https://cdn.example.com/media"));
        assert_eq!(
            storage.public_path("uploads/x.jpg"),
            "https://cdn.example.com/media/uploads/x.jpg"
        );
    }

    #[test]
    fn test_key_from_path_accepts_every_form() {
        let storage = service(Some("https://cdn.example.com/media"));
        assert_eq!(storage.key_from_path("uploads/raw.mp4"), "uploads/raw.mp4");
        assert_eq!(storage.key_from_path("/uploads/raw.mp4"), "uploads/raw.mp4");
        assert_eq!(storage.key_from_path("/videos/uploads/raw.mp4"), "uploads/raw.mp4");
        assert_eq!(
            storage.key_from_path("https://cdn.example.com/media/uploads/raw.mp4"),
            "uploads/raw.mp4"
        );
    }

    #[test]
    fn test_key_from_path_does_not_strip_base_url_lookalike() {
        let storage = service(Some("https://cdn.example.com/media"));
        assert_eq!(
            storage.key_from_path("https://cdn.example.com/media-old/a.jpg"),
            "https://cdn.example.com/media-old/a.jpg"
        );
    }

    #[test]
    fn test_key_from_path_does_not_strip_bucket_lookalike() {
        let storage = service(None);
        assert_eq!(storage.key_from_path("videos-archive/a.mp4"), "videos-archive/a.mp4");
    }
}
