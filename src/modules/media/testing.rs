use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::infrastructure::process::{ProcessError, ProcessOutput, ProcessRunner, ProcessSpec};
use crate::infrastructure::storage::{AclPolicy, ObjectStore, StorageError};

type Script = dyn Fn(&ProcessSpec) -> Result<ProcessOutput, ProcessError> + Send + Sync;

pub struct FakeRunner {
    script: Box<Script>,
    calls: Mutex<Vec<ProcessSpec>>,
}

impl FakeRunner {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&ProcessSpec) -> Result<ProcessOutput, ProcessError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError> {
        self.calls.lock().unwrap().push(spec.clone());
        (self.script)(spec)
    }
}

pub fn exit_with(code: i32, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

pub fn probe_ok(duration: f64) -> ProcessOutput {
    ProcessOutput {
        exit_code: Some(0),
        stdout: format!("{:.6}\n", duration),
        stderr: String::new(),
    }
}

/// Behaves like a successful single-output ffmpeg run.
pub fn write_output_file(spec: &ProcessSpec) -> Result<ProcessOutput, ProcessError> {
    let output = spec.args.last().expect("output path");
    std::fs::write(output, b"\xFF\xD8jpeg")?;
    Ok(exit_with(0, ""))
}

/// Behaves like a successful HLS run producing `segments` segments.
pub fn write_hls_output(spec: &ProcessSpec, segments: usize) -> Result<ProcessOutput, ProcessError> {
    let manifest = PathBuf::from(spec.args.last().expect("manifest path"));
    let dir = manifest.parent().expect("output dir");

    let mut playlist = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXT-X-PLAYLIST-TYPE:VOD\n",
    );
    for i in 0..segments {
        let name = format!("segment_{:03}.ts", i);
        std::fs::write(dir.join(&name), format!("ts-{}", i))?;
        playlist.push_str(&format!("#EXTINF:6.000000,\n{}\n", name));
    }
    playlist.push_str("#EXT-X-ENDLIST\n");
    std::fs::write(&manifest, playlist)?;

    Ok(exit_with(0, ""))
}

pub fn is_probe(spec: &ProcessSpec) -> bool {
    spec.program.ends_with("ffprobe")
}

pub fn is_hls(spec: &ProcessSpec) -> bool {
    spec.arg_after("-f") == Some("hls")
}

/// The `-i` input of an ffmpeg call, or the last argument of an ffprobe call.
pub fn input_of(spec: &ProcessSpec) -> PathBuf {
    match spec.arg_after("-i") {
        Some(input) => PathBuf::from(input),
        None => PathBuf::from(spec.args.last().expect("probe input")),
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory object store. Canonical paths are `/media/<key>`.
#[derive(Default)]
pub struct FakeStore {
    sources: Mutex<HashMap<String, Vec<u8>>>,
    objects: Mutex<HashMap<String, StoredObject>>,
    acls: Mutex<HashMap<String, AclPolicy>>,
    upload_order: Mutex<Vec<String>>,
    failing_uploads: Mutex<Option<String>>,
    failing_acls: Mutex<Option<String>>,
}

impl FakeStore {
    pub fn with_source(path: &str, body: &[u8]) -> Self {
        let store = Self::default();
        store.sources.lock().unwrap().insert(path.to_string(), body.to_vec());
        store
    }

    pub fn fail_uploads_containing(&self, needle: &str) {
        *self.failing_uploads.lock().unwrap() = Some(needle.to_string());
    }

    pub fn fail_acl_containing(&self, needle: &str) {
        *self.failing_acls.lock().unwrap() = Some(needle.to_string());
    }

    pub fn insert_object(&self, path: &str) {
        self.objects.lock().unwrap().insert(
            path.to_string(),
            StoredObject {
                body: Bytes::new(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn acl(&self, path: &str) -> Option<AclPolicy> {
        self.acls.lock().unwrap().get(path).cloned()
    }

    pub fn upload_order(&self) -> Vec<String> {
        self.upload_order.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn download_object(&self, object_path: &str, dest: &Path) -> Result<u64, StorageError> {
        let body = self
            .sources
            .lock()
            .unwrap()
            .get(object_path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(object_path.to_string()))?;
        tokio::fs::write(dest, &body).await?;
        Ok(body.len() as u64)
    }

    async fn upload_buffer(
        &self,
        body: Bytes,
        content_type: &str,
        target_path: &str,
    ) -> Result<String, StorageError> {
        if let Some(needle) = self.failing_uploads.lock().unwrap().as_deref() {
            if target_path.contains(needle) {
                return Err(StorageError::Io(std::io::Error::other("bucket unavailable")));
            }
        }
        let path = format!("/media/{}", target_path);
        self.objects.lock().unwrap().insert(
            path.clone(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        self.upload_order.lock().unwrap().push(path.clone());
        Ok(path)
    }

    async fn set_acl_policy(&self, object_path: &str, policy: &AclPolicy) -> Result<(), StorageError> {
        if !self.objects.lock().unwrap().contains_key(object_path) {
            return Err(StorageError::NotFound(object_path.to_string()));
        }
        if let Some(needle) = self.failing_acls.lock().unwrap().as_deref() {
            if object_path.contains(needle) {
                return Err(StorageError::InvalidPolicy("tagging rejected".to_string()));
            }
        }
        self.acls
            .lock()
            .unwrap()
            .insert(object_path.to_string(), policy.clone());
        Ok(())
    }

    async fn object_exists(&self, object_path: &str) -> Result<bool, StorageError> {
        if object_path.contains("unreachable") {
            return Err(StorageError::Io(std::io::Error::other("connection reset")));
        }
        Ok(self.objects.lock().unwrap().contains_key(object_path))
    }
}
