use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const JOB_DIR_PREFIX: &str = "media-job-";

#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a fresh directory for `job_id`.
    ///
    /// Fails with `AlreadyExists` rather than reusing a directory, so two jobs
    /// can never end up sharing one.
    pub async fn new_job_dir(&self, job_id: Uuid) -> io::Result<JobDir> {
        fs::create_dir_all(&self.root).await?;

        let path = self.root.join(format!("{}{}", JOB_DIR_PREFIX, job_id));
        fs::create_dir(&path).await?;
        debug!("Created staging directory {}", path.display());

        Ok(JobDir {
            job_id,
            path,
            released: false,
        })
    }
}

#[derive(Debug)]
pub struct JobDir {
    job_id: Uuid,
    path: PathBuf,
    released: bool,
}

impl JobDir {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Removes `files`, then the whole directory tree. Best effort.
    pub async fn cleanup(mut self, files: &[PathBuf]) {
        for file in files {
            match fs::remove_file(file).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => debug!("Failed to remove {}: {}", file.display(), e),
            }
        }

        match fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("Removed staging directory {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove staging directory {}: {}",
                self.path.display(),
                e
            ),
        }

        self.released = true;
    }
}

// Only reached when the job future was dropped before `cleanup` ran.
impl Drop for JobDir {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(
            "Job {} dropped before cleanup, removing {}",
            self.job_id,
            self.path.display()
        );
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_dirs_are_distinct() {
        let sandbox = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(sandbox.path());

        let a = staging.new_job_dir(Uuid::new_v4()).await.unwrap();
        let b = staging.new_job_dir(Uuid::new_v4()).await.unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(sandbox.path()));
        assert!(a.path().is_dir() && b.path().is_dir());

        a.cleanup(&[]).await;
        b.cleanup(&[]).await;
    }

    #[tokio::test]
    async fn test_same_job_id_is_rejected() {
        let sandbox = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(sandbox.path());
        let id = Uuid::new_v4();

        let first = staging.new_job_dir(id).await.unwrap();
        let err = staging.new_job_dir(id).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        first.cleanup(&[]).await;
    }

    #[tokio::test]
    async fn test_cleanup_removes_tree_and_outside_files() {
        let sandbox = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(sandbox.path().join("jobs"));
        let job = staging.new_job_dir(Uuid::new_v4()).await.unwrap();

        fs::create_dir(job.file("hls")).await.unwrap();
        fs::write(job.file("hls/segment_000.ts"), b"ts").await.unwrap();
        let sidecar = sandbox.path().join("sidecar.tmp");
        fs::write(&sidecar, b"x").await.unwrap();
        let missing = sandbox.path().join("never-created");

        let dir = job.path().to_path_buf();
        job.cleanup(&[sidecar.clone(), missing]).await;

        assert!(!dir.exists());
        assert!(!sidecar.exists());
    }

    #[tokio::test]
    async fn test_cleanup_tolerates_already_removed_dir() {
        let sandbox = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(sandbox.path());
        let job = staging.new_job_dir(Uuid::new_v4()).await.unwrap();

        std::fs::remove_dir_all(job.path()).unwrap();
        job.cleanup(&[]).await;
    }

    #[tokio::test]
    async fn test_drop_without_cleanup_still_removes_dir() {
        let sandbox = tempfile::tempdir().unwrap();
        let staging = StagingArea::new(sandbox.path());
        let job = staging.new_job_dir(Uuid::new_v4()).await.unwrap();
        let dir = job.path().to_path_buf();

        drop(job);
        assert!(!dir.exists());
    }
}
