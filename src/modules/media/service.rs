use bytes::Bytes;
use futures_util::{StreamExt, TryStreamExt, stream};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{MediaError, MediaResult};
use super::frames::{
    self, DEFAULT_AUTO_THUMBNAIL_TIMESTAMP, DEFAULT_FRAME_COUNT, clamp_timestamp, frame_timestamps,
};
use super::manifest::rewrite_manifest;
use super::model::{FrameBatchResult, HlsResult, ThumbnailResult};
use super::probe::{HLS_DURATION_FALLBACK, THUMBNAIL_DURATION_FALLBACK, get_video_duration};
use super::staging::{JobDir, StagingArea};
use super::transcoder::{self, MANIFEST_FILE_NAME};
use crate::config::settings::MediaSettings;
use crate::infrastructure::process::ProcessRunner;
use crate::infrastructure::storage::{AclPolicy, ObjectStore};

const SOURCE_FILE_NAME: &str = "source";
const HLS_OUTPUT_DIR: &str = "hls";
const FRAMES_OUTPUT_DIR: &str = "frames";

const SEGMENT_CONTENT_TYPE: &str = "video/mp2t";
const MANIFEST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

#[derive(Clone)]
pub struct MediaService {
    store: Arc<dyn ObjectStore>,
    runner: Arc<dyn ProcessRunner>,
    staging: StagingArea,
    settings: MediaSettings,
}

impl MediaService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        runner: Arc<dyn ProcessRunner>,
        settings: MediaSettings,
    ) -> Self {
        Self {
            store,
            runner,
            staging: StagingArea::new(settings.temp_root.clone()),
            settings,
        }
    }

    // --- HLS ---

    pub async fn transcode_to_hls(&self, source_path: &str, owner_id: &str) -> MediaResult<HlsResult> {
        let job = self.staging.new_job_dir(Uuid::new_v4()).await?;
        info!("🎬 HLS job {} started for {}", job.job_id(), source_path);

        let local_source = job.file(SOURCE_FILE_NAME);
        let result = self.run_hls(&job, &local_source, source_path, owner_id).await;

        let job_id = job.job_id();
        job.cleanup(&[local_source]).await;
        log_outcome("HLS", job_id, &result);
        result
    }

    async fn run_hls(
        &self,
        job: &JobDir,
        local_source: &Path,
        source_path: &str,
        owner_id: &str,
    ) -> MediaResult<HlsResult> {
        self.download_source(source_path, local_source).await?;

        let duration = get_video_duration(
            self.runner.as_ref(),
            &self.settings,
            local_source,
            HLS_DURATION_FALLBACK,
        )
        .await;

        let output_dir = job.file(HLS_OUTPUT_DIR);
        fs::create_dir(&output_dir).await?;

        let output =
            transcoder::transcode_to_hls(self.runner.as_ref(), &self.settings, local_source, &output_dir)
                .await?;
        info!("Transcode produced {} segments", output.segments.len());

        let prefix = format!("hls/{}", job.job_id());
        let final_paths = self.upload_segments(&output.segments, &prefix, owner_id).await?;

        // Every segment is uploaded before the manifest that references them.
        let raw_manifest = fs::read_to_string(&output.manifest_path).await?;
        let rewritten = rewrite_manifest(&raw_manifest, &final_paths)?;
        if rewritten.replaced != output.segments.len() {
            return Err(MediaError::ManifestMismatch(format!(
                "manifest references {} segments but {} were produced",
                rewritten.replaced,
                output.segments.len()
            )));
        }

        let manifest_path = self
            .upload_with_acl(
                Bytes::from(rewritten.text),
                MANIFEST_CONTENT_TYPE,
                &format!("{}/{}", prefix, MANIFEST_FILE_NAME),
                owner_id,
            )
            .await?;

        let segment_paths = output
            .segments
            .iter()
            .filter_map(|p| final_paths.get(&file_name(p)).cloned())
            .collect();

        Ok(HlsResult {
            manifest_path,
            segment_paths,
            duration,
        })
    }

    /// Uploads segments with bounded parallelism. Returns filename -> final path.
    async fn upload_segments(
        &self,
        segments: &[PathBuf],
        prefix: &str,
        owner_id: &str,
    ) -> MediaResult<HashMap<String, String>> {
        let uploads = segments.iter().cloned().map(|segment: PathBuf| async move {
            let name = file_name(&segment);
            let body = fs::read(&segment).await?;
            let path = self
                .upload_with_acl(
                    Bytes::from(body),
                    SEGMENT_CONTENT_TYPE,
                    &format!("{}/{}", prefix, name),
                    owner_id,
                )
                .await?;
            Ok::<_, MediaError>((name, path))
        });

        stream::iter(uploads)
            .buffer_unordered(self.settings.upload_concurrency.max(1))
            .try_collect()
            .await
    }

    pub async fn check_hls_manifest_exists(&self, manifest_path: &str) -> bool {
        match self.store.object_exists(manifest_path).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Manifest existence check failed for {}: {}", manifest_path, e);
                false
            }
        }
    }

    // --- THUMBNAILS ---

    /// Thumbnail at `timestamp` (default 2s), clamped into the video.
    pub async fn generate_auto_thumbnail(
        &self,
        source_path: &str,
        owner_id: &str,
        timestamp: Option<f64>,
    ) -> MediaResult<ThumbnailResult> {
        let timestamp = timestamp.unwrap_or(DEFAULT_AUTO_THUMBNAIL_TIMESTAMP);
        self.generate_thumbnail_at_timestamp(source_path, owner_id, timestamp)
            .await
    }

    pub async fn generate_thumbnail_at_timestamp(
        &self,
        source_path: &str,
        owner_id: &str,
        timestamp: f64,
    ) -> MediaResult<ThumbnailResult> {
        let job = self.staging.new_job_dir(Uuid::new_v4()).await?;
        info!("🖼️ Thumbnail job {} started for {} at {}s", job.job_id(), source_path, timestamp);

        let local_source = job.file(SOURCE_FILE_NAME);
        let result = self
            .run_single_thumbnail(&job, &local_source, source_path, owner_id, timestamp)
            .await;

        let job_id = job.job_id();
        job.cleanup(&[local_source]).await;
        log_outcome("Thumbnail", job_id, &result);
        result
    }

    async fn run_single_thumbnail(
        &self,
        job: &JobDir,
        local_source: &Path,
        source_path: &str,
        owner_id: &str,
        requested: f64,
    ) -> MediaResult<ThumbnailResult> {
        let duration = self.download_and_probe_for_thumbnails(source_path, local_source).await?;
        let timestamp = clamp_timestamp(requested, duration);

        let output = job.file("thumbnail.jpg");
        frames::extract_frame(
            self.runner.as_ref(),
            &self.settings,
            local_source,
            timestamp,
            &output,
        )
        .await?;

        let thumbnail_path = self.upload_image(&output, owner_id).await?;
        Ok(ThumbnailResult {
            thumbnail_path,
            timestamp,
        })
    }

    /// `frame_count` (default 6) evenly spaced thumbnails; frames that fail are skipped.
    pub async fn extract_multiple_frames(
        &self,
        source_path: &str,
        owner_id: &str,
        frame_count: Option<usize>,
    ) -> MediaResult<FrameBatchResult> {
        let frame_count = frame_count.unwrap_or(DEFAULT_FRAME_COUNT);
        let job = self.staging.new_job_dir(Uuid::new_v4()).await?;
        info!(
            "🖼️ Frame batch job {} started for {} ({} frames)",
            job.job_id(),
            source_path,
            frame_count
        );

        let local_source = job.file(SOURCE_FILE_NAME);
        let result = self
            .run_frame_batch(&job, &local_source, source_path, owner_id, frame_count)
            .await;

        let job_id = job.job_id();
        job.cleanup(&[local_source]).await;
        log_outcome("Frame batch", job_id, &result);
        result
    }

    async fn run_frame_batch(
        &self,
        job: &JobDir,
        local_source: &Path,
        source_path: &str,
        owner_id: &str,
        frame_count: usize,
    ) -> MediaResult<FrameBatchResult> {
        let duration = self.download_and_probe_for_thumbnails(source_path, local_source).await?;
        let timestamps = frame_timestamps(duration, frame_count);

        let output_dir = job.file(FRAMES_OUTPUT_DIR);
        fs::create_dir(&output_dir).await?;

        let batch = frames::extract_frames(
            self.runner.as_ref(),
            &self.settings,
            local_source,
            &timestamps,
            &output_dir,
        )
        .await;

        let mut result = FrameBatchResult::default();
        for (timestamp, image) in batch.into_frames() {
            let thumbnail_path = self.upload_image(&image, owner_id).await?;
            result.frames.push(ThumbnailResult {
                thumbnail_path,
                timestamp,
            });
        }

        Ok(result)
    }

    // --- SHARED STEPS ---

    async fn download_source(&self, source_path: &str, local_source: &Path) -> MediaResult<u64> {
        info!("⬇️ Downloading {}", source_path);
        self.store
            .download_object(source_path, local_source)
            .await
            .map_err(MediaError::Download)?;

        let size = fs::metadata(local_source).await?.len();
        if size == 0 {
            return Err(MediaError::SourceEmpty(source_path.to_string()));
        }

        info!("⬇️ Downloaded {} bytes", size);
        Ok(size)
    }

    async fn download_and_probe_for_thumbnails(
        &self,
        source_path: &str,
        local_source: &Path,
    ) -> MediaResult<f64> {
        self.download_source(source_path, local_source).await?;
        let duration = get_video_duration(
            self.runner.as_ref(),
            &self.settings,
            local_source,
            THUMBNAIL_DURATION_FALLBACK,
        )
        .await;
        Ok(duration)
    }

    async fn upload_image(&self, image: &Path, owner_id: &str) -> MediaResult<String> {
        let body = fs::read(image).await?;
        let target = format!("uploads/{}.jpg", Uuid::new_v4());
        self.upload_with_acl(Bytes::from(body), mime::IMAGE_JPEG.as_ref(), &target, owner_id)
            .await
    }

    /// Upload then apply the owner/public policy. Only both together count as stored.
    async fn upload_with_acl(
        &self,
        body: Bytes,
        content_type: &str,
        target: &str,
        owner_id: &str,
    ) -> MediaResult<String> {
        let path = self
            .store
            .upload_buffer(body, content_type, target)
            .await
            .map_err(MediaError::Upload)?;

        self.store
            .set_acl_policy(&path, &AclPolicy::public(owner_id))
            .await
            .map_err(MediaError::Acl)?;

        Ok(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn log_outcome<T>(kind: &str, job_id: Uuid, result: &MediaResult<T>) {
    match result {
        Ok(_) => info!("✅ {} job {} completed", kind, job_id),
        Err(e) => warn!("❌ {} job {} failed: {}", kind, job_id, e),
    }
}
