use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::config::settings::MediaSettings;
use crate::infrastructure::process::{ProcessError, ProcessRunner};
use crate::modules::media::command::FfmpegCommand;
use crate::modules::media::error::{MediaError, MediaResult};

pub const THUMBNAIL_WIDTH: u32 = 1280;
pub const THUMBNAIL_HEIGHT: u32 = 720;

/// Distance kept from the end of the video when a timestamp is out of range.
pub const END_MARGIN_SECS: f64 = 0.5;

pub const DEFAULT_AUTO_THUMBNAIL_TIMESTAMP: f64 = 2.0;
pub const DEFAULT_FRAME_COUNT: usize = 6;

const STDERR_TAIL_CHARS: usize = 500;

/// Maps `timestamp` into `[0, duration)`.
///
/// Anything at or past the end becomes `duration - 0.5`. The result is never
/// negative, so very short videos collapse to the first frame.
pub fn clamp_timestamp(timestamp: f64, duration: f64) -> f64 {
    let timestamp = if timestamp.is_finite() { timestamp.max(0.0) } else { 0.0 };
    if timestamp >= duration {
        (duration - END_MARGIN_SECS).max(0.0)
    } else {
        timestamp
    }
}

/// `count` evenly spaced timestamps at `duration / (count + 1) * i` for `i = 1..=count`.
pub fn frame_timestamps(duration: f64, count: usize) -> Vec<f64> {
    let step = duration / (count + 1) as f64;
    (1..=count)
        .map(|i| clamp_timestamp(step * i as f64, duration))
        .collect()
}

pub fn frame_command(source: &Path, timestamp: f64, output: &Path) -> FfmpegCommand {
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = THUMBNAIL_WIDTH,
        h = THUMBNAIL_HEIGHT
    );

    FfmpegCommand::new(source, output)
        .seek(timestamp)
        .single_frame()
        .video_filter(filter)
        .output_args(["-q:v", "2"])
}

/// Writes the frame at `timestamp` to `output`, overwriting it if present.
pub async fn extract_frame(
    runner: &dyn ProcessRunner,
    settings: &MediaSettings,
    source: &Path,
    timestamp: f64,
    output: &Path,
) -> MediaResult<()> {
    let spec = frame_command(source, timestamp, output)
        .into_spec(&settings.ffmpeg_bin, settings.transcode_timeout);

    let result = runner.run(&spec).await.map_err(|e| match e {
        ProcessError::Timeout { secs, .. } => MediaError::TranscodeTimeout(secs),
        other => MediaError::Process(other),
    })?;

    if !result.success() {
        return Err(MediaError::FrameExtractionFailed {
            timestamp,
            exit_code: result.exit_code,
            stderr_tail: result.stderr_tail(STDERR_TAIL_CHARS),
        });
    }

    // ffmpeg exits 0 without writing anything when seeking past the last frame.
    let written = match fs::metadata(output).await {
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    };
    if !written {
        return Err(MediaError::FrameExtractionFailed {
            timestamp,
            exit_code: result.exit_code,
            stderr_tail: format!("{} was not written", output.display()),
        });
    }

    Ok(())
}

/// Collects the frames of a batch that succeeded.
///
/// Failed frames are logged and dropped; an all-failed batch is just empty.
#[derive(Debug)]
pub struct FrameBatch<T> {
    frames: Vec<T>,
    skipped: usize,
}

impl<T> Default for FrameBatch<T> {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            skipped: 0,
        }
    }
}

impl<T> FrameBatch<T> {
    pub fn record(&mut self, index: usize, timestamp: f64, result: MediaResult<T>) {
        match result {
            Ok(frame) => self.frames.push(frame),
            Err(e) => {
                warn!("Skipping frame {} at {:.3}s: {}", index, timestamp, e);
                self.skipped += 1;
            }
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn into_frames(self) -> Vec<T> {
        self.frames
    }
}

/// Extracts one frame per timestamp into `output_dir`, skipping failures.
///
/// Returns `(timestamp, path)` for each frame that was written.
pub async fn extract_frames(
    runner: &dyn ProcessRunner,
    settings: &MediaSettings,
    source: &Path,
    timestamps: &[f64],
    output_dir: &Path,
) -> FrameBatch<(f64, std::path::PathBuf)> {
    let mut batch = FrameBatch::default();

    for (i, &timestamp) in timestamps.iter().enumerate() {
        let index = i + 1;
        let output = output_dir.join(format!("frame_{:03}.jpg", index));
        let result = extract_frame(runner, settings, source, timestamp, &output)
            .await
            .map(|()| (timestamp, output));
        batch.record(index, timestamp, result);
    }

    info!(
        "Extracted {}/{} frames ({} skipped)",
        batch.len(),
        timestamps.len(),
        batch.skipped()
    );
    batch
}
