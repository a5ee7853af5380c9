use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::config::settings::MediaSettings;
use crate::infrastructure::process::{ProcessError, ProcessRunner};
use crate::modules::media::command::FfmpegCommand;
use crate::modules::media::error::{MediaError, MediaResult};

pub const MANIFEST_FILE_NAME: &str = "playlist.m3u8";
pub const SEGMENT_EXTENSION: &str = "ts";
pub const SEGMENT_DURATION_SECS: u32 = 6;
const SEGMENT_FILE_PATTERN: &str = "segment_%03d.ts";

pub const MAX_WIDTH: u32 = 1280;
pub const MAX_HEIGHT: u32 = 720;

/// Bound on diagnostic output carried in errors.
pub const STDERR_TAIL_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct HlsOutput {
    pub manifest_path: PathBuf,
    /// Sorted lexicographically, which matches the zero-padded numbering.
    pub segments: Vec<PathBuf>,
}

pub fn hls_command(source: &Path, output_dir: &Path) -> FfmpegCommand {
    let scale = format!(
        "scale=w={}:h={}:force_original_aspect_ratio=decrease,pad=ceil(iw/2)*2:ceil(ih/2)*2",
        MAX_WIDTH, MAX_HEIGHT
    );
    let segment_pattern = output_dir.join(SEGMENT_FILE_PATTERN);

    FfmpegCommand::new(source, output_dir.join(MANIFEST_FILE_NAME))
        .video_codec("libx264")
        .output_args(["-profile:v", "main", "-level", "3.1", "-preset", "veryfast", "-crf", "23"])
        .output_args(["-pix_fmt", "yuv420p"])
        .video_filter(scale)
        .audio_codec("aac")
        .output_args(["-ar", "48000", "-ac", "2"])
        .audio_bitrate("128k")
        .output_args(["-f", "hls"])
        .output_args(["-hls_time".to_string(), SEGMENT_DURATION_SECS.to_string()])
        .output_args(["-hls_list_size", "0", "-hls_playlist_type", "vod", "-start_number", "0"])
        .output_arg("-hls_segment_filename")
        .output_arg(segment_pattern.to_string_lossy().to_string())
}

/// Transcodes `source` into `output_dir` and returns what the tool produced.
pub async fn transcode_to_hls(
    runner: &dyn ProcessRunner,
    settings: &MediaSettings,
    source: &Path,
    output_dir: &Path,
) -> MediaResult<HlsOutput> {
    let spec = hls_command(source, output_dir)
        .into_spec(&settings.ffmpeg_bin, settings.transcode_timeout);

    info!("Transcoding {} to HLS", source.display());

    let output = runner.run(&spec).await.map_err(|e| match e {
        ProcessError::Timeout { secs, .. } => MediaError::TranscodeTimeout(secs),
        other => MediaError::Process(other),
    })?;

    if !output.success() {
        return Err(MediaError::TranscodeFailed {
            exit_code: output.exit_code,
            stderr_tail: output.stderr_tail(STDERR_TAIL_CHARS),
        });
    }

    let manifest_path = output_dir.join(MANIFEST_FILE_NAME);
    if !fs::try_exists(&manifest_path).await? {
        return Err(MediaError::TranscodeFailed {
            exit_code: output.exit_code,
            stderr_tail: format!("{} was not produced", MANIFEST_FILE_NAME),
        });
    }

    let segments = collect_segments(output_dir).await?;
    debug!("Collected {} segments from {}", segments.len(), output_dir.display());

    Ok(HlsOutput {
        manifest_path,
        segments,
    })
}

/// Lists every `.ts` file directly inside `dir`, sorted by name.
pub async fn collect_segments(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut segments = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_segment = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SEGMENT_EXTENSION));
        if is_segment && entry.file_type().await?.is_file() {
            segments.push(path);
        }
    }

    segments.sort();
    Ok(segments)
}
