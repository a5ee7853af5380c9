use std::path::Path;
use tracing::{debug, warn};

use crate::config::settings::MediaSettings;
use crate::infrastructure::process::{ProcessError, ProcessRunner, ProcessSpec};
use crate::modules::media::error::{MediaError, MediaResult};

/// The HLS result only reports duration, so unknown is fine.
pub const HLS_DURATION_FALLBACK: f64 = 0.0;

/// Thumbnail timestamps are spaced by duration, so unknown must not be zero.
pub const THUMBNAIL_DURATION_FALLBACK: f64 = 10.0;

const STDERR_TAIL_CHARS: usize = 200;

pub fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path.to_string_lossy().to_string(),
    ]
}

/// Parses ffprobe's bare duration output. Rejects `N/A`, negatives and non-finite values.
pub fn parse_duration(stdout: &str) -> Option<f64> {
    let value = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    value
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

pub async fn probe_duration(
    runner: &dyn ProcessRunner,
    settings: &MediaSettings,
    path: &Path,
) -> MediaResult<f64> {
    let spec = ProcessSpec::new(&settings.ffprobe_bin, probe_args(path))
        .with_timeout(settings.probe_timeout);

    let output = runner.run(&spec).await.map_err(|e| match e {
        ProcessError::Timeout { secs, .. } => MediaError::ProbeTimeout(secs),
        other => MediaError::Process(other),
    })?;

    if !output.success() {
        return Err(MediaError::ProbeFailed(format!(
            "exit code {:?}: {}",
            output.exit_code,
            output.stderr_tail(STDERR_TAIL_CHARS)
        )));
    }

    parse_duration(&output.stdout).ok_or_else(|| {
        MediaError::ProbeFailed(format!("unparseable duration {:?}", output.stdout.trim()))
    })
}

/// Duration in seconds, or `fallback` if probing fails for any reason.
pub async fn get_video_duration(
    runner: &dyn ProcessRunner,
    settings: &MediaSettings,
    path: &Path,
    fallback: f64,
) -> f64 {
    match probe_duration(runner, settings, path).await {
        Ok(duration) => {
            debug!("Probed duration {:.3}s for {}", duration, path.display());
            duration
        }
        Err(e) => {
            warn!("Probe degraded for {}, using {}s: {}", path.display(), fallback, e);
            fallback
        }
    }
}
