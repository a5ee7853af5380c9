use crate::config::env::{self, EnvKey};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub amqp_url: String,
    pub minio_url: String,
    pub minio_region: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    pub public_base_url: Option<Url>,
    pub storage_canned_acl: bool,
    pub job_queue: String,
    pub result_queue: String,
    pub worker_concurrency: usize,
    pub media: MediaSettings,
}

/// Knobs for the media pipelines, independent of where jobs come from.
#[derive(Clone, Debug)]
pub struct MediaSettings {
    pub temp_root: PathBuf,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub probe_timeout: Option<Duration>,
    pub transcode_timeout: Option<Duration>,
    pub upload_concurrency: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            probe_timeout: None,
            transcode_timeout: None,
            upload_concurrency: 4,
        }
    }
}

impl MediaSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            temp_root: env::get_optional::<PathBuf>(EnvKey::TempRoot).unwrap_or(defaults.temp_root),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, &defaults.ffmpeg_bin),
            ffprobe_bin: env::get_or(EnvKey::FfprobeBin, &defaults.ffprobe_bin),
            probe_timeout: env::get_optional::<u64>(EnvKey::ProbeTimeoutSecs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            transcode_timeout: env::get_optional::<u64>(EnvKey::TranscodeTimeoutSecs)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            upload_concurrency: env::get_parsed(EnvKey::UploadConcurrency, defaults.upload_concurrency)
                .max(1),
        }
    }
}

fn required(key: EnvKey) -> Result<String, ConfigError> {
    let name = key.as_str();
    env::get(key).map_err(|_| ConfigError::Missing(name))
}

fn parse_url(key: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let minio_url = required(EnvKey::MinioUrl)?;
        parse_url(EnvKey::MinioUrl.as_str(), &minio_url)?;

        let public_base_url = match env::get_optional::<String>(EnvKey::PublicBaseUrl) {
            Some(raw) => Some(parse_url(EnvKey::PublicBaseUrl.as_str(), &raw)?),
            None => None,
        };

        Ok(Self {
            amqp_url: required(EnvKey::AmqpUrl)?,
            minio_url,
            minio_region: env::get_or(EnvKey::MinioRegion, "us-east-1"),
            minio_bucket: required(EnvKey::MinioBucket)?,
            minio_access_key: required(EnvKey::MinioAccessKey)?,
            minio_secret_key: required(EnvKey::MinioSecretKey)?,
            public_base_url,
            storage_canned_acl: env::get_parsed(EnvKey::CannedAcl, false),
            job_queue: env::get_or(EnvKey::JobQueue, "media_jobs"),
            result_queue: env::get_or(EnvKey::ResultQueue, "media_results"),
            worker_concurrency: env::get_parsed(EnvKey::WorkerConcurrency, 2usize).max(1),
            media: MediaSettings::from_env(),
        })
    }
}
