use std::env;
use std::str::FromStr;

pub enum EnvKey {
    AmqpUrl,
    MinioUrl,
    MinioRegion,
    MinioBucket,
    MinioAccessKey,
    MinioSecretKey,
    PublicBaseUrl,
    CannedAcl,
    TempRoot,
    FfmpegBin,
    FfprobeBin,
    ProbeTimeoutSecs,
    TranscodeTimeoutSecs,
    WorkerConcurrency,
    UploadConcurrency,
    JobQueue,
    ResultQueue,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::AmqpUrl => "AMQP_URL",
            EnvKey::MinioUrl => "MINIO_ENDPOINT",
            EnvKey::MinioRegion => "MINIO_REGION",
            EnvKey::MinioBucket => "MINIO_BUCKET_VIDEOS",
            EnvKey::MinioAccessKey => "AWS_ACCESS_KEY_ID",
            EnvKey::MinioSecretKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::PublicBaseUrl => "STORAGE_PUBLIC_BASE_URL",
            EnvKey::CannedAcl => "STORAGE_CANNED_ACL",
            EnvKey::TempRoot => "MEDIA_TEMP_ROOT",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::FfprobeBin => "FFPROBE_BIN",
            EnvKey::ProbeTimeoutSecs => "PROBE_TIMEOUT_SECS",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::WorkerConcurrency => "WORKER_CONCURRENCY",
            EnvKey::UploadConcurrency => "UPLOAD_CONCURRENCY",
            EnvKey::JobQueue => "MEDIA_JOB_QUEUE",
            EnvKey::ResultQueue => "MEDIA_RESULT_QUEUE",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

/// `None` when the variable is unset, empty or unparseable.
pub fn get_optional<T: FromStr>(key: EnvKey) -> Option<T> {
    get(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| v.trim().parse::<T>().ok())
}
