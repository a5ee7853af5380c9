use serde::{Deserialize, Serialize};

/// Uploaded HLS package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HlsResult {
    pub manifest_path: String,
    pub segment_paths: Vec<String>,
    /// Seconds; 0 when the probe could not determine it.
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailResult {
    pub thumbnail_path: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameBatchResult {
    pub frames: Vec<ThumbnailResult>,
}
