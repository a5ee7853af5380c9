use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Work item consumed from the job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaJob {
    Hls {
        request_id: Uuid,
        source_path: String,
        owner_id: String,
    },
    AutoThumbnail {
        request_id: Uuid,
        source_path: String,
        owner_id: String,
        #[serde(default)]
        timestamp: Option<f64>,
    },
    ThumbnailAt {
        request_id: Uuid,
        source_path: String,
        owner_id: String,
        timestamp: f64,
    },
    Frames {
        request_id: Uuid,
        source_path: String,
        owner_id: String,
        #[serde(default)]
        frame_count: Option<usize>,
    },
    CheckManifest {
        request_id: Uuid,
        manifest_path: String,
    },
}

impl MediaJob {
    pub fn request_id(&self) -> Uuid {
        match self {
            MediaJob::Hls { request_id, .. }
            | MediaJob::AutoThumbnail { request_id, .. }
            | MediaJob::ThumbnailAt { request_id, .. }
            | MediaJob::Frames { request_id, .. }
            | MediaJob::CheckManifest { request_id, .. } => *request_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MediaJob::Hls { .. } => "hls",
            MediaJob::AutoThumbnail { .. } => "auto_thumbnail",
            MediaJob::ThumbnailAt { .. } => "thumbnail_at",
            MediaJob::Frames { .. } => "frames",
            MediaJob::CheckManifest { .. } => "check_manifest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hls_job() {
        let raw = r#"{"kind":"hls","request_id":"6f1c7a2e-3b7e-4d5f-9a53-0b8f1f0d2c11","source_path":"uploads/a.mp4","owner_id":"u1"}"#;
        let job: MediaJob = serde_json::from_str(raw).unwrap();
        assert_eq!(job.kind(), "hls");
        assert_eq!(
            job.request_id().to_string(),
            "6f1c7a2e-3b7e-4d5f-9a53-0b8f1f0d2c11"
        );
    }

    #[test]
    fn test_optional_fields_default_to_none() {
        let raw = r#"{"kind":"frames","request_id":"6f1c7a2e-3b7e-4d5f-9a53-0b8f1f0d2c11","source_path":"s","owner_id":"u"}"#;
        match serde_json::from_str::<MediaJob>(raw).unwrap() {
            MediaJob::Frames { frame_count, .. } => assert_eq!(frame_count, None),
            other => panic!("unexpected job: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let raw = r#"{"kind":"live_ingest","request_id":"6f1c7a2e-3b7e-4d5f-9a53-0b8f1f0d2c11"}"#;
        assert!(serde_json::from_str::<MediaJob>(raw).is_err());
    }
}
