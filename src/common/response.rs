use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Envelope published to the result queue for every consumed job.
#[derive(Debug, Serialize)]
pub struct JobOutcome {
    pub request_id: Option<Uuid>,
    pub kind: String,
    pub status: String,
    pub message: String,
    pub data: Option<Value>,
    /// Set for failures caused by the input, which retrying will not fix.
    pub client_error: bool,
}

impl JobOutcome {
    pub fn success<T: Serialize>(request_id: Uuid, kind: &str, data: &T, message: &str) -> Self {
        Self {
            request_id: Some(request_id),
            kind: kind.to_string(),
            status: "success".to_string(),
            message: message.to_string(),
            data: serde_json::to_value(data).ok(),
            client_error: false,
        }
    }

    pub fn error(request_id: Option<Uuid>, kind: &str, message: &str, client_error: bool) -> Self {
        Self {
            request_id,
            kind: kind.to_string(),
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
            client_error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}
