//! Response envelope from the metrics endpoint
//!
//! Shape: `{ status, metrics, analysis?, last_updated? }`. Only `status ==
//! "Success"` with an object-valued `metrics` is accepted.

use serde_json::{Map, Value};
use thiserror::Error;

/// Status literal the endpoint uses for a successful response
pub const SUCCESS_STATUS: &str = "Success";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    #[error("response body is not a JSON object")]
    NotAnObject,
    #[error("unsuccessful status: {0}")]
    Unsuccessful(String),
    #[error("status field missing")]
    MissingStatus,
    #[error("metrics section missing or not an object")]
    MissingMetrics,
}

/// Validated envelope. `metrics` is kept raw until normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsEnvelope {
    pub metrics: Map<String, Value>,
    pub analysis: Option<String>,
    pub last_updated: Option<String>,
}

impl MetricsEnvelope {
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut root) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        match root.get("status") {
            Some(Value::String(status)) if status == SUCCESS_STATUS => {}
            Some(Value::String(status)) => return Err(EnvelopeError::Unsuccessful(status.clone())),
            Some(other) => return Err(EnvelopeError::Unsuccessful(other.to_string())),
            None => return Err(EnvelopeError::MissingStatus),
        }

        let metrics = match root.remove("metrics") {
            Some(Value::Object(metrics)) => metrics,
            _ => return Err(EnvelopeError::MissingMetrics),
        };

        Ok(Self {
            metrics,
            analysis: take_string(&mut root, "analysis"),
            last_updated: take_string(&mut root, "last_updated"),
        })
    }

    /// Metric keys present in the payload (for logging)
    pub fn metric_keys(&self) -> Vec<&str> {
        self.metrics.keys().map(String::as_str).collect()
    }
}

fn take_string(root: &mut Map<String, Value>, key: &str) -> Option<String> {
    match root.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}
