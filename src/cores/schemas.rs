use actix_web::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::cores::validator::ValidationError;

// ------------------------------------------ Job errors ------------------------------------------
// One variant per failing stage. The first failure ends the job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Initialization(String),
    #[error("{0}")]
    Model(String),
    #[error("{0}")]
    OutOfMemory(String),
    #[error("{0}")]
    Storage(String),
    #[error("{0}")]
    Internal(String),
}

impl JobError {
    pub fn error_type(&self) -> &'static str {
        match self {
            JobError::Validation(err) => err.kind.as_str(),
            JobError::Initialization(_) => "initialization_error",
            JobError::Model(_) => "model_error",
            JobError::OutOfMemory(_) => "oom_error",
            JobError::Storage(_) => "storage_error",
            JobError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            JobError::Validation(_) => StatusCode::BAD_REQUEST,
            JobError::Initialization(_) => StatusCode::SERVICE_UNAVAILABLE,
            JobError::OutOfMemory(_) => StatusCode::INSUFFICIENT_STORAGE,
            JobError::Model(_) | JobError::Storage(_) | JobError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// ------------------------------------------ Response payload ------------------------------------------
// The only thing a caller ever sees for a job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(untagged)]
pub enum ResponsePayload {
    Success {
        image_url: String,
        processing_time: f64,   // seconds, whole job
    },
    Error {
        error: String,
        error_type: String,
    },
}

impl ResponsePayload {
    pub fn success(image_url: String, elapsed: std::time::Duration) -> Self {
        // two decimals are enough for a multi-second generation
        let processing_time = (elapsed.as_secs_f64() * 100.0).round() / 100.0;
        ResponsePayload::Success { image_url, processing_time }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResponsePayload::Success { .. })
    }

    pub fn error_type(&self) -> Option<&str> {
        match self {
            ResponsePayload::Success { .. } => None,
            ResponsePayload::Error { error_type, .. } => Some(error_type),
        }
    }
}

impl From<&JobError> for ResponsePayload {
    fn from(err: &JobError) -> Self {
        ResponsePayload::Error {
            error: err.to_string(),
            error_type: err.error_type().to_string(),
        }
    }
}
