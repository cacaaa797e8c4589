use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::cores::validator::GenerationRequest;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("model ran out of accelerator memory: {message}")]
    OutOfMemory { message: String, traceback: Option<String> },
    #[error("model failed: {message}")]
    Model { message: String, traceback: Option<String> },
    #[error("model request failed: {0}")]
    Transport(String),
    #[error("failed to load model: {0}")]
    Load(String),
}

impl PipelineError {
    pub fn traceback(&self) -> Option<&str> {
        match self {
            PipelineError::OutOfMemory { traceback, .. } | PipelineError::Model { traceback, .. } => traceback.as_deref(),
            _ => None,
        }
    }
}

// A generated PNG plus what the model actually used
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
    pub inference_time: f64,
}

// A loaded model; reused across jobs.
#[async_trait]
pub trait ImagePipeline: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, PipelineError>;
}

#[async_trait]
pub trait PipelineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn ImagePipeline>, PipelineError>;
}
