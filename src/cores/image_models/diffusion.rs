use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::configs::settings::InferenceConfig;
use crate::cores::image_models::image_controller::{GeneratedImage, ImagePipeline, PipelineError, PipelineLoader};
use crate::cores::validator::GenerationRequest;

#[derive(Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
}

#[derive(Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    num_inference_steps: u32,
    guidance_scale: f64,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<ImageData>,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

// Error body sent by the sidecar
#[derive(Deserialize, Default)]
struct SidecarError {
    #[serde(default)]
    error: String,
    #[serde(default)]
    traceback: Option<String>,
}

/// Loads a diffusion model inside the inference sidecar.
pub struct DiffusionLoader {
    client: Client,
    base_url: String,
    model_name: String,
}

impl DiffusionLoader {
    pub fn new(config: &InferenceConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PipelineError::Load(format!("Failed to build http client: {}", err)))?;
        Ok(DiffusionLoader {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model_name: config.model_name.clone(),
        })
    }
}

#[async_trait]
impl PipelineLoader for DiffusionLoader {
    async fn load(&self) -> Result<Arc<dyn ImagePipeline>, PipelineError> {
        let url = format!("{}/v1/models/load", self.base_url);
        let response = self.client.post(url)
            .json(&LoadRequest { model: &self.model_name })
            .send()
            .await
            .map_err(|err| PipelineError::Load(format!("Request failed: {}", err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: SidecarError = response.json().await.unwrap_or_default();
            return Err(PipelineError::Load(format!("{} returned {}: {}", self.model_name, status, body.error)));
        }

        Ok(Arc::new(DiffusionPipeline {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model_name: self.model_name.clone(),
        }))
    }
}

/// Handle to a model already loaded by [`DiffusionLoader`].
pub struct DiffusionPipeline {
    client: Client,
    base_url: String,
    model_name: String,
}

#[async_trait]
impl ImagePipeline for DiffusionPipeline {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage, PipelineError> {
        // 1. Construct the request body for the image generation API
        let request_body = ImageGenerationRequest {
            model: &self.model_name,
            prompt: request.prompt(),
            num_inference_steps: request.num_inference_steps(),
            guidance_scale: request.guidance_scale(),
            width: request.width(),
            height: request.height(),
            seed: request.seed(),
            response_format: "b64_json",
        };

        // 2. Send the POST request
        let started = Instant::now();
        let url = format!("{}/v1/images/generations", self.base_url);
        let response = self.client.post(url)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| PipelineError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: SidecarError = response.json().await.unwrap_or_default();
            return Err(classify_failure(status, body.error, body.traceback));
        }

        // 3. Decode the first image
        let parsed: ImageGenerationResponse = response.json()
            .await
            .map_err(|err| PipelineError::Model { message: format!("Failed to parse response: {}", err), traceback: None })?;
        let encoded = parsed.data.into_iter()
            .find_map(|image| image.b64_json)
            .ok_or_else(|| PipelineError::Model { message: "response contained no image".to_string(), traceback: None })?;
        let bytes = STANDARD.decode(encoded.trim())
            .map_err(|err| PipelineError::Model { message: format!("image is not valid base64: {}", err), traceback: None })?;

        Ok(GeneratedImage {
            bytes: Bytes::from(bytes),
            width: request.width(),
            height: request.height(),
            seed: parsed.seed.or(request.seed()),
            inference_time: started.elapsed().as_secs_f64(),
        })
    }
}

pub(crate) fn classify_failure(status: StatusCode, message: String, traceback: Option<String>) -> PipelineError {
    let message = if message.is_empty() { format!("sidecar returned {}", status) } else { message };
    let lowered = message.to_lowercase();
    if status == StatusCode::INSUFFICIENT_STORAGE || lowered.contains("out of memory") || lowered.contains("outofmemory") {
        PipelineError::OutOfMemory { message, traceback }
    } else {
        PipelineError::Model { message, traceback }
    }
}
