use futures::FutureExt;
use log::{error, info, warn};
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::cores::devices::device_controller::Accelerator;
use crate::cores::image_models::image_controller::{GeneratedImage, ImagePipeline, PipelineError};
use crate::cores::schemas::JobError;
use crate::cores::validator::GenerationRequest;

/// Run one generation and release accelerator memory afterwards.
///
/// The pipeline call is isolated: an error or a panic inside it becomes a
/// `model_error` or `oom_error`. `empty_cache` runs exactly once whatever the
/// outcome, and a failed release only gets logged.
pub async fn generate(
    pipeline: &dyn ImagePipeline,
    accelerator: &dyn Accelerator,
    request: &GenerationRequest,
) -> Result<GeneratedImage, JobError> {
    let outcome = AssertUnwindSafe(pipeline.generate(request)).catch_unwind().await;

    if let Err(err) = accelerator.empty_cache().await {
        warn!(target: "error_log", "GPU memory cleanup after generation failed: {}", err);
    }

    match outcome {
        Ok(Ok(image)) => {
            let seed = image.seed.map(|seed| seed.to_string()).unwrap_or_else(|| "random".to_string());
            info!(
                "Generated {}x{} image for user {} in {:.2}s ({} bytes, seed {})",
                image.width, image.height, request.user_id(), image.inference_time, image.bytes.len(), seed
            );
            Ok(image)
        }
        Ok(Err(err)) => {
            error!(target: "error_log", "Image generation failed for user {}: {}", request.user_id(), err);
            if let Some(traceback) = err.traceback() {
                error!(target: "error_log", "Traceback:\n{}", traceback);
            }
            Err(match err {
                PipelineError::OutOfMemory { .. } => JobError::OutOfMemory(format!("Image generation failed: {}", err)),
                _ => JobError::Model(format!("Image generation failed: {}", err)),
            })
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(target: "error_log", "Image generation panicked for user {}: {}", request.user_id(), message);
            Err(JobError::Model(format!("Image generation failed: {}", message)))
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
