use actix_web::http::StatusCode;
use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use crate::cores::generation::{self, panic_message};
use crate::cores::schemas::{JobError, ResponsePayload};
use crate::cores::upload::{self, UploadedImage};
use crate::cores::validator::{sanitize_user_id, validate_request};
use crate::cores::worker::Worker;
use crate::utils::log::log_job;

/// Validate -> initialize -> generate -> upload. Stops at the first failure.
pub async fn process_job(worker: &Worker, input: &Value) -> Result<UploadedImage, JobError> {
    // 1. Validate before touching any collaborator
    let request = validate_request(input)?;

    // 2. One-time setup, or the stored failure
    let pipeline = worker.initialize().await?;

    // 3. Generate, one at a time
    let image = {
        let _guard = worker.generation_lock().lock().await;
        generation::generate(pipeline.as_ref(), worker.accelerator(), &request).await?
    };

    // 4. Upload under the user's namespace
    upload::upload(worker.store(), request.user_id(), &image, worker.signed_url_ttl()).await
}

/// Run a job to its single response. Nothing escapes: a panic becomes an
/// `internal_error` payload.
pub async fn handle_job(worker: &Worker, job_id: &str, input: &Value) -> (ResponsePayload, StatusCode) {
    let started = Instant::now();
    let outcome = AssertUnwindSafe(process_job(worker, input))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(JobError::Internal(format!("Unexpected failure: {}", panic_message(panic.as_ref())))));

    // only a well-formed id goes into the access log
    let user_id = input.get("user_id")
        .and_then(|value| sanitize_user_id(value).ok())
        .unwrap_or_else(|| "-".to_string());
    let (payload, status) = match outcome {
        Ok(uploaded) => (ResponsePayload::success(uploaded.signed_url, started.elapsed()), StatusCode::OK),
        Err(err) => (ResponsePayload::from(&err), err.status_code()),
    };
    log_job(job_id, &user_id, &payload, started.elapsed());
    (payload, status)
}

/// Run a job on its own task and wait for it. Dropping the caller (a client
/// disconnect) no longer cuts the job short: cache release and the generation
/// lock always see the job through.
pub async fn spawn_job(worker: Arc<Worker>, job_id: String, input: Value) -> (ResponsePayload, StatusCode) {
    let task = tokio::spawn(async move { handle_job(&worker, &job_id, &input).await });
    match task.await {
        Ok(done) => done,
        Err(err) => {
            let err = JobError::Internal(format!("Job task failed: {}", err));
            (ResponsePayload::from(&err), err.status_code())
        }
    }
}
