use actix_web::{get, post, web, HttpResponse, Responder};
use rand::Rng;
use serde_json::Value;

use crate::apis::schemas::{JobRequest, ReadyResponse};
use crate::cores::jobs::spawn_job;
use crate::cores::schemas::{JobError, ResponsePayload};
use crate::cores::validator::{ValidationError, ValidationKind};
use crate::cores::worker::Worker;
use crate::utils::log::log_job;

// Configure the actix_web service routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
       .service(ready)
       .service(run);
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, body = String))
)]
#[get("/health")]
pub async fn health() -> impl Responder {
    "OK"
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, body = ReadyResponse),
        (status = 503, body = ReadyResponse),
    )
)]
#[get("/ready")]
pub async fn ready(worker: web::Data<Worker>) -> impl Responder {
    match worker.state() {
        Some(state) if state.is_ready() => HttpResponse::Ok().json(ReadyResponse { ready: true, error: None }),
        Some(state) => HttpResponse::ServiceUnavailable().json(ReadyResponse {
            ready: false,
            error: state.error().map(str::to_string),
        }),
        None => HttpResponse::ServiceUnavailable().json(ReadyResponse { ready: false, error: None }),
    }
}

#[utoipa::path(
    post,
    path = "/run",
    request_body = JobRequest,
    responses(
        (status = 200, body = ResponsePayload),
        (status = 400, body = ResponsePayload),
        (status = 500, body = ResponsePayload),
        (status = 503, body = ResponsePayload),
        (status = 507, body = ResponsePayload),
    )
)]
// Handle one job from the serverless host. The body is read raw so a
// malformed envelope still gets a structured payload.
#[post("/run")]
pub async fn run(body: web::Bytes, worker: web::Data<Worker>) -> impl Responder {
    // 1. Parse the envelope
    let job = match parse_job(&body) {
        Ok(job) => job,
        Err(err) => {
            let payload = ResponsePayload::from(&err);
            log_job("-", "-", &payload, std::time::Duration::ZERO);
            return HttpResponse::build(err.status_code()).json(payload);
        }
    };
    let job_id = job.id.unwrap_or_else(new_job_id);

    // 2. Run it to a single payload, detached from this request
    let (payload, status) = spawn_job(worker.into_inner(), job_id, job.input).await;
    HttpResponse::build(status).json(payload)
}

pub(crate) fn parse_job(body: &[u8]) -> Result<JobRequest, JobError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::new(ValidationKind::MissingField, "Invalid request: job body is empty").into());
    }
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        JobError::from(ValidationError::new(ValidationKind::InvalidType, format!("Invalid request: body is not valid JSON: {}", err)))
    })?;
    match value {
        Value::Object(mut envelope) => {
            let id = envelope.get("id").and_then(Value::as_str).map(str::to_string);
            let input = envelope.remove("input").unwrap_or(Value::Null);
            Ok(JobRequest { id, input })
        }
        _ => Err(ValidationError::new(ValidationKind::InvalidType, "Invalid request: job must be a JSON object").into()),
    }
}

fn new_job_id() -> String {
    format!("job-{:016x}", rand::thread_rng().gen::<u64>())
}
