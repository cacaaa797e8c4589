use chrono::Local;
use log::{info, warn};
use std::time::Duration;

use crate::cores::schemas::ResponsePayload;

// One access line per job:
// [time] job=<id> user=<id> outcome=<success|error_type> elapsed=<secs>
pub fn format_job_line(job_id: &str, user_id: &str, payload: &ResponsePayload, elapsed: Duration) -> String {
    let outcome = payload.error_type().unwrap_or("success");
    format!(
        "[{time}] job={job_id} user={user_id} outcome={outcome} elapsed={elapsed:.3}s",
        time = Local::now().format("%d/%b/%Y:%H:%M:%S %z"),
        job_id = job_id,
        user_id = user_id,
        outcome = outcome,
        elapsed = elapsed.as_secs_f64(),
    )
}

// Function for access log and error log
pub fn log_job(job_id: &str, user_id: &str, payload: &ResponsePayload, elapsed: Duration) {
    let line = format_job_line(job_id, user_id, payload, elapsed);
    match payload {
        ResponsePayload::Success { .. } => info!(target: "access_log", "{}", line),
        ResponsePayload::Error { error, .. } => {
            info!(target: "access_log", "{}", line);
            warn!(target: "error_log", "{} \"{}\"", line, error);
        }
    }
}
