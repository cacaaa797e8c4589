use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ------------------------------------------ Job envelope ------------------------------------------
// What the serverless host posts for every job.
#[derive(Deserialize, Serialize, Debug, ToSchema)]
pub struct JobRequest {
    pub id: Option<String>,
    #[schema(value_type = Object)]
    #[serde(default)]
    pub input: Value,   // untyped; checked by the validator
}

// ------------------------------------------ Readiness ------------------------------------------
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ReadyResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
