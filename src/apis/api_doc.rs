use utoipa::OpenApi;

use crate::apis::jobs_api;
use crate::apis::schemas::{JobRequest, ReadyResponse};
use crate::cores::schemas::ResponsePayload;


#[derive(OpenApi)]
#[openapi(
    paths(
        jobs_api::run::health,
        jobs_api::run::ready,
        jobs_api::run::run,
    ),
    components(
        schemas(JobRequest, ReadyResponse, ResponsePayload)
    )
)]

pub struct ApiDoc;
