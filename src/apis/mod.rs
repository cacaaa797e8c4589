pub mod api_doc;
pub mod jobs_api;
pub mod schemas;
