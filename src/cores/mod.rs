pub mod devices;
pub mod generation;
pub mod image_models;
pub mod jobs;
pub mod schemas;
pub mod storage;
pub mod upload;
pub mod validator;
pub mod worker;
