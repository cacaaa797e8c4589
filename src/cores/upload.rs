use chrono::Utc;
use log::{error, info};
use rand::Rng;
use std::time::Duration;

use crate::cores::image_models::image_controller::GeneratedImage;
use crate::cores::schemas::JobError;
use crate::cores::storage::storage_controller::ObjectStore;
use crate::cores::validator::sanitize_file_path;

pub const MIN_SIGNED_URL_TTL: Duration = Duration::from_secs(3600);
const GENERATED_DIR: &str = "generated";

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub path: String,
    pub signed_url: String,
    pub expires_in: Duration,
}

/// Object path for a new image, always under `{user_id}/generated/`.
pub fn object_path(user_id: &str) -> Result<String, JobError> {
    let user_id = sanitize_file_path(user_id)
        .ok_or_else(|| JobError::Storage(format!("refusing to build a storage path for user id {:?}", user_id)))?;
    let suffix: u32 = rand::thread_rng().gen();
    let file_name = format!("{}_{:08x}.png", Utc::now().format("%Y%m%d%H%M%S"), suffix);
    // file_name only holds digits, hex and "_.", so it always passes
    let file_name = sanitize_file_path(&file_name)
        .ok_or_else(|| JobError::Storage("generated file name is not a valid path segment".to_string()))?;
    Ok(format!("{}/{}/{}", user_id, GENERATED_DIR, file_name))
}

pub fn effective_ttl(requested: Duration) -> Duration {
    requested.max(MIN_SIGNED_URL_TTL)
}

/// Store the image under the user's namespace and sign a retrieval URL.
pub async fn upload(
    store: &dyn ObjectStore,
    user_id: &str,
    image: &GeneratedImage,
    ttl: Duration,
) -> Result<UploadedImage, JobError> {
    let path = object_path(user_id)?;
    let expires_in = effective_ttl(ttl);

    store.upload(image.bytes.clone(), &path, "image/png").await.map_err(|err| {
        error!(target: "error_log", "Upload failed for user {}: {}", user_id, err);
        JobError::Storage(format!("Failed to upload image: {}", err))
    })?;

    let signed_url = store.sign_url(&path, expires_in).await.map_err(|err| {
        error!(target: "error_log", "Signing failed for user {}: {}", user_id, err);
        JobError::Storage(format!("Failed to create signed URL: {}", err))
    })?;

    info!("Uploaded {} ({} bytes), URL valid for {}s", path, image.bytes.len(), expires_in.as_secs());
    Ok(UploadedImage { path, signed_url, expires_in })
}
