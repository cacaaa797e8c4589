use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::configs::settings::StorageConfig;
use crate::cores::storage::storage_controller::{ObjectStore, StorageError};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest {
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// Supabase Storage bucket reached through its REST API.
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStore {
    pub fn new(config: &StorageConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(SupabaseStore {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("apikey", &self.service_key)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    fn sign_endpoint(&self, path: &str) -> String {
        format!("{}/storage/v1/object/sign/{}/{}", self.base_url, self.bucket, path)
    }
}

// The sign endpoint answers with a path relative to `/storage/v1`.
pub(crate) fn absolute_signed_url(base_url: &str, signed: &str) -> String {
    if signed.starts_with("http://") || signed.starts_with("https://") {
        return signed.to_string();
    }
    let base = base_url.trim_end_matches('/');
    let signed = signed.trim_start_matches('/');
    format!("{}/storage/v1/{}", base, signed)
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn upload(&self, bytes: Bytes, path: &str, content_type: &str) -> Result<(), StorageError> {
        let fail = |message: String| StorageError::Upload { path: path.to_string(), message };

        let response = self.authorized(self.client.post(self.object_url(path)))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|err| fail(format!("Request failed: {}", err)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(fail(format!("API returned {}: {}", status, body)))
        }
    }

    async fn sign_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let fail = |message: String| StorageError::Sign { path: path.to_string(), message };

        let response = self.authorized(self.client.post(self.sign_endpoint(path)))
            .json(&SignRequest { expires_in: ttl.as_secs() })
            .send()
            .await
            .map_err(|err| fail(format!("Request failed: {}", err)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("API returned {}: {}", status, body)));
        }
        let signed: SignResponse = response.json()
            .await
            .map_err(|err| fail(format!("Failed to parse response: {}", err)))?;

        Ok(absolute_signed_url(&self.base_url, &signed.signed_url))
    }
}
