use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::configs::settings::InferenceConfig;
use crate::cores::devices::device_controller::{Accelerator, DeviceError, DeviceStatus};

// Probes are small; do not wait on them for as long as a generation.
const DEVICE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct DeviceResponse {
    available: bool,
    #[serde(default)]
    name: String,
    #[serde(default)]
    total_memory: u64,
    #[serde(default)]
    free_memory: u64,
}

/// The GPU owned by the inference sidecar.
pub struct RemoteDevice {
    client: Client,
    base_url: String,
}

impl RemoteDevice {
    pub fn new(config: &InferenceConfig) -> Result<Self, DeviceError> {
        let client = Client::builder()
            .timeout(DEVICE_TIMEOUT)
            .build()
            .map_err(|err| DeviceError::Query(format!("Failed to build http client: {}", err)))?;
        Ok(RemoteDevice {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Accelerator for RemoteDevice {
    async fn probe(&self) -> Result<DeviceStatus, DeviceError> {
        let url = format!("{}/v1/device", self.base_url);
        let response = self.client.get(url)
            .send()
            .await
            .map_err(|err| DeviceError::Query(format!("Request failed: {}", err)))?;
        if !response.status().is_success() {
            return Err(DeviceError::Query(format!("API returned non-success status: {}", response.status())));
        }
        let device: DeviceResponse = response.json()
            .await
            .map_err(|err| DeviceError::Query(format!("Failed to parse response: {}", err)))?;

        Ok(DeviceStatus {
            available: device.available,
            name: device.name,
            total_memory: device.total_memory,
            free_memory: device.free_memory,
        })
    }

    async fn empty_cache(&self) -> Result<(), DeviceError> {
        let url = format!("{}/v1/device/empty_cache", self.base_url);
        let response = self.client.post(url)
            .send()
            .await
            .map_err(|err| DeviceError::Release(format!("Request failed: {}", err)))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeviceError::Release(format!("API returned non-success status: {}", response.status())))
        }
    }
}
