use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("device query failed: {0}")]
    Query(String),
    #[error("cache release failed: {0}")]
    Release(String),
}

// Snapshot of the accelerator as reported by its owner
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub available: bool,
    pub name: String,
    pub total_memory: u64,   // bytes
    pub free_memory: u64,    // bytes
}

impl DeviceStatus {
    pub fn free_memory_mb(&self) -> u64 {
        self.free_memory / (1024 * 1024)
    }

    pub fn total_memory_mb(&self) -> u64 {
        self.total_memory / (1024 * 1024)
    }
}

#[async_trait]
pub trait Accelerator: Send + Sync {
    async fn probe(&self) -> Result<DeviceStatus, DeviceError>;
    // Release memory held by the allocator cache after a generation.
    async fn empty_cache(&self) -> Result<(), DeviceError>;
}
