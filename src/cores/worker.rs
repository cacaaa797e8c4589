use futures::FutureExt;
use log::{error, info};
use std::error::Error;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};

use crate::configs::settings::Config;
use crate::cores::devices::device_controller::Accelerator;
use crate::cores::devices::remote::RemoteDevice;
use crate::cores::generation::panic_message;
use crate::cores::image_models::diffusion::DiffusionLoader;
use crate::cores::image_models::image_controller::{ImagePipeline, PipelineLoader};
use crate::cores::schemas::JobError;
use crate::cores::storage::storage_controller::ObjectStore;
use crate::cores::storage::supabase::SupabaseStore;

// Result of the one-time worker setup, kept for the life of the process.
#[derive(Clone)]
pub enum InitializationState {
    Ready(Arc<dyn ImagePipeline>),
    Failed(String),
}

impl InitializationState {
    pub fn is_ready(&self) -> bool {
        matches!(self, InitializationState::Ready(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            InitializationState::Ready(_) => None,
            InitializationState::Failed(message) => Some(message),
        }
    }
}

impl fmt::Debug for InitializationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationState::Ready(_) => f.write_str("Ready"),
            InitializationState::Failed(message) => f.debug_tuple("Failed").field(message).finish(),
        }
    }
}

/// Process-wide worker: configuration, collaborators and the loaded model.
///
/// Initialization runs at most once; concurrent callers wait for the same
/// run and a failure is never retried. Generations are serialized because the
/// accelerator memory cannot be shared between two of them.
pub struct Worker {
    config: Config,
    loader: Box<dyn PipelineLoader>,
    accelerator: Arc<dyn Accelerator>,
    store: Arc<dyn ObjectStore>,
    state: OnceCell<InitializationState>,
    generation_lock: Mutex<()>,
}

impl Worker {
    pub fn new(
        config: Config,
        loader: Box<dyn PipelineLoader>,
        accelerator: Arc<dyn Accelerator>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Worker {
            config,
            loader,
            accelerator,
            store,
            state: OnceCell::new(),
            generation_lock: Mutex::new(()),
        }
    }

    // Worker wired to the inference sidecar and Supabase Storage
    pub fn from_config(config: &Config) -> Result<Self, Box<dyn Error>> {
        let loader = DiffusionLoader::new(&config.inference)?;
        let device = RemoteDevice::new(&config.inference)?;
        let store = SupabaseStore::new(&config.storage)?;
        Ok(Worker::new(config.clone(), Box::new(loader), Arc::new(device), Arc::new(store)))
    }

    pub fn accelerator(&self) -> &dyn Accelerator {
        self.accelerator.as_ref()
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn generation_lock(&self) -> &Mutex<()> {
        &self.generation_lock
    }

    pub fn signed_url_ttl(&self) -> Duration {
        Duration::from_secs(self.config.storage.signed_url_ttl)
    }

    /// `None` until the first initialization attempt has finished.
    pub fn state(&self) -> Option<&InitializationState> {
        self.state.get()
    }

    /// Initialize on first use and hand out the model handle.
    pub async fn initialize(&self) -> Result<Arc<dyn ImagePipeline>, JobError> {
        let state = self.state.get_or_init(|| self.run_initialization()).await;
        match state {
            InitializationState::Ready(pipeline) => Ok(pipeline.clone()),
            InitializationState::Failed(message) => Err(JobError::Initialization(message.clone())),
        }
    }

    async fn run_initialization(&self) -> InitializationState {
        let outcome = AssertUnwindSafe(self.initialize_steps()).catch_unwind().await;
        let state = match outcome {
            Ok(Ok(pipeline)) => InitializationState::Ready(pipeline),
            Ok(Err(message)) => InitializationState::Failed(message),
            Err(panic) => InitializationState::Failed(format!("Worker initialization panicked: {}", panic_message(panic.as_ref()))),
        };
        match &state {
            InitializationState::Ready(_) => info!("Worker initialized, model {} is ready", self.config.inference.model_name),
            InitializationState::Failed(message) => error!(target: "error_log", "Worker initialization failed: {}", message),
        }
        state
    }

    async fn initialize_steps(&self) -> Result<Arc<dyn ImagePipeline>, String> {
        // 1. Required configuration
        let missing = self.config.missing_values();
        if !missing.is_empty() {
            return Err(format!("Missing required configuration: {}", missing.join(", ")));
        }

        // 2. Accelerator
        let device = self.accelerator.probe()
            .await
            .map_err(|err| format!("Could not query the accelerator: {}", err))?;
        if !device.available {
            return Err("No accelerator available: CUDA device not found, the model cannot be loaded".to_string());
        }
        info!("Accelerator {}: {} MB free of {} MB", device.name, device.free_memory_mb(), device.total_memory_mb());

        // 3. Memory
        let required = self.config.inference.min_free_memory_mb;
        if device.free_memory_mb() < required {
            return Err(format!(
                "Insufficient accelerator memory: {} MB free, {} MB required to load the model",
                device.free_memory_mb(),
                required
            ));
        }

        // 4. Model
        let pipeline = self.loader.load()
            .await
            .map_err(|err| format!("Model loading failed: {}", err))?;

        if let Ok(after) = self.accelerator.probe().await {
            info!("Model loaded, accelerator memory: {} MB free of {} MB", after.free_memory_mb(), after.total_memory_mb());
        }
        Ok(pipeline)
    }
}
