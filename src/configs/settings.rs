use serde::Deserialize;
use std::env;
use std::fs::{File, metadata};
use std::io::Read;
use once_cell::sync::Lazy;
use serde_yaml;

// ---------------------------------------------- Collaborators ----------------------------------------------
// Supabase Storage
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub url: String,
    pub service_key: String,
    pub bucket: String,
    pub signed_url_ttl: u64,   // seconds, never below one hour
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            url: "".to_string(),
            service_key: "".to_string(),
            bucket: "user_uploads".to_string(),
            signed_url_ttl: 3600,
            timeout_secs: 60,
        }
    }
}

// Inference sidecar that owns the GPU and the model
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    pub url: String,
    pub model_name: String,
    pub min_free_memory_mb: u64,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        InferenceConfig {
            url: "http://127.0.0.1:8000".to_string(),
            model_name: "black-forest-labs/FLUX.1-schnell".to_string(),
            min_free_memory_mb: 12288,
            timeout_secs: 600,
        }
    }
}

// ---------------------------------------------- Config ----------------------------------------------
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub workers: usize,
    pub eager_init: bool,
    pub log_config: String,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            workers: 1,
            eager_init: true,
            log_config: "src/configs/log4rs.yaml".to_string(),
            storage: StorageConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl Config {
    pub fn load_config() -> Config {
        let config_path = if metadata("/etc/headshot-worker/configs.yaml").is_ok() {
            "/etc/headshot-worker/configs.yaml"
        } else {
            "src/configs/configs.yaml"
        };
        let mut config = match Self::read_file(config_path) {
            Ok(config) => config,
            Err(err) => {
                // log4rs may not be up yet
                eprintln!("Failed to load {}: {}, using defaults", config_path, err);
                Config::default()
            }
        };
        dotenv::dotenv().ok();
        config.apply_env(|key| env::var(key).ok());
        config
    }

    pub fn from_yaml(contents: &str) -> Result<Config, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    fn read_file(path: &str) -> Result<Config, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(Self::from_yaml(&contents)?)
    }

    // Environment values win over the file. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("SUPABASE_URL") {
            self.storage.url = url;
        }
        if let Some(key) = get("SUPABASE_SERVICE_KEY") {
            self.storage.service_key = key;
        }
        if let Some(bucket) = get("SUPABASE_BUCKET_USER_UPLOADS") {
            self.storage.bucket = bucket;
        }
        if let Some(url) = get("INFERENCE_URL") {
            self.inference.url = url;
        }
        if let Some(model) = get("MODEL_NAME") {
            self.inference.model_name = model;
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
    }

    // Names of required values that are still empty, in check order.
    pub fn missing_values(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.storage.url.trim().is_empty() {
            missing.push("SUPABASE_URL");
        }
        if self.storage.service_key.trim().is_empty() {
            missing.push("SUPABASE_SERVICE_KEY");
        }
        if self.storage.bucket.trim().is_empty() {
            missing.push("SUPABASE_BUCKET_USER_UPLOADS");
        }
        if self.inference.url.trim().is_empty() {
            missing.push("INFERENCE_URL");
        }
        missing
    }
}

// Process-wide configuration
pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(|| Config::load_config());
