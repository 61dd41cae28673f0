use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::validation::{UploadLimits, MAX_FILES_PER_BATCH, MAX_FILE_SIZE};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Built front-end served for unmatched paths
    #[serde(default)]
    pub static_dir: Option<String>,
}

/// Which image store to open at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown store backend {:?}", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "data/galleria.db".to_string()
}

fn default_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

fn default_max_files() -> usize {
    MAX_FILES_PER_BATCH
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_db_path(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_files: default_max_files(),
        }
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ai_base_url(),
            chat_model: default_chat_model(),
            image_model: default_image_model(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl UploadConfig {
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_size: self.max_file_size,
            max_files: self.max_files,
        }
    }

    /// Request body ceiling: a full batch of maximum size files plus multipart framing
    pub fn body_limit(&self) -> usize {
        (self.max_file_size as usize) * self.max_files + 1024 * 1024
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides();
        config.ensure_directories()?;
        tracing::info!(
            "Store backend: {:?}, assistant upstream: {}",
            config.database.backend,
            if config.assistant.api_key.is_some() { "configured" } else { "fallback only" }
        );
        Ok(config)
    }

    /// Load configuration from galleria.toml or config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = [
            "galleria.toml",
            "config.toml",
            "data/galleria.toml",
            "data/config.toml",
        ];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config = Self::from_toml(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides
    /// Format: GL_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(val) = lookup("GL_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("GL_CONF_SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = lookup("GL_CONF_SERVER_STATIC_DIR") {
            if !val.trim().is_empty() {
                self.server.static_dir = Some(val);
            }
        }

        // Database overrides
        if let Some(val) = lookup("GL_CONF_DATABASE_BACKEND") {
            match val.parse::<StoreBackend>() {
                Ok(backend) => self.database.backend = backend,
                Err(e) => tracing::warn!("Ignoring GL_CONF_DATABASE_BACKEND: {}", e),
            }
        }
        if let Some(val) = lookup("GL_CONF_DATABASE_PATH") {
            self.database.path = val;
        }

        // Upload overrides
        if let Some(val) = lookup("GL_CONF_UPLOAD_MAX_FILE_SIZE") {
            if let Ok(size) = val.parse() {
                self.upload.max_file_size = size;
            }
        }
        if let Some(val) = lookup("GL_CONF_UPLOAD_MAX_FILES") {
            if let Ok(count) = val.parse() {
                self.upload.max_files = count;
            }
        }

        // Assistant overrides
        let api_key = lookup("GL_CONF_ASSISTANT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        if let Some(val) = api_key {
            if !val.trim().is_empty() {
                self.assistant.api_key = Some(val);
            }
        }
        if let Some(val) = lookup("GL_CONF_ASSISTANT_BASE_URL") {
            if !val.trim().is_empty() {
                self.assistant.base_url = val;
            }
        }
        if let Some(val) = lookup("GL_CONF_ASSISTANT_CHAT_MODEL") {
            if !val.trim().is_empty() {
                self.assistant.chat_model = val;
            }
        }
        if let Some(val) = lookup("GL_CONF_ASSISTANT_IMAGE_MODEL") {
            if !val.trim().is_empty() {
                self.assistant.image_model = val;
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if self.database.backend == StoreBackend::Sqlite {
            if let Some(parent) = Path::new(&self.database.path).parent() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
