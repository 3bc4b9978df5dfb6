//! Configuration structures and loading.
//!
//! Values come from the TOML config file first, then environment variables
//! override them. [`Config::validate`] must pass before any pipeline work
//! starts; a missing required value is a startup failure.

use crate::error::{ConfigError, ConfigResult};
use crate::paths::AppPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_QUEUE: &str = "QUEUE";
pub const ENV_BUCKET: &str = "BUCKET";
pub const ENV_PREFIX_INCOMING: &str = "PREFIX_INCOMING";
pub const ENV_PREFIX_PROCESSED: &str = "PREFIX_PROCESSED";
pub const ENV_EXTRACT_TEXT_WORKFLOW: &str = "EXTRACT_TEXT_STATE_MACHINE_ARN";
pub const ENV_TRANSCRIBE_MEDIA_WORKFLOW: &str = "TRANSCRIBE_MEDIA_STATE_MACHINE_ARN";
pub const ENV_KNOWLEDGE_BASE_ID: &str = "STRANDS_KNOWLEDGE_BASE_ID";
pub const ENV_BYPASS_TOOL_CONSENT: &str = "BYPASS_TOOL_CONSENT";
pub const ENV_KNOWLEDGE_BASE_ENDPOINT: &str = "KNOWLEDGE_BASE_ENDPOINT";
pub const ENV_STORAGE_ROOT: &str = "MEDIAFLOW_STORAGE_ROOT";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub workflows: WorkflowsConfig,

    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

impl Config {
    /// Load configuration from the default location, then apply the environment.
    pub fn load() -> ConfigResult<Self> {
        let paths = AppPaths::new().ok_or(ConfigError::NoConfigDir)?;
        let mut config = Self::load_from(&paths.config_file)?;
        config.apply_env();
        Ok(config)
    }

    /// Load, apply the environment, and validate. Used at process start.
    pub fn load_validated() -> ConfigResult<Self> {
        let config = Self::load()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override values from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Override values using the given variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var(ENV_QUEUE) {
            self.queue.name = v;
        }
        if let Some(v) = var(ENV_BUCKET) {
            self.storage.bucket = v;
        }
        if let Some(v) = var(ENV_PREFIX_INCOMING) {
            self.storage.incoming_prefix = v;
        }
        if let Some(v) = var(ENV_PREFIX_PROCESSED) {
            self.storage.processed_prefix = v;
        }
        if let Some(v) = var(ENV_STORAGE_ROOT) {
            self.storage.root = Some(v);
        }
        if let Some(v) = var(ENV_EXTRACT_TEXT_WORKFLOW) {
            self.workflows.extract_text = v;
        }
        if let Some(v) = var(ENV_TRANSCRIBE_MEDIA_WORKFLOW) {
            self.workflows.transcribe_media = v;
        }
        if let Some(v) = var(ENV_KNOWLEDGE_BASE_ID) {
            self.knowledge_base.id = v;
        }
        if let Some(v) = var(ENV_KNOWLEDGE_BASE_ENDPOINT) {
            self.knowledge_base.endpoint = Some(v);
        }
        if let Some(v) = var(ENV_BYPASS_TOOL_CONSENT) {
            match parse_flag(&v) {
                Some(flag) => self.knowledge_base.bypass_tool_consent = flag,
                None => debug!("Ignoring unrecognized {} value: {}", ENV_BYPASS_TOOL_CONSENT, v),
            }
        }
    }

    /// Check that every required value is present and consistent.
    pub fn validate(&self) -> ConfigResult<()> {
        require(&self.queue.name, ENV_QUEUE)?;
        require(&self.storage.bucket, ENV_BUCKET)?;
        require(&self.storage.incoming_prefix, ENV_PREFIX_INCOMING)?;
        require(&self.storage.processed_prefix, ENV_PREFIX_PROCESSED)?;
        require(&self.workflows.extract_text, ENV_EXTRACT_TEXT_WORKFLOW)?;
        require(&self.workflows.transcribe_media, ENV_TRANSCRIBE_MEDIA_WORKFLOW)?;
        require(&self.knowledge_base.id, ENV_KNOWLEDGE_BASE_ID)?;

        if self.storage.incoming_prefix == self.storage.processed_prefix {
            return Err(ConfigError::Invalid(format!(
                "incoming and processed prefixes must differ (both are `{}`)",
                self.storage.processed_prefix
            )));
        }
        if self.storage.incoming_prefix.starts_with(&self.storage.processed_prefix) {
            return Err(ConfigError::Invalid(format!(
                "incoming prefix `{}` lies under the processed prefix `{}`",
                self.storage.incoming_prefix, self.storage.processed_prefix
            )));
        }
        if self.dispatch.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "dispatch.batch_size",
                value: "0".to_string(),
            });
        }
        if self.dispatch.visibility_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                name: "dispatch.visibility_timeout_seconds",
                value: "0".to_string(),
            });
        }
        if let Some(endpoint) = &self.knowledge_base.endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    name: "knowledge_base.endpoint",
                    value: endpoint.clone(),
                });
            }
        }

        Ok(())
    }

    /// Root directory of the filesystem object store.
    pub fn storage_root(&self, paths: &AppPaths) -> PathBuf {
        match &self.storage.root {
            Some(root) => PathBuf::from(shellexpand::tilde(root).as_ref()),
            None => paths.objects_dir.clone(),
        }
    }

    /// Generate a default config file with helpful comments.
    pub fn default_config_string() -> String {
        r#"# Mediaflow Configuration
# Every value below can be overridden by the environment variable named next to it.

[queue]
# Queue that carries routing messages (QUEUE)
name = "media-processing"

[storage]
# Root directory holding one directory per bucket (MEDIAFLOW_STORAGE_ROOT)
# root = "~/.local/share/mediaflow/objects"

# Bucket receiving uploads (BUCKET)
bucket = "media"

# Where uploads land (PREFIX_INCOMING)
incoming_prefix = "uploads/"

# Where relocated objects are copied (PREFIX_PROCESSED)
processed_prefix = "processed/"

[workflows]
# Document text extraction workflow (EXTRACT_TEXT_STATE_MACHINE_ARN)
extract_text = "extract-text"

# Media transcription workflow (TRANSCRIBE_MEDIA_STATE_MACHINE_ARN)
transcribe_media = "transcribe-media"

[knowledge_base]
# Target knowledge base (STRANDS_KNOWLEDGE_BASE_ID)
id = "local"

# Consent/bypass flag passed with every store call (BYPASS_TOOL_CONSENT)
bypass_tool_consent = true

region = "us-east-1"

# HTTP endpoint of a remote knowledge base (KNOWLEDGE_BASE_ENDPOINT).
# When unset, records are kept in the local database.
# endpoint = "http://localhost:8080"

timeout_seconds = 30

[dispatch]
# Messages taken from the queue per batch
batch_size = 10

# Store .md/.csv content directly instead of running text extraction
direct_store = true

# Bytes of directly stored content shown in logs
preview_bytes = 4096

# Messages left processing longer than this are handed out again
visibility_timeout_seconds = 300

[watch]
ignore_patterns = [
    "*.tmp",
    "*.part",
    ".DS_Store",
]

poll_interval_seconds = 2
"#
        .to_string()
    }

    /// Create a default config file with comments.
    pub fn create_default_file(path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, Self::default_config_string())?;
        Ok(())
    }
}

fn require(value: &str, name: &'static str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::Missing(name))
    } else {
        Ok(())
    }
}

/// Parse a boolean flag the way deployment environments spell it.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Queue settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub name: String,
}

/// Object storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: Option<String>,
    pub bucket: String,
    pub incoming_prefix: String,
    pub processed_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: None,
            bucket: String::new(),
            incoming_prefix: "uploads/".to_string(),
            processed_prefix: "processed/".to_string(),
        }
    }
}

/// Workflow identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    pub extract_text: String,
    pub transcribe_media: String,
}

/// Knowledge base settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub id: String,
    pub bypass_tool_consent: bool,
    pub region: String,
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            bypass_tool_consent: true,
            region: "us-east-1".to_string(),
            endpoint: None,
            timeout_seconds: 30,
        }
    }
}

/// Queue consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub batch_size: usize,
    pub direct_store: bool,
    pub preview_bytes: usize,
    /// Seconds a claimed message may stay processing before it is redelivered.
    pub visibility_timeout_seconds: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            direct_store: true,
            preview_bytes: 4096,
            visibility_timeout_seconds: 300,
        }
    }
}

/// Upload watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub ignore_patterns: Vec<String>,
    pub poll_interval_seconds: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                "*.tmp".to_string(),
                "*.part".to_string(),
                ".DS_Store".to_string(),
            ],
            poll_interval_seconds: 2,
        }
    }
}
