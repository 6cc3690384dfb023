use crate::error::{Result, SheenError};
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheenConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

/// Upstream chat-completion settings. Only the relay reads these; clients never
/// send model, temperature or token caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_chat_max_tokens")]
    pub chat_max_tokens: u32,
    #[serde(default = "default_routine_max_tokens")]
    pub routine_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            api_key: None,
            base_url: None,
            env_var: None,
            temperature: default_temperature(),
            chat_max_tokens: default_chat_max_tokens(),
            routine_max_tokens: default_routine_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_port")]
    pub port: u16,
    #[serde(default = "default_relay_host")]
    pub host: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_relay_port(),
            host: default_relay_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    /// Directory holding the durable key-value snapshot. Defaults to `~/.local/share/sheen`.
    #[serde(default)]
    pub data_dir: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            catalog_path: default_catalog_path(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Resolve the data directory: explicit config value, else the platform data dir.
    pub fn resolved_data_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.data_dir {
            if !dir.is_empty() {
                return PathBuf::from(dir);
            }
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheen")
    }
}

// -- Defaults --

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_chat_max_tokens() -> u32 {
    500
}
fn default_routine_max_tokens() -> u32 {
    1000
}
fn default_relay_port() -> u16 {
    8888
}
fn default_relay_host() -> String {
    "127.0.0.1".to_string()
}
fn default_relay_url() -> String {
    "http://127.0.0.1:8888".to_string()
}
fn default_catalog_path() -> String {
    "products.json".to_string()
}

impl SheenConfig {
    /// Load configuration with three-layer TOML merge:
    /// 1. ~/.config/sheen/config.toml (global)
    /// 2. .sheen/config.toml (project)
    /// 3. .sheen/config.local.toml (local, gitignored)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        if let Some(dir) = project_dir {
            let project_config = dir.join(".sheen").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            let local_config = dir.join(".sheen").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        let config = builder
            .build()
            .map_err(|e| SheenError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| SheenError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            llm: LlmConfig::default(),
            relay: RelayConfig::default(),
            client: ClientConfig::default(),
        }
    }

    /// Clamp out-of-range values and log a warning for each fix.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            warnings.push(format!(
                "llm.temperature = {} out of range [0.0, 2.0], clamping",
                self.llm.temperature
            ));
            self.llm.temperature = self.llm.temperature.clamp(0.0, 2.0);
        }

        if self.llm.chat_max_tokens == 0 {
            warnings.push(format!(
                "llm.chat_max_tokens = 0, setting to {}",
                default_chat_max_tokens()
            ));
            self.llm.chat_max_tokens = default_chat_max_tokens();
        }
        if self.llm.routine_max_tokens == 0 {
            warnings.push(format!(
                "llm.routine_max_tokens = 0, setting to {}",
                default_routine_max_tokens()
            ));
            self.llm.routine_max_tokens = default_routine_max_tokens();
        }

        if self.llm.model.trim().is_empty() {
            warnings.push(format!(
                "llm.model is empty, setting to {}",
                default_llm_model()
            ));
            self.llm.model = default_llm_model();
        }

        if !self.client.relay_url.starts_with("http://")
            && !self.client.relay_url.starts_with("https://")
        {
            warnings.push(format!(
                "client.relay_url '{}' has no http(s) scheme",
                self.client.relay_url
            ));
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sheen").join("config.toml"))
}

/// Resolve the upstream credential: config field first, then a custom env var,
/// then the default env var. `None` means the relay is not configured.
pub fn resolve_api_key(config: &LlmConfig, default_env_var: &str) -> Option<String> {
    if let Some(ref key) = config.api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }

    let env_var_name = config.env_var.as_deref().unwrap_or(default_env_var);
    std::env::var(env_var_name).ok().filter(|k| !k.is_empty())
}
