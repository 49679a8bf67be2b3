use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{HandrailError, HandrailResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Overridden by the `PORT` environment variable when set.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn resolve_port(&self) -> u16 {
        std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding guidance records. Empty means the platform data dir.
    #[serde(default)]
    pub data_dir: String,
    /// Record used when a request names no `instructions_file`.
    #[serde(default = "default_record")]
    pub default_record: String,
}

impl StorageConfig {
    /// `~/.local/share/handrail` (or the platform equivalent) unless overridden,
    /// falling back to the current working directory.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if !self.data_dir.is_empty() {
            return PathBuf::from(&self.data_dir);
        }
        dirs::data_dir()
            .map(|d| d.join("handrail"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
            default_record: default_record(),
        }
    }
}

fn default_record() -> String {
    "guidance.json".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Optional API key stored in config.toml (falls back to env var HANDRAIL_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub roles: RolesConfig,
}

impl ReasoningConfig {
    /// API keys in the environment win over config.toml.
    pub fn resolve_api_key(&self) -> String {
        std::env::var("HANDRAIL_API_KEY")
            .unwrap_or_else(|_| self.api_key.clone().unwrap_or_default())
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            roles: RolesConfig::default(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.dedaluslabs.ai/v1/runner/run".to_string()
}

/// Maps pipeline roles to model lists and per-call step limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    /// Produces a fresh numbered instruction block from a page snapshot.
    #[serde(default = "default_instruct_role")]
    pub instruct: RoleEntry,
    /// Maps one instruction step onto one annotated element.
    #[serde(default = "default_select_role")]
    pub select: RoleEntry,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            instruct: default_instruct_role(),
            select: default_select_role(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntry {
    /// Model identifiers sent to the backend, in preference order.
    pub models: Vec<String>,
    /// Tool servers the backend may consult for this role.
    #[serde(default)]
    pub tool_servers: Vec<String>,
    /// Upper bound on backend reasoning steps per invocation.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_instruct_role() -> RoleEntry {
    RoleEntry {
        models: vec!["openai/gpt-4.1-mini".to_string()],
        tool_servers: vec!["windsor/brave-search-mcp".to_string()],
        max_steps: 5,
    }
}

fn default_select_role() -> RoleEntry {
    RoleEntry {
        models: vec!["openai/gpt-4o-mini".to_string()],
        tool_servers: Vec::new(),
        max_steps: 1,
    }
}

fn default_max_steps() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_api_base")]
    pub api_base: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_base: default_transcription_api_base(),
            model: default_transcription_model(),
        }
    }
}

fn default_transcription_api_base() -> String {
    "https://api.openai.com/v1/audio/transcriptions".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn resolve_config_path() -> HandrailResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(HandrailError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> HandrailResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), api_base = %config.reasoning.api_base, "config loaded");
    Ok(config)
}
