//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::intent::Category;

/// Switchboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub router: RouterConfig,
    pub dispatch: DispatchConfig,
    pub agents: AgentsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Only ever set by a config file that breaks the env-only rule
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub default_model: String,
    pub fallback_models: Vec<String>,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

/// Thresholds and catalog source for the intent router
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// A category is kept only if its score is strictly above this
    pub threshold: f64,
    /// Decisions below this confidence are re-evaluated by the reasoning service
    pub escalation_confidence: f64,
    /// JSON file mapping agent names to example phrases
    pub intentions_path: Option<PathBuf>,
    pub embedder: EmbedderKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Embeddings API of the configured LLM provider
    #[default]
    Remote,
    /// Local feature-hashing embedder, no network access
    Hashing,
}

impl std::str::FromStr for EmbedderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(Self::Remote),
            "hashing" => Ok(Self::Hashing),
            _ => Err(format!("Unknown embedder: {}", s)),
        }
    }
}

/// Polling budget and HTTP timeouts for remote agent calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub max_tool_rounds: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Scheme and host shared by all agents; each category adds its own port
    pub base_url: String,
    /// Full endpoint URLs keyed by agent name, replacing the derived ones
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4.1".to_string(),
            fallback_models: vec!["gpt-4o".to_string()],
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 120,
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            escalation_confidence: 0.7,
            intentions_path: None,
            embedder: EmbedderKind::Remote,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_polls: 30,
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
            max_tool_rounds: 5,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            endpoints: BTreeMap::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("SWITCHBOARD_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

/// Mask all but the last four characters of a secret
fn redact(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        "***".to_string()
    } else {
        let suffix: String = key.chars().skip(count - 4).collect();
        format!("***{}", suffix)
    }
}

impl DispatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AgentsConfig {
    /// Endpoint URL for a category: explicit override, else `base_url:port`
    pub fn endpoint_for(&self, category: Category) -> String {
        match self.endpoints.get(category.as_str()) {
            Some(url) => url.clone(),
            None => format!(
                "{}:{}",
                self.base_url.trim_end_matches('/'),
                category.default_port()
            ),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        for name in self.endpoints.keys() {
            name.parse::<Category>()
                .map_err(|_| anyhow!("Unknown agent in [agents.endpoints]: {}", name))?;
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid server address: {}:{}", self.host, self.port))
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("SWITCHBOARD_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("switchboard")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default path, then apply environment overrides
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// `AGENT_URL` replaces the agents' base URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("AGENT_URL")
            && !url.trim().is_empty()
        {
            self.agents.base_url = url.trim().to_string();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;
        self.agents.validate()?;

        if !(-1.0..=1.0).contains(&self.router.threshold) {
            return Err(anyhow!("router.threshold must be between -1.0 and 1.0"));
        }
        if self.dispatch.max_polls == 0 {
            return Err(anyhow!("dispatch.max_polls must be at least 1"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.default_model" => Ok(self.llm.default_model.clone()),
            "llm.fallback_models" => Ok(self.llm.fallback_models.join(", ")),
            "llm.embedding_model" => Ok(self.llm.embedding_model.clone()),
            "llm.temperature" => Ok(self.llm.temperature.to_string()),
            "llm.max_tokens" => Ok(self.llm.max_tokens.to_string()),
            "llm.timeout_secs" => Ok(self.llm.timeout_secs.to_string()),

            "router.threshold" => Ok(self.router.threshold.to_string()),
            "router.escalation_confidence" => Ok(self.router.escalation_confidence.to_string()),
            "router.intentions_path" => Ok(self
                .router
                .intentions_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in catalog)".to_string())),
            "router.embedder" => Ok(format!("{:?}", self.router.embedder).to_lowercase()),

            "dispatch.poll_interval_ms" => Ok(self.dispatch.poll_interval_ms.to_string()),
            "dispatch.max_polls" => Ok(self.dispatch.max_polls.to_string()),
            "dispatch.connect_timeout_secs" => Ok(self.dispatch.connect_timeout_secs.to_string()),
            "dispatch.request_timeout_secs" => Ok(self.dispatch.request_timeout_secs.to_string()),
            "dispatch.max_tool_rounds" => Ok(self.dispatch.max_tool_rounds.to_string()),

            "agents.base_url" => Ok(self.agents.base_url.clone()),

            "server.host" => Ok(self.server.host.clone()),
            "server.port" => Ok(self.server.port.to_string()),

            // API key (special handling - show redacted)
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use SWITCHBOARD_API_KEY or OPENAI_API_KEY env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `switchboard config show` to see available keys.",
                key
            )),
        }
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.base_url",
            "llm.default_model",
            "llm.fallback_models",
            "llm.embedding_model",
            "llm.temperature",
            "llm.max_tokens",
            "llm.timeout_secs",
            "llm.api_key",
            "router.threshold",
            "router.escalation_confidence",
            "router.intentions_path",
            "router.embedder",
            "dispatch.poll_interval_ms",
            "dispatch.max_polls",
            "dispatch.connect_timeout_secs",
            "dispatch.request_timeout_secs",
            "dispatch.max_tool_rounds",
            "agents.base_url",
            "server.host",
            "server.port",
        ];

        keys.into_iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}
