use crate::error::{Error, Result};
use crate::http::DEFAULT_USER_AGENT;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Unset means requests never time out.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl LoaderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Takes precedence over `api_key_env` when set.
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            api_key_env: default_api_key_env(),
            api_key: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Local backend settings. `--server` takes precedence over `base_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_chain_type")]
    pub chain_type: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_type: default_chain_type(),
        }
    }
}

// Defaults
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_ollama_base_url() -> String {
    "http://localhost:11434".into()
}
fn default_chain_type() -> String {
    "stuff".into()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// A missing file means built-in defaults; a present but broken file is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides.
    ///
    /// - `OPENAI_BASE_URL`: OpenAI-compatible API endpoint
    /// - `OLLAMA_HOST`: default local endpoint (still overridden by `--server`)
    pub fn with_env_overrides(self) -> Self {
        self.apply_overrides(
            std::env::var("OPENAI_BASE_URL").ok(),
            std::env::var("OLLAMA_HOST").ok(),
        )
    }

    /// Empty values are treated as unset.
    fn apply_overrides(
        mut self,
        openai_base_url: Option<String>,
        ollama_host: Option<String>,
    ) -> Self {
        if let Some(url) = openai_base_url.filter(|u| !u.is_empty()) {
            self.openai.base_url = url;
        }
        if let Some(host) = ollama_host.filter(|h| !h.is_empty()) {
            self.ollama.base_url = normalize_host(&host);
        }
        self
    }
}

/// `OLLAMA_HOST` is often given as a bare `host:port`.
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let toml = r#"
[loader]
user_agent = "TestAgent/2.0"
timeout_secs = 30

[openai]
base_url = "https://proxy.internal/v1"
api_key_env = "MY_OPENAI_KEY"
temperature = 0.2
max_tokens = 512

[ollama]
base_url = "http://gpu-box:11434"
max_tokens = 256

[chain]
chain_type = "stuff"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.loader.user_agent, "TestAgent/2.0");
        assert_eq!(config.loader.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.openai.base_url, "https://proxy.internal/v1");
        assert_eq!(config.openai.api_key_env, "MY_OPENAI_KEY");
        assert_eq!(config.openai.max_tokens, Some(512));
        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
        assert!(config.ollama.temperature.is_none());
        assert_eq!(config.chain.chain_type, "stuff");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.loader.user_agent, "WebAISum/1.0");
        assert!(config.loader.timeout().is_none());
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.chain.chain_type, "stuff");
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: Config = toml::from_str("[ollama]\ntemperature = 0.5\n").unwrap();
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.ollama.temperature, Some(0.5));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load_or_default(Path::new("does/not/exist/webaisum.toml")).unwrap();
        assert_eq!(config.loader.user_agent, "WebAISum/1.0");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("webaisum-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "[loader\nuser_agent = 1").unwrap();
        let err = Config::load_or_default(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, Error::Config(_)), "got {err:?}");
    }

    #[test]
    fn overrides_replace_endpoints() {
        let config = Config::default().apply_overrides(
            Some("https://proxy.internal/v1".into()),
            Some("gpu-box:11434".into()),
        );
        assert_eq!(config.openai.base_url, "https://proxy.internal/v1");
        assert_eq!(config.ollama.base_url, "http://gpu-box:11434");
    }

    #[test]
    fn empty_or_missing_overrides_are_ignored() {
        let config = Config::default().apply_overrides(Some(String::new()), Some(String::new()));
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");

        let config = Config::default().apply_overrides(None, None);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.ollama.base_url, "http://localhost:11434");
    }

    #[test]
    fn server_flag_beats_ollama_host_override() {
        use crate::http::{DEFAULT_USER_AGENT, HttpClient};
        use crate::llm::{BackendConfig, LlmClient};

        let config = Config::default().apply_overrides(None, Some("gpu-box:11434".into()));
        let http = HttpClient::new(DEFAULT_USER_AGENT, None).unwrap();

        let with_server = BackendConfig::Local {
            model: "llama3".into(),
            base_url: Some("http://cli-host:8080".into()),
        };
        let client = LlmClient::from_config(&with_server, &config, http.clone()).unwrap();
        assert_eq!(client.base_url(), "http://cli-host:8080");

        let without_server = BackendConfig::Local {
            model: "llama3".into(),
            base_url: None,
        };
        let client = LlmClient::from_config(&without_server, &config, http).unwrap();
        assert_eq!(client.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn api_key_parses_from_file() {
        let config: Config = toml::from_str("[openai]\napi_key = \"sk-file\"\n").unwrap();
        assert_eq!(config.openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn normalize_host_adds_scheme() {
        assert_eq!(normalize_host("gpu-box:11434"), "http://gpu-box:11434");
        assert_eq!(normalize_host("https://llm.example.com/"), "https://llm.example.com");
    }
}
