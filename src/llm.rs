use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";

/// Which backend to talk to, and with what model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Hosted OpenAI chat completions.
    OpenAi { model: String },
    /// Ollama server; `None` means the configured default endpoint.
    Local {
        model: String,
        base_url: Option<String>,
    },
}

impl BackendConfig {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model } | Self::Local { model, .. } => model.as_str(),
        }
    }
}

/// Connected backend handle with a single `complete` capability.
pub struct LlmClient {
    backend: Backend,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    http: HttpClient,
}

enum Backend {
    OpenAi { api_key: String },
    Ollama,
}

// -- OpenAI format --

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

// -- Ollama format --

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl LlmClient {
    /// Build the client for `backend`. `api_key` is only used by the OpenAI variant.
    pub fn new(
        backend: &BackendConfig,
        api_key: String,
        config: &Config,
        http: HttpClient,
    ) -> Result<Self> {
        match backend {
            BackendConfig::OpenAi { model } => {
                if api_key.is_empty() {
                    return Err(Error::config(format!(
                        "{} not set. Export it, add it to .env, or set openai.api_key to use OpenAI",
                        config.openai.api_key_env
                    )));
                }
                Ok(Self {
                    backend: Backend::OpenAi { api_key },
                    model: model.clone(),
                    base_url: trim_base(&config.openai.base_url),
                    temperature: config.openai.temperature,
                    max_tokens: config.openai.max_tokens,
                    http,
                })
            }
            BackendConfig::Local { model, base_url } => Ok(Self {
                backend: Backend::Ollama,
                model: model.clone(),
                base_url: trim_base(base_url.as_deref().unwrap_or(&config.ollama.base_url)),
                temperature: config.ollama.temperature,
                max_tokens: config.ollama.max_tokens,
                http,
            }),
        }
    }

    /// Build from config, taking the OpenAI key from `openai.api_key` or else
    /// the configured env var.
    pub fn from_config(
        backend: &BackendConfig,
        config: &Config,
        http: HttpClient,
    ) -> Result<Self> {
        let api_key = match backend {
            BackendConfig::OpenAi { .. } => config
                .openai
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| std::env::var(&config.openai.api_key_env).unwrap_or_default()),
            BackendConfig::Local { .. } => String::new(),
        };
        Self::new(backend, api_key, config, http)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, base_url = %self.base_url, "sending LLM request");

        match &self.backend {
            Backend::OpenAi { api_key } => self.complete_openai(api_key, prompt).await,
            Backend::Ollama => self.complete_ollama(prompt).await,
        }
    }

    async fn complete_openai(&self, api_key: &str, prompt: &str) -> Result<String> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let url = format!("{}/chat/completions", self.base_url);
        let response_text = self
            .http
            .post_json_raw(&url, &body, &[("Authorization", &format!("Bearer {api_key}"))])
            .await
            .map_err(|e| {
                warn!("OpenAI API error: {e}");
                e
            })?;

        let resp: OpenAiResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse OpenAI response: {e}")))?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::parse("empty response from OpenAI"))
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String> {
        let options = (self.temperature.is_some() || self.max_tokens.is_some()).then(|| {
            OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            }
        });
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let url = format!("{}/api/generate", self.base_url);
        let response_text = self
            .http
            .post_json_raw(&url, &body, &[])
            .await
            .map_err(|e| {
                warn!("Ollama API error: {e}");
                e
            })?;

        let resp: OllamaResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse Ollama response: {e}")))?;
        Ok(resp.response)
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
