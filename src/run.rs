//! Model/backend resolution and the fetch → summarize → report sequence.

use crate::chain::{ChainType, SummarizeChain};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::llm::{BackendConfig, DEFAULT_LOCAL_MODEL, DEFAULT_OPENAI_MODEL, LlmClient};
use crate::loader::WebLoader;
use std::io::Write;
use tracing::{debug, info};

/// One invocation's worth of CLI input.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub url: String,
    pub model_override: Option<String>,
    pub server_url: Option<String>,
    pub debug: bool,
    pub use_openai: bool,
}

impl RunRequest {
    pub fn resolved_model(&self) -> String {
        match &self.model_override {
            Some(model) => model.clone(),
            None if self.use_openai => DEFAULT_OPENAI_MODEL.into(),
            None => DEFAULT_LOCAL_MODEL.into(),
        }
    }

    /// `server_url` only applies to the local backend; it is ignored for OpenAI.
    pub fn backend(&self) -> BackendConfig {
        let model = self.resolved_model();
        if self.use_openai {
            BackendConfig::OpenAi { model }
        } else {
            BackendConfig::Local {
                model,
                base_url: self.server_url.clone(),
            }
        }
    }
}

/// User-facing failure category for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    BackendUnreachable,
    UnexpectedFailure,
}

impl Failure {
    pub fn classify(err: &Error) -> Self {
        if err.is_connection() {
            Self::BackendUnreachable
        } else {
            Self::UnexpectedFailure
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::BackendUnreachable => {
                "ERROR: Could not connect to the AI server. Please make sure the server is running and accessible."
            }
            Self::UnexpectedFailure => {
                "ERROR: An unexpected error occurred while summarizing the document."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Summarized,
    Failed(Failure),
}

/// Run the request and report any failure to `out` instead of returning it.
///
/// Only a failure to write to `out` itself is returned as an error.
pub async fn execute<W: Write>(
    request: &RunRequest,
    config: &Config,
    out: &mut W,
) -> std::io::Result<Outcome> {
    match run(request, config, out).await {
        Ok(()) => Ok(Outcome::Summarized),
        Err(e) => {
            let failure = Failure::classify(&e);
            debug!(?failure, error = ?e, "run failed");
            writeln!(out, "{}", failure.message())?;
            writeln!(out, "Technical details: {e}")?;
            Ok(Outcome::Failed(failure))
        }
    }
}

/// Fetch the page, summarize it, and print the summary.
pub async fn run<W: Write>(request: &RunRequest, config: &Config, out: &mut W) -> Result<()> {
    if request.url.trim().is_empty() {
        return Err(Error::config("url must not be empty"));
    }
    let chain_type: ChainType = config.chain.chain_type.parse()?;
    let http = HttpClient::new(&config.loader.user_agent, config.loader.timeout())?;

    let docs = WebLoader::new(http.clone()).load(&request.url).await?;

    let backend = request.backend();
    info!(model = backend.model(), ?backend, "resolved backend");
    let llm = LlmClient::from_config(&backend, config, http)?;

    let result = SummarizeChain::load(&llm, chain_type).invoke(docs).await?;

    if request.debug {
        let raw = serde_json::to_string_pretty(&result)
            .map_err(|e| Error::parse(format!("serialize result: {e}")))?;
        writeln!(out, "Debug mode enabled. Printing result:")?;
        writeln!(out, "{raw}")?;
    }

    writeln!(out)?;
    writeln!(out, "{}", result.output_text)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(use_openai: bool, model: Option<&str>, server: Option<&str>) -> RunRequest {
        RunRequest {
            url: "https://example.com".into(),
            model_override: model.map(String::from),
            server_url: server.map(String::from),
            debug: false,
            use_openai,
        }
    }

    #[test]
    fn default_models_follow_backend() {
        assert_eq!(request(false, None, None).resolved_model(), "llama3");
        assert_eq!(request(true, None, None).resolved_model(), "gpt-4-turbo");
    }

    #[test]
    fn override_wins_for_both_backends() {
        assert_eq!(request(false, Some("mistral"), None).resolved_model(), "mistral");
        assert_eq!(request(true, Some("mistral"), None).resolved_model(), "mistral");
    }

    #[test]
    fn classify_maps_only_connection_to_unreachable() {
        assert_eq!(
            Failure::classify(&Error::connection("refused")),
            Failure::BackendUnreachable
        );
        assert_eq!(
            Failure::classify(&Error::parse("bad json")),
            Failure::UnexpectedFailure
        );
    }

    #[tokio::test]
    async fn empty_url_is_reported_not_raised() {
        let req = RunRequest::default();
        let mut out = Vec::new();
        let outcome = execute(&req, &Config::default(), &mut out).await.unwrap();
        assert_eq!(outcome, Outcome::Failed(Failure::UnexpectedFailure));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("An unexpected error occurred"));
        assert!(text.contains("url must not be empty"));
    }

    #[tokio::test]
    async fn unknown_chain_type_is_unexpected_failure() {
        let mut config = Config::default();
        config.chain.chain_type = "map_reduce".into();
        let mut out = Vec::new();
        let outcome = execute(&request(false, None, None), &config, &mut out)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failed(Failure::UnexpectedFailure));
        assert!(String::from_utf8(out).unwrap().contains("map_reduce"));
    }
}
