use crate::error::{Error, Result};
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_USER_AGENT: &str = "WebAISum/1.0";

/// Thin wrapper over `reqwest::Client`. Every request is a single attempt.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| Error::http(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        self.send(self.client.get(url)).await
    }

    pub async fn post_json_raw(
        &self,
        url: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Result<String> {
        debug!(url, bytes = body.len(), "POST");
        let mut req = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string());
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        self.send(req).await
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<String> {
        match req.send().await {
            Ok(resp) => self.handle_response(resp).await,
            Err(e) => Err(classify_send_error(e)),
        }
    }

    async fn handle_response(&self, resp: reqwest::Response) -> Result<String> {
        let status = resp.status();
        let url = resp.url().to_string();

        match status {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => {
                resp.text().await.map_err(|e| Error::http(e.to_string()))
            }
            _ => {
                let body = resp.text().await.unwrap_or_default();
                warn!(%url, status = status.as_u16(), "request failed");
                Err(Error::api_with_status(
                    extract_domain(&url),
                    describe_failure(status, &body),
                    status.as_u16(),
                ))
            }
        }
    }
}

fn classify_send_error(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::connection(format_error_chain(&e))
    } else {
        Error::http(format_error_chain(&e))
    }
}

/// reqwest's top-level message hides the OS-level cause; append the source chain.
fn format_error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

fn extract_domain(url: &str) -> String {
    url.split("//")
        .nth(1)
        .and_then(|s| s.split('/').next())
        .unwrap_or("unknown")
        .to_string()
}
