use std::time::Duration;

use lens_logging::{lens_debug, lens_warn};
use pagelens_core::DEFAULT_MODEL;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

pub const OPENAI_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: OPENAI_CHAT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Failure talking to the model API. `status` is set when the upstream
/// answered with a non-success HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("OpenAI API error{}: {message}", status_suffix(.status))]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    pub fn missing_api_key() -> Self {
        Self::new("Please set your OpenAI API key in the settings.", None)
    }

    /// What the user can do about it.
    pub fn remediation(&self) -> &'static str {
        match self.status {
            Some(401) | Some(403) => "Check that the API key in your settings is valid.",
            Some(429) => "The API rate limit was reached. Wait a moment and try again.",
            Some(code) if code >= 500 => "The API service is having problems. Try again later.",
            Some(_) => "The API rejected the request. Check the model name in your settings.",
            None if self.message.contains("API key") => {
                "Run `pagelens settings set --api-key <KEY>` to configure it."
            }
            None => "Check your network connection and try again.",
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" ({code})")).unwrap_or_default()
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends `prompt` followed by `content` and returns the model's reply.
    async fn analyze(
        &self,
        prompt: &str,
        content: &str,
        system_message: Option<&str>,
    ) -> Result<String, ApiError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Chat-completions client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    settings: LlmSettings,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, settings: LlmSettings) -> Result<Self, ApiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ApiError::missing_api_key());
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(err.to_string(), None))?;
        Ok(Self {
            api_key,
            settings,
            client,
        })
    }

    fn build_body(
        &self,
        prompt: &str,
        content: &str,
        system_message: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_message.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage {
                role: "system",
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: format!("{prompt}\n\n{content}"),
        });
        serde_json::to_string(&ChatRequest {
            model: &self.settings.model,
            messages,
        })
        .map_err(|err| ApiError::new(err.to_string(), None))
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn analyze(
        &self,
        prompt: &str,
        content: &str,
        system_message: Option<&str>,
    ) -> Result<String, ApiError> {
        let body = self.build_body(prompt, content, system_message)?;
        lens_debug!(
            "POST {} model={} body_len={}",
            self.settings.endpoint,
            self.settings.model,
            body.len()
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "OpenAI API request failed".to_string());
            lens_warn!("chat completion rejected with {}: {}", status, detail);
            return Err(ApiError::new(detail, Some(status.as_u16())));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|err| ApiError::new(format!("malformed response: {err}"), None))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ApiError::new("malformed response: no message content", None))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new("request timed out", None);
    }
    ApiError::new(err.to_string(), err.status().map(|s| s.as_u16()))
}
