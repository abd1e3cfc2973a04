//! OpenAI-compatible RAG client.
//!
//! Works with: OpenAI, Azure OpenAI (including "on your data" retrieval via
//! `data_sources`), and any endpoint exposing `/chat/completions`.
//!
//! The client makes exactly one request per call and never retries.

use async_trait::async_trait;
use ragbridge_config::RagConfig;
use ragbridge_core::error::RagError;
use ragbridge_core::message::ChatMessage;
use ragbridge_core::rag::{RagClient, RagResponse};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// How the API key is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
enum KeyHeader {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `<name>: <key>` (Azure uses `api-key`)
    Named(String),
}

impl KeyHeader {
    fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("authorization") || s.eq_ignore_ascii_case("bearer") {
            KeyHeader::Bearer
        } else {
            KeyHeader::Named(s.to_string())
        }
    }
}

/// A RAG client for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiCompatRagClient {
    name: String,
    base_url: String,
    api_key: String,
    key_header: KeyHeader,
    api_version: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
    data_sources: Option<serde_json::Value>,
    client: reqwest::Client,
}

impl OpenAiCompatRagClient {
    /// Create a new client with a 60s request timeout.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, RagError> {
        Self::with_timeout(name, base_url, api_key, Duration::from_secs(60))
    }

    fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::NotConfigured(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            key_header: KeyHeader::Bearer,
            api_version: None,
            model: "gpt-4o".into(),
            temperature: 0.3,
            max_tokens: None,
            system_prompt: None,
            data_sources: None,
            client,
        })
    }

    /// Build a client from the `[rag]` config section.
    pub fn from_config(config: &RagConfig) -> Result<Self, RagError> {
        let name = if config.api_key_header.eq_ignore_ascii_case("api-key") {
            "azure-openai"
        } else {
            "openai-compat"
        };
        let api_key = config.api_key.clone().unwrap_or_default();
        if api_key.is_empty() {
            warn!("No RAG API key configured; requests will be sent unauthenticated");
        }

        let mut client = Self::with_timeout(
            name,
            &config.api_url,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_key_header(&config.api_key_header)
        .with_model(&config.model)
        .with_temperature(config.temperature)
        .with_max_tokens(config.max_tokens);

        client.api_version = config.api_version.clone();
        client.system_prompt = config.system_prompt.clone();
        client.data_sources = config.data_sources.clone();
        Ok(client)
    }

    pub fn with_key_header(mut self, header: &str) -> Self {
        self.key_header = KeyHeader::parse(header);
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_data_sources(mut self, sources: serde_json::Value) -> Self {
        self.data_sources = Some(sources);
        self
    }

    /// Convert the transcript to API messages, prepending the system prompt.
    fn to_api_messages<'a>(&'a self, messages: &'a [ChatMessage]) -> Vec<ApiMessage<'a>> {
        self.system_prompt
            .as_deref()
            .map(|p| ApiMessage {
                role: "system",
                content: p,
            })
            .into_iter()
            .chain(messages.iter().map(|m| ApiMessage {
                role: m.role().as_str(),
                content: m.content(),
            }))
            .collect()
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl RagClient for OpenAiCompatRagClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<RagResponse, RagError> {
        let body = ApiRequest {
            model: &self.model,
            messages: self.to_api_messages(messages),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
            data_sources: self.data_sources.as_ref(),
        };

        debug!(
            client = %self.name,
            model = %self.model,
            messages = body.messages.len(),
            "Sending completion request"
        );

        let mut request = self.client.post(self.completions_url()).json(&body);
        if let Some(version) = &self.api_version {
            request = request.query(&[("api-version", version)]);
        }
        if !self.api_key.is_empty() {
            request = match &self.key_header {
                KeyHeader::Bearer => request.bearer_auth(&self.api_key),
                KeyHeader::Named(name) => request.header(name.as_str(), &self.api_key),
            };
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RagError::Timeout(e.to_string())
            } else {
                RagError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "RAG backend returned error");
            return Err(RagError::ApiError {
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json::<RagResponse>()
            .await
            .map_err(|e| RagError::InvalidResponse(format!("Failed to parse response: {e}")))
    }
}

// --- API wire types ---

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_sources: Option<&'a serde_json::Value>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}
