//! Thin HTTP client for the text-completion provider.
//!
//! Performs exactly one attempt per call; retry, timeout and guard
//! discipline live in the adapter.
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::provider::adapter::classify_status;

pub const PROVIDER_NAME: &str = "text-completion";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionCall {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone)]
pub struct TextProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TextProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        TextProvider {
            client: Client::new(),
            base_url: base,
            api_key,
        }
    }

    /// One completion attempt. Yields the single output text string.
    pub async fn complete_once(&self, call: &TextCompletionCall) -> AppResult<String> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::MissingApiKey("TEXT_PROVIDER_API_KEY".to_string()))?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(key)
            .json(call)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_string());
            return Err(classify_status(PROVIDER_NAME, status.as_u16(), &body));
        }

        let json: Value = response.json().await.map_err(AppError::HttpClient)?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                AppError::Provider(format!(
                    "{} response is missing choices[0].message.content",
                    PROVIDER_NAME
                ))
            })
    }
}
