//! Thin HTTP client for the image-generation provider.
//!
//! Covers both text-to-image and image-to-image by the presence of a
//! `source_image` reference. The provider may return several candidate
//! URLs; exactly the first is used and the asset is downloaded within the
//! same attempt so the adapter's deadline covers it. Candidates are never
//! stitched together.
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::provider::adapter::classify_status;

pub const PROVIDER_NAME: &str = "image-generation";

#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationCall {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    /// Always 1; single-result discipline starts at the request.
    pub num_outputs: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
    pub seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Downloaded asset plus what the provider actually returned, for the
/// debug trace.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub url: String,
    pub bytes: Vec<u8>,
    pub candidate_count: usize,
}

#[derive(Clone)]
pub struct ImageProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ImageProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        ImageProvider {
            client: Client::new(),
            base_url: base,
            api_key,
        }
    }

    /// One generation attempt: request, pick the first candidate URL,
    /// download its bytes.
    pub async fn generate_once(&self, call: &ImageGenerationCall) -> AppResult<FetchedImage> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::MissingApiKey("IMAGE_PROVIDER_API_KEY".to_string()))?;

        let url = format!("{}/v1/generations", self.base_url);
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
        let outputs = json
            .get("output")
            .and_then(|o| o.as_array())
            .filter(|arr| !arr.is_empty())
            .ok_or_else(|| {
                AppError::Provider(format!("{} response has no output URLs", PROVIDER_NAME))
            })?;

        let candidate_count = outputs.len();
        let first_url = outputs[0]
            .as_str()
            .ok_or_else(|| {
                AppError::Provider(format!("{} output[0] is not a URL string", PROVIDER_NAME))
            })?
            .to_string();

        if candidate_count > 1 {
            tracing::warn!(
                provider = PROVIDER_NAME,
                candidate_count,
                "provider returned multiple outputs; using the first"
            );
        }

        let bytes = self.download(&first_url).await?;
        Ok(FetchedImage {
            url: first_url,
            bytes,
            candidate_count,
        })
    }

    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AppError::HttpClient)?;
        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(
                PROVIDER_NAME,
                status.as_u16(),
                "asset download failed",
            ));
        }
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(AppError::HttpClient)
    }
}
