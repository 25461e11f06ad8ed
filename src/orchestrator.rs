//! Generation orchestration: the only public entry points per modality.
//!
//! Every modality runs the same sequence: validate the pack, compile
//! prompts, mark guard usage, merge caller parameters with pack-derived
//! values, dispatch through the adapter, optionally attach a redacted
//! debug trace. Provider errors are logged with their trace context and
//! re-raised unchanged; nothing is written to storage here.
use std::sync::Arc;

use serde::Serialize;

use crate::config::Config;
use crate::context::pack::{ContextPack, Sources};
use crate::error::{AppError, AppResult};
use crate::guard::UsageGuard;
use crate::prompt::compiler::{self, ImagePrompt};
use crate::provider::adapter::{ProviderAdapter, RetryPolicy};
use crate::provider::image::{ImageGenerationCall, ImageProvider};
use crate::provider::postprocess;
use crate::provider::text::{ChatMessage, TextCompletionCall, TextProvider};
use crate::provider::{image, text};

const TEXT_TASK: &str = "Write the marketing copy described by the brief.";
const BACKGROUND_TASK: &str = "marketing campaign background image";
const COMPOSE_TASK: &str = "complete marketing visual for a campaign creative";
const FROM_IMAGE_TASK: &str = "restyled marketing image preserving the source subject";

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 800;
const DEFAULT_STEPS: u32 = 30;
const DEFAULT_GUIDANCE: f64 = 7.5;

const BRIEF_TRACE_CHARS: usize = 200;
const PROMPT_TRACE_CHARS: usize = 400;
const NEGATIVE_TRACE_CHARS: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct TextGenRequest {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub debug: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ImageGenRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Named aspect preset: `square`, `portrait` or `landscape`. Explicit
    /// width/height win over the preset.
    pub format: Option<String>,
    /// Same key reproduces the same creative variation and seed.
    pub variation_key: Option<String>,
    pub source_image: Option<String>,
    pub debug: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUsed {
    pub trace_id: String,
    pub brief: String,
    pub resolved_industry: String,
    pub output_type: String,
    pub topic_keywords: Vec<String>,
    pub sources: Sources,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

/// Truncated, redacted trace attached only when the caller asked for it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    pub context_used: ContextUsed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_user_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_lock_used: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_outputs_returned: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspected_collage: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGenResult {
    pub output_text: String,
    #[serde(rename = "_debug", skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageGenResult {
    /// Raw provider asset; dimensions at this URL are the source ones.
    pub public_url: String,
    pub source_width: u32,
    pub source_height: u32,
    /// Dimensions of the cover-fitted PNG in `png_bytes`.
    pub width: u32,
    pub height: u32,
    /// Cover-fitted PNG, ready for the caller to store.
    #[serde(skip)]
    pub png_bytes: Vec<u8>,
    #[serde(rename = "_debug", skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn target_dims(req: &ImageGenRequest) -> (u32, u32) {
    let (base_w, base_h) = match req.format.as_deref() {
        Some("portrait") => (1024, 1280),
        Some("landscape") => (1280, 1024),
        _ => (1024, 1024),
    };
    // An explicit dimension always wins; the preset fills in the rest.
    (req.width.unwrap_or(base_w), req.height.unwrap_or(base_h))
}

pub struct Orchestrator {
    guard: Arc<UsageGuard>,
    adapter: ProviderAdapter,
    text: TextProvider,
    image: ImageProvider,
    text_model: String,
}

impl Orchestrator {
    pub fn new(config: &Config, guard: Arc<UsageGuard>) -> Self {
        Orchestrator {
            adapter: ProviderAdapter::new(guard.clone()),
            text: TextProvider::new(
                config.text_provider_url.clone(),
                config.text_provider_api_key.clone(),
            ),
            image: ImageProvider::new(
                config.image_provider_url.clone(),
                config.image_provider_api_key.clone(),
            ),
            text_model: config.text_model.clone(),
            guard,
        }
    }

    pub async fn generate_text(
        &self,
        pack: &ContextPack,
        req: &TextGenRequest,
    ) -> AppResult<TextGenResult> {
        pack.validate()?;
        let compiled = compiler::compile_text(pack, TEXT_TASK);
        self.guard.mark_usage(pack);

        // Pack-derived values already flowed through the compiler; the
        // caller only controls the sampling parameters here.
        let call = TextCompletionCall {
            model: req.model.clone().unwrap_or_else(|| self.text_model.clone()),
            temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: compiled.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: compiled.user_prompt.clone(),
                },
            ],
        };

        let output_text = self
            .dispatch(pack, "text", text::PROVIDER_NAME, &RetryPolicy::text(), || {
                self.text.complete_once(&call)
            })
            .await?;

        let debug = req.debug.then(|| DebugTrace {
            context_used: self.context_used(pack, "text", None),
            final_system_prompt: Some(truncate_chars(&compiled.system_prompt, PROMPT_TRACE_CHARS)),
            final_user_prompt: Some(truncate_chars(&compiled.user_prompt, PROMPT_TRACE_CHARS)),
            provider_prompt: None,
            negative_prompt: None,
            industry_used: Some(pack.resolved_industry.as_str().to_string()),
            hero_lock_used: None,
            multiple_outputs_returned: None,
            suspected_collage: None,
        });

        Ok(TextGenResult { output_text, debug })
    }

    pub async fn generate_image_background(
        &self,
        pack: &ContextPack,
        req: &ImageGenRequest,
    ) -> AppResult<ImageGenResult> {
        self.generate_image(pack, req, BACKGROUND_TASK, "image-background", None)
            .await
    }

    pub async fn generate_image_compose(
        &self,
        pack: &ContextPack,
        req: &ImageGenRequest,
    ) -> AppResult<ImageGenResult> {
        self.generate_image(pack, req, COMPOSE_TASK, "image-compose", None)
            .await
    }

    pub async fn generate_image_from_image(
        &self,
        pack: &ContextPack,
        req: &ImageGenRequest,
    ) -> AppResult<ImageGenResult> {
        let source = req.source_image.clone().ok_or_else(|| {
            AppError::InvalidContext("image-from-image requires a source image reference".to_string())
        })?;
        self.generate_image(pack, req, FROM_IMAGE_TASK, "image-from-image", Some(source))
            .await
    }

    async fn generate_image(
        &self,
        pack: &ContextPack,
        req: &ImageGenRequest,
        task: &str,
        output_type: &str,
        source_image: Option<String>,
    ) -> AppResult<ImageGenResult> {
        pack.validate()?;
        let variation_key = req
            .variation_key
            .clone()
            .unwrap_or_else(|| pack.trace_id.clone());
        let compiled = compiler::compile_image(pack, task, &variation_key);
        self.guard.mark_usage(pack);

        let (width, height) = target_dims(req);
        let call = ImageGenerationCall {
            prompt: compiled.positive_prompt.clone(),
            negative_prompt: compiled.negative_prompt.clone(),
            width,
            height,
            num_outputs: 1,
            num_inference_steps: DEFAULT_STEPS,
            guidance_scale: DEFAULT_GUIDANCE,
            seed: compiler::variation_seed(&variation_key),
            image: source_image,
        };

        let fetched = self
            .dispatch(
                pack,
                output_type,
                image::PROVIDER_NAME,
                &RetryPolicy::image(),
                || self.image.generate_once(&call),
            )
            .await?;

        let processed = postprocess::fit_cover(&fetched.bytes, width, height)?;
        let collage = postprocess::suspected_collage(
            processed.source_width,
            processed.source_height,
            width,
            height,
        );
        if collage {
            tracing::warn!(
                trace_id = %pack.trace_id,
                source_width = processed.source_width,
                source_height = processed.source_height,
                width,
                height,
                "suspected collage output, cropped to target"
            );
        }

        let debug = req.debug.then(|| DebugTrace {
            context_used: self.context_used(pack, output_type, Some(&compiled)),
            final_system_prompt: None,
            final_user_prompt: None,
            provider_prompt: Some(truncate_chars(&compiled.positive_prompt, PROMPT_TRACE_CHARS)),
            negative_prompt: Some(truncate_chars(
                &compiled.negative_prompt,
                NEGATIVE_TRACE_CHARS,
            )),
            industry_used: Some(pack.resolved_industry.as_str().to_string()),
            hero_lock_used: Some(compiler::has_hero_lock(pack.resolved_industry)),
            multiple_outputs_returned: (fetched.candidate_count > 1)
                .then_some(fetched.candidate_count),
            suspected_collage: Some(collage),
        });

        Ok(ImageGenResult {
            public_url: fetched.url,
            source_width: processed.source_width,
            source_height: processed.source_height,
            width: processed.width,
            height: processed.height,
            png_bytes: processed.png_bytes,
            debug,
        })
    }

    /// Adapter dispatch with trace-correlated logging. Errors are re-raised
    /// unchanged; messaging and job-level retries belong to the caller.
    async fn dispatch<T, F, Fut>(
        &self,
        pack: &ContextPack,
        output_type: &str,
        provider: &str,
        policy: &RetryPolicy,
        attempt_fn: F,
    ) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = AppResult<T>>,
    {
        self.adapter
            .invoke(provider, &pack.trace_id, policy, attempt_fn)
            .await
            .map_err(|e| {
                tracing::error!(
                    trace_id = %pack.trace_id,
                    industry = pack.resolved_industry.as_str(),
                    output_type,
                    error = %e,
                    "generation failed"
                );
                e
            })
    }

    fn context_used(
        &self,
        pack: &ContextPack,
        output_type: &str,
        image_prompt: Option<&ImagePrompt>,
    ) -> ContextUsed {
        ContextUsed {
            trace_id: pack.trace_id.clone(),
            brief: truncate_chars(&pack.brief, BRIEF_TRACE_CHARS),
            resolved_industry: pack.resolved_industry.as_str().to_string(),
            output_type: output_type.to_string(),
            topic_keywords: pack.topic_keywords.clone(),
            sources: pack.sources.clone(),
            style_preset: pack.style.preset.clone(),
            negative_prompt: image_prompt
                .map(|p| truncate_chars(&p.negative_prompt, NEGATIVE_TRACE_CHARS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::resolver::{resolve, RawRequest};

    fn orchestrator() -> Orchestrator {
        let config = Config {
            text_provider_url: "http://localhost:9".to_string(),
            text_provider_api_key: Some("k".to_string()),
            text_model: "test-model".to_string(),
            image_provider_url: "http://localhost:9".to_string(),
            image_provider_api_key: Some("k".to_string()),
            api_host: "127.0.0.1".to_string(),
            api_port: "0".to_string(),
        };
        Orchestrator::new(&config, Arc::new(UsageGuard::new()))
    }

    #[tokio::test]
    async fn invalid_pack_is_rejected_before_any_provider_call() {
        let mut pack = resolve(&RawRequest::default());
        pack.trace_id = "  ".to_string();
        let err = orchestrator()
            .generate_text(&pack, &TextGenRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidContext(_)));
    }

    #[tokio::test]
    async fn from_image_requires_a_source_reference() {
        let pack = resolve(&RawRequest::default());
        let err = orchestrator()
            .generate_image_from_image(&pack, &ImageGenRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidContext(_)));
    }

    #[test]
    fn format_presets_map_to_target_dimensions() {
        let req = |format: &str| ImageGenRequest {
            format: Some(format.to_string()),
            ..Default::default()
        };
        assert_eq!(target_dims(&req("portrait")), (1024, 1280));
        assert_eq!(target_dims(&req("landscape")), (1280, 1024));
        assert_eq!(target_dims(&req("square")), (1024, 1024));
        assert_eq!(target_dims(&ImageGenRequest::default()), (1024, 1024));

        let explicit = ImageGenRequest {
            width: Some(512),
            height: Some(768),
            format: Some("landscape".to_string()),
            ..Default::default()
        };
        assert_eq!(target_dims(&explicit), (512, 768));
    }

    #[test]
    fn single_explicit_dimension_is_honored() {
        let width_only = ImageGenRequest {
            width: Some(512),
            format: Some("portrait".to_string()),
            ..Default::default()
        };
        assert_eq!(target_dims(&width_only), (512, 1280));

        let height_only = ImageGenRequest {
            height: Some(640),
            ..Default::default()
        };
        assert_eq!(target_dims(&height_only), (1024, 640));
    }

    #[test]
    fn truncation_is_char_safe() {
        assert_eq!(truncate_chars("propagace vozů", 11), "propagace v");
        assert_eq!(truncate_chars("krátké", 200), "krátké");
    }
}
