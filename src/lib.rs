//! AdGen Pipeline library
//!
//! Context-resolution and generation-orchestration pipeline for marketing
//! text and image generation:
//!
//! raw request -> context resolver -> ContextPack -> orchestrator ->
//! prompt compiler -> provider adapter -> provider -> post-processed result.
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `context`: Request DTO, industry resolution and the immutable ContextPack.
//! - `prompt`: Prompt compilation from a ContextPack.
//! - `guard`: Development-time usage guard.
//! - `provider`: Retry/timeout adapter, provider clients, post-processing.
//! - `orchestrator`: Per-modality entry points.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod prompt;
pub mod provider;

pub use config::Config;
pub use context::pack::{ContextPack, Industry, IndustrySource};
pub use context::resolver::RawRequest;
pub use error::{AppError, AppResult};
pub use guard::UsageGuard;
pub use orchestrator::Orchestrator;
