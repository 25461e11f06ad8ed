//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binary. Defaults are provided for convenience during development.
//! API keys have no defaults; provider calls fail fast without them.
use std::env;

pub struct Config {
    pub text_provider_url: String,
    pub text_provider_api_key: Option<String>,
    pub text_model: String,
    pub image_provider_url: String,
    pub image_provider_api_key: Option<String>,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Result<Self, env::VarError> {
        Ok(Config {
            text_provider_url: env::var("TEXT_PROVIDER_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            text_provider_api_key: env::var("TEXT_PROVIDER_API_KEY").ok(),
            text_model: env::var("TEXT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            image_provider_url: env::var("IMAGE_PROVIDER_URL")
                .unwrap_or_else(|_| "https://api.replicate.com".to_string()),
            image_provider_api_key: env::var("IMAGE_PROVIDER_API_KEY").ok(),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8190".to_string()),
        })
    }

    /// Log the effective environment; key material is never printed.
    pub fn print_env_vars() {
        let set_or_unset = |key: &str| {
            if env::var(key).is_ok() {
                "<set>"
            } else {
                "<unset>"
            }
        };
        println!(
            "TEXT_PROVIDER_URL: {}",
            env::var("TEXT_PROVIDER_URL").unwrap_or_else(|_| "<unset>".to_string())
        );
        println!(
            "TEXT_PROVIDER_API_KEY: {}",
            set_or_unset("TEXT_PROVIDER_API_KEY")
        );
        println!(
            "TEXT_MODEL: {}",
            env::var("TEXT_MODEL").unwrap_or_else(|_| "<unset>".to_string())
        );
        println!(
            "IMAGE_PROVIDER_URL: {}",
            env::var("IMAGE_PROVIDER_URL").unwrap_or_else(|_| "<unset>".to_string())
        );
        println!(
            "IMAGE_PROVIDER_API_KEY: {}",
            set_or_unset("IMAGE_PROVIDER_API_KEY")
        );
        println!(
            "API_HOST: {}",
            env::var("API_HOST").unwrap_or_else(|_| "<unset>".to_string())
        );
        println!(
            "API_PORT: {}",
            env::var("API_PORT").unwrap_or_else(|_| "<unset>".to_string())
        );
    }
}
