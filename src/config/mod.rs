use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub common: CommonConfig,
    pub extraction: ExtractionConfig,
    pub openai: OpenAiConfig,
    pub azure: AzureConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommonConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

/// Which extraction backends are wired in. `Mock` replaces both backends with
/// deterministic in-process doubles; used by the integration tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionMode {
    #[default]
    Live,
    Mock,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionConfig {
    pub mode: ExtractionMode,
}

#[derive(Debug, Clone, Default)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub api_version: String,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

#[derive(Debug, Clone, Default)]
pub struct UploadConfig {
    /// Per-file cap checked in the handler after reading each part.
    pub max_file_bytes: usize,
    /// Whole-request cap enforced by `DefaultBodyLimit` on the router.
    pub max_body_bytes: usize,
}

impl ImportConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let common: CommonConfig = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let mode = match get_env("EXTRACTION_MODE", Some("live"), is_prod)?.as_str() {
            "mock" => ExtractionMode::Mock,
            _ => ExtractionMode::Live,
        };

        Ok(ImportConfig {
            common,
            extraction: ExtractionConfig { mode },
            openai: OpenAiConfig {
                api_key: get_env("OPENAI_API_KEY", Some(""), is_prod)?,
                model: get_env("OPENAI_MODEL", Some("gpt-5"), is_prod)?,
                base_url: get_env("OPENAI_BASE_URL", Some("https://api.openai.com/v1"), is_prod)?,
            },
            azure: AzureConfig {
                endpoint: get_env("AZURE_DI_ENDPOINT", Some(""), is_prod)?,
                api_key: get_env("AZURE_DI_API_KEY", Some(""), is_prod)?,
                model_id: get_env("AZURE_DI_MODEL", Some("prebuilt-invoice"), is_prod)?,
                api_version: get_env("AZURE_DI_API_VERSION", Some("2024-11-30"), is_prod)?,
                poll_interval_ms: get_env("AZURE_DI_POLL_INTERVAL_MS", Some("1000"), is_prod)?
                    .parse()
                    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("AZURE_DI_POLL_INTERVAL_MS: {}", e)))?,
                max_polls: get_env("AZURE_DI_MAX_POLLS", Some("60"), is_prod)?
                    .parse()
                    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("AZURE_DI_MAX_POLLS: {}", e)))?,
            },
            upload: UploadConfig {
                max_file_bytes: get_env("UPLOAD_MAX_FILE_BYTES", Some("20971520"), is_prod)?
                    .parse()
                    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("UPLOAD_MAX_FILE_BYTES: {}", e)))?,
                max_body_bytes: get_env("UPLOAD_MAX_BODY_BYTES", Some("67108864"), is_prod)?
                    .parse()
                    .map_err(|e| AppError::ConfigError(anyhow::anyhow!("UPLOAD_MAX_BODY_BYTES: {}", e)))?,
            },
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}
