//! Configuration parsing and validation for the relay server
//!
//! This module handles command-line and environment parsing using clap, and resolves the result
//! into the [`Settings`] shared by every request.
use anyhow::anyhow;
use clap::Parser;
use std::time::Duration;
use tarot_relay::settings::{
    ApiKey, DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_CONCISE_MAX_TOKENS,
    DEFAULT_DETAILED_MAX_TOKENS, DEFAULT_MODEL, GenerationProfile, Settings,
};
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the relay server will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The port on which the metrics server will listen.
    #[arg(long, env = "TAROT_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, env = "TAROT_METRICS", default_value_t = true, action = clap::ArgAction::Set)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "tarot_relay")]
    pub metrics_prefix: String,

    /// Credential for the text generation API. Without it, every reading answers 500.
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<ApiKey>,

    /// Base URL of the text generation API; `v1/messages` is appended.
    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = DEFAULT_API_BASE)]
    pub api_base: Url,

    /// Value of the `anthropic-version` header.
    #[arg(long, env = "ANTHROPIC_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Model used for the concise interpretation.
    #[arg(long, env = "TAROT_CONCISE_MODEL", default_value = DEFAULT_MODEL)]
    pub concise_model: String,

    /// Output token limit for the concise interpretation.
    #[arg(long, env = "TAROT_CONCISE_MAX_TOKENS", default_value_t = DEFAULT_CONCISE_MAX_TOKENS)]
    pub concise_max_tokens: u32,

    /// Model used for the detailed advice.
    #[arg(long, env = "TAROT_DETAILED_MODEL", default_value = DEFAULT_MODEL)]
    pub detailed_model: String,

    /// Output token limit for the detailed advice.
    #[arg(long, env = "TAROT_DETAILED_MAX_TOKENS", default_value_t = DEFAULT_DETAILED_MAX_TOKENS)]
    pub detailed_max_tokens: u32,

    /// Maximum number of idle HTTP connections to keep alive to the API host.
    #[arg(long, default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if self.concise_max_tokens == 0 || self.detailed_max_tokens == 0 {
            return Err(anyhow!("Token limits must be at least 1"));
        }
        if self.concise_model.trim().is_empty() || self.detailed_model.trim().is_empty() {
            return Err(anyhow!("Model identifiers must not be empty"));
        }
        if self.api_key.as_ref().is_none_or(ApiKey::is_empty) {
            warn!("ANTHROPIC_API_KEY is not set; readings will fail with 500 until it is");
        }
        Ok(self)
    }

    pub fn settings(&self) -> Settings {
        Settings::builder()
            .maybe_api_key(self.api_key.clone().filter(|key| !key.is_empty()))
            .api_base(self.api_base.clone())
            .api_version(self.api_version.clone())
            .concise(GenerationProfile::new(
                self.concise_model.clone(),
                self.concise_max_tokens,
            ))
            .detailed(GenerationProfile::new(
                self.detailed_model.clone(),
                self.detailed_max_tokens,
            ))
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["tarot-relay", "--api-key", "sk-test"])
            .unwrap()
            .validate()
            .unwrap();
        let settings = config.settings();

        assert_eq!(settings.credential().map(ApiKey::expose), Some("sk-test"));
        assert_eq!(settings.concise, GenerationProfile::concise());
        assert_eq!(settings.detailed, GenerationProfile::detailed());
        assert_eq!(settings.api_base.as_str(), DEFAULT_API_BASE);
    }

    #[test]
    fn test_overrides() {
        let config = Config::try_parse_from([
            "tarot-relay",
            "--api-key",
            "sk",
            "--concise-model",
            "claude-haiku",
            "--detailed-max-tokens",
            "4096",
            "--metrics",
            "false",
            "--api-base",
            "http://localhost:8080/",
        ])
        .unwrap();
        let settings = config.settings();

        assert!(!config.metrics);
        assert_eq!(settings.concise.model, "claude-haiku");
        assert_eq!(settings.detailed.max_tokens, 4096);
        assert_eq!(settings.api_base.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_zero_token_limit_is_rejected() {
        let config = Config::try_parse_from(["tarot-relay", "--concise-max-tokens", "0"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_output_hides_key() {
        let config = Config::try_parse_from(["tarot-relay", "--api-key", "sk-ant-very-secret"]).unwrap();
        assert!(!format!("{config:?}").contains("very-secret"));
    }
}
