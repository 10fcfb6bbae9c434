//! Read-only settings shared by every request.
//!
//! Resolved once at start-up (see `config.rs`) and handed to the handlers through
//! [`crate::AppState`], so tests can build their own without touching the environment.
use bon::Builder;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com/";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_CONCISE_MAX_TOKENS: u32 = 500;
pub const DEFAULT_DETAILED_MAX_TOKENS: u32 = 2048;

/// The credential for the text generation API.
///
/// `Debug` is redacted so the key never ends up in a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for ApiKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

/// Which model to ask, and how much it may write back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationProfile {
    pub model: String,
    pub max_tokens: u32,
}

impl GenerationProfile {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
        }
    }

    pub fn concise() -> Self {
        Self::new(DEFAULT_MODEL, DEFAULT_CONCISE_MAX_TOKENS)
    }

    pub fn detailed() -> Self {
        Self::new(DEFAULT_MODEL, DEFAULT_DETAILED_MAX_TOKENS)
    }
}

#[derive(Debug, Clone, Builder)]
pub struct Settings {
    /// Absent keys are allowed at start-up; every request then answers 500.
    pub api_key: Option<ApiKey>,
    #[builder(default = default_api_base())]
    pub api_base: Url,
    #[builder(default = DEFAULT_API_VERSION.to_owned())]
    pub api_version: String,
    #[builder(default = GenerationProfile::concise())]
    pub concise: GenerationProfile,
    #[builder(default = GenerationProfile::detailed())]
    pub detailed: GenerationProfile,
    #[builder(default = Duration::from_secs(90))]
    pub pool_idle_timeout: Duration,
    #[builder(default = 100)]
    pub pool_max_idle_per_host: usize,
}

impl Settings {
    /// The key to send upstream, if one is configured and non-blank.
    pub fn credential(&self) -> Option<&ApiKey> {
        self.api_key.as_ref().filter(|key| !key.is_empty())
    }
}

fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL")
}
