//! Opponent provider enumeration, model names, and provider-scoped credentials.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the opponent's answers come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Local stochastic simulator; never touches the network.
    #[default]
    Simulated,
    OpenAI,
    Gemini,
}

const PROVIDER_PARSE_VALUES: &[&str] = &[
    "simulated",
    "local",
    "offline",
    "openai",
    "gpt",
    "gemini",
    "google",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid provider '{raw}'; expected one of: {expected:?}")]
pub struct ProviderParseError {
    raw: String,
    expected: &'static [&'static str],
}

impl ProviderParseError {
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl Provider {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Provider::Simulated => "simulated",
            Provider::OpenAI => "openai",
            Provider::Gemini => "gemini",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Provider::Simulated => "Simulated AI",
            Provider::OpenAI => "GPT",
            Provider::Gemini => "Gemini",
        }
    }

    /// Environment variable consulted when no key is configured.
    #[must_use]
    pub const fn env_var(&self) -> Option<&'static str> {
        match self {
            Provider::Simulated => None,
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Gemini => Some("GEMINI_API_KEY"),
        }
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        !matches!(self, Provider::Simulated)
    }

    /// Default model for remote providers.
    #[must_use]
    pub fn default_model(&self) -> Option<ModelName> {
        match self {
            Provider::Simulated => None,
            Provider::OpenAI => Some(ModelName::known(*self, "gpt-5-mini")),
            Provider::Gemini => Some(ModelName::known(*self, "gemini-3-flash-preview")),
        }
    }

    pub fn parse(s: &str) -> Result<Self, ProviderParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "local" | "offline" => Ok(Provider::Simulated),
            "openai" | "gpt" => Ok(Provider::OpenAI),
            "gemini" | "google" => Ok(Provider::Gemini),
            _ => Err(ProviderParseError {
                raw: s.to_string(),
                expected: PROVIDER_PARSE_VALUES,
            }),
        }
    }

    #[must_use]
    pub fn all() -> &'static [Provider] {
        &[Provider::Simulated, Provider::OpenAI, Provider::Gemini]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = ProviderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Error)]
pub enum ModelParseError {
    #[error("model name cannot be empty")]
    Empty,
    #[error("the simulated provider has no models")]
    NoModels,
    #[error("OpenAI model must be a gpt- or o-series name (got {0})")]
    OpenAIPrefix(String),
    #[error("Gemini model must start with gemini- (got {0})")]
    GeminiPrefix(String),
}

/// `gpt-*` or an o-series name such as `o1`, `o3-mini`, `o4-mini`.
fn is_openai_family(lower: &str) -> bool {
    lower.starts_with("gpt-")
        || lower
            .strip_prefix('o')
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Provider-scoped model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelName {
    provider: Provider,
    #[serde(rename = "model")]
    name: Cow<'static, str>,
}

impl ModelName {
    pub fn parse(provider: Provider, raw: &str) -> Result<Self, ModelParseError> {
        let trimmed = raw.trim().trim_start_matches("models/");
        if trimmed.is_empty() {
            return Err(ModelParseError::Empty);
        }

        let lower = trimmed.to_ascii_lowercase();
        match provider {
            Provider::Simulated => return Err(ModelParseError::NoModels),
            Provider::OpenAI if !is_openai_family(&lower) => {
                return Err(ModelParseError::OpenAIPrefix(trimmed.to_string()));
            }
            Provider::Gemini if !lower.starts_with("gemini-") => {
                return Err(ModelParseError::GeminiPrefix(trimmed.to_string()));
            }
            _ => {}
        }

        Ok(Self {
            provider,
            name: Cow::Owned(trimmed.to_string()),
        })
    }

    #[must_use]
    pub const fn known(provider: Provider, name: &'static str) -> Self {
        Self {
            provider,
            name: Cow::Borrowed(name),
        }
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.name.as_ref()
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name.fmt(f)
    }
}

/// Provider-scoped API key.
///
/// An OpenAI key cannot be handed to the Gemini backend by construction.
/// `Debug` is manually implemented to redact the key value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ApiKey {
    OpenAI(String),
    Gemini(String),
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiKey::OpenAI(_) => write!(f, "ApiKey::OpenAI(<redacted>)"),
            ApiKey::Gemini(_) => write!(f, "ApiKey::Gemini(<redacted>)"),
        }
    }
}

impl ApiKey {
    /// Build a key for `provider`, rejecting blank input and the simulated provider.
    #[must_use]
    pub fn for_provider(provider: Provider, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match provider {
            Provider::Simulated => None,
            Provider::OpenAI => Some(ApiKey::OpenAI(trimmed.to_string())),
            Provider::Gemini => Some(ApiKey::Gemini(trimmed.to_string())),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            ApiKey::OpenAI(_) => Provider::OpenAI,
            ApiKey::Gemini(_) => Provider::Gemini,
        }
    }

    #[must_use]
    pub fn expose_secret(&self) -> &str {
        match self {
            ApiKey::OpenAI(key) | ApiKey::Gemini(key) => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiKey, ModelName, ModelParseError, Provider};

    #[test]
    fn provider_parse_accepts_aliases() {
        assert_eq!(Provider::parse("GPT").unwrap(), Provider::OpenAI);
        assert_eq!(Provider::parse(" google ").unwrap(), Provider::Gemini);
        assert_eq!(Provider::parse("offline").unwrap(), Provider::Simulated);
        let err = Provider::parse("claude").unwrap_err();
        assert_eq!(err.raw(), "claude");
    }

    #[test]
    fn simulated_provider_has_no_model() {
        assert!(Provider::Simulated.default_model().is_none());
        assert!(matches!(
            ModelName::parse(Provider::Simulated, "anything"),
            Err(ModelParseError::NoModels)
        ));
    }

    #[test]
    fn model_parse_strips_models_prefix() {
        let model = ModelName::parse(Provider::Gemini, "models/gemini-2.5-flash").unwrap();
        assert_eq!(model.as_str(), "gemini-2.5-flash");
        assert!(ModelName::parse(Provider::OpenAI, "gemini-2.5-flash").is_err());
    }

    #[test]
    fn openai_accepts_o_series_models() {
        for name in ["o3-mini", "o1", "O4-mini", "gpt-5-mini"] {
            let model = ModelName::parse(Provider::OpenAI, name).unwrap();
            assert_eq!(model.provider(), Provider::OpenAI);
        }
        assert_eq!(ModelName::parse(Provider::OpenAI, "o3-mini").unwrap().as_str(), "o3-mini");
        for name in ["omni", "o", "davinci-002"] {
            assert!(matches!(
                ModelName::parse(Provider::OpenAI, name),
                Err(ModelParseError::OpenAIPrefix(_))
            ));
        }
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::for_provider(Provider::OpenAI, "sk-secret").unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("sk-secret"));
        assert_eq!(key.provider(), Provider::OpenAI);
    }

    #[test]
    fn api_key_rejects_blank_and_simulated() {
        assert!(ApiKey::for_provider(Provider::Gemini, "   ").is_none());
        assert!(ApiKey::for_provider(Provider::Simulated, "key").is_none());
    }
}
