//! Remote opponent backends.
//!
//! # Architecture
//!
//! - [`Backend`] - dispatch over the two HTTP reasoning backends
//! - [`openai`] - OpenAI Responses API client
//! - [`gemini`] - Gemini generateContent client with model discovery
//! - [`prompt`] - puzzle to prompt formatting
//! - [`reply`] - structured-reply extraction and answer validation
//! - [`retry`] - single-attempt send policy shared by both clients
//!
//! Every failure is returned as a [`RemoteAnswerFailure`]. Callers are expected
//! to recover locally; nothing here is fatal.

pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod reply;
pub mod retry;

use std::sync::OnceLock;
use std::time::Duration;

use duel_types::{ApiKey, ModelName, OpponentAnswer, Provider, PuzzleInstance};
use thiserror::Error;

pub use duel_types;
pub use gemini::GeminiBackend;
pub use openai::OpenAIBackend;
pub use prompt::build_prompt;
pub use reply::{interpret_reply, parse_reply_json};

/// Canonical OpenAI API origin.
pub const OPENAI_API_BASE_URL: &str = "https://api.openai.com";
/// Canonical Gemini API base URL.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const CONNECT_TIMEOUT_SECS: u64 = 30;
const TCP_KEEPALIVE_SECS: u64 = 60;
const POOL_MAX_IDLE_PER_HOST: usize = 16;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;

const MAX_ERROR_BODY_BYTES: usize = 32 * 1024;
/// Error bodies are cut to this many characters before they reach a log line.
const ERROR_BODY_PREVIEW_CHARS: usize = 220;

pub fn http_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        base_client_builder().build().unwrap_or_else(|e| {
            tracing::error!(
                "Failed to build hardened HTTP client: {e}. Attempting minimal hardened fallback."
            );
            reqwest::Client::builder()
                .https_only(true)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("Minimal hardened HTTP client must build; cannot proceed without TLS")
        })
    })
}

fn base_client_builder() -> reqwest::ClientBuilder {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_static(concat!("puzzle-duel/", env!("CARGO_PKG_VERSION"))),
    );

    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .redirect(reqwest::redirect::Policy::none())
        .https_only(true)
        .tcp_keepalive(Some(Duration::from_secs(TCP_KEEPALIVE_SECS)))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .pool_idle_timeout(Some(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS)))
        .default_headers(default_headers)
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of an error response body.
pub async fn read_capped_error_body(mut response: reqwest::Response) -> String {
    let mut body = Vec::new();
    while let Ok(Some(chunk)) = response.chunk().await {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_ERROR_BODY_BYTES {
            body.truncate(MAX_ERROR_BODY_BYTES);
            let text = String::from_utf8_lossy(&body);
            return format!("{text}...(truncated)");
        }
    }
    String::from_utf8_lossy(&body).into_owned()
}

/// Why a remote backend could not produce an answer.
#[derive(Debug, Error)]
pub enum RemoteAnswerFailure {
    #[error("no {0} API key configured")]
    MissingCredentials(Provider),
    #[error("{provider} request failed: {message}")]
    Transport { provider: Provider, message: String },
    #[error("{provider} request failed ({status}): {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },
    #[error("no generateContent models returned by ListModels")]
    NoModels,
    #[error("{0} returned an empty reply")]
    EmptyReply(Provider),
    #[error("{0} response did not contain a valid choice index")]
    NoValidChoice(Provider),
}

impl RemoteAnswerFailure {
    /// Provider the failure belongs to.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::MissingCredentials(provider)
            | Self::EmptyReply(provider)
            | Self::NoValidChoice(provider)
            | Self::Transport { provider, .. }
            | Self::Status { provider, .. } => *provider,
            Self::NoModels => Provider::Gemini,
        }
    }
}

/// Send with retries and decode a JSON body, mapping every failure mode.
pub(crate) async fn send_json<F>(
    provider: Provider,
    build_request: F,
    retry_config: &retry::RetryConfig,
) -> Result<serde_json::Value, RemoteAnswerFailure>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = match retry::send_with_retry(build_request, retry_config).await {
        retry::RetryOutcome::Success(response) => response,
        retry::RetryOutcome::HttpError(response) => {
            let status = response.status().as_u16();
            let body = read_capped_error_body(response).await;
            return Err(RemoteAnswerFailure::Status {
                provider,
                status,
                body: duel_types::truncate_with_ellipsis(&body, ERROR_BODY_PREVIEW_CHARS),
            });
        }
        retry::RetryOutcome::ConnectionError { attempts, source } => {
            let message = if attempts > 1 {
                format!("failed after {attempts} attempts: {source}")
            } else {
                source.to_string()
            };
            return Err(RemoteAnswerFailure::Transport { provider, message });
        }
    };

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| RemoteAnswerFailure::Transport {
            provider,
            message: format!("invalid JSON body: {e}"),
        })
}

/// Provider + model selection for one backend.
///
/// The constructor enforces that the API key and model belong to the same provider.
///
/// ```rust
/// use duel_providers::ApiConfig;
/// use duel_types::{ApiKey, Provider};
///
/// let key = ApiKey::for_provider(Provider::OpenAI, "test").unwrap();
/// let config = ApiConfig::new(key, Provider::OpenAI.default_model().unwrap()).unwrap();
/// assert_eq!(config.provider(), Provider::OpenAI);
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    api_key: ApiKey,
    model: ModelName,
}

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error("API key provider {key:?} does not match model provider {model:?}")]
    ProviderMismatch { key: Provider, model: Provider },
}

impl ApiConfig {
    pub fn new(api_key: ApiKey, model: ModelName) -> Result<Self, ApiConfigError> {
        let key_provider = api_key.provider();
        let model_provider = model.provider();
        if key_provider != model_provider {
            return Err(ApiConfigError::ProviderMismatch {
                key: key_provider,
                model: model_provider,
            });
        }
        Ok(Self { api_key, model })
    }

    /// Config using the provider's default model.
    #[must_use]
    pub fn with_default_model(api_key: ApiKey) -> Self {
        let provider = api_key.provider();
        let model = provider
            .default_model()
            .unwrap_or_else(|| ModelName::known(provider, ""));
        Self { api_key, model }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.api_key.provider()
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    #[must_use]
    pub fn model(&self) -> &ModelName {
        &self.model
    }
}

/// One remote reasoning backend.
#[derive(Debug, Clone)]
pub enum Backend {
    OpenAI(OpenAIBackend),
    Gemini(GeminiBackend),
}

impl Backend {
    /// Backend against the provider's public endpoint.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        match config.provider() {
            Provider::Gemini => Backend::Gemini(GeminiBackend::new(config)),
            _ => Backend::OpenAI(OpenAIBackend::new(config)),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Backend::OpenAI(_) => Provider::OpenAI,
            Backend::Gemini(_) => Provider::Gemini,
        }
    }

    /// Raw model text for `prompt`.
    pub async fn complete(&self, prompt: &str) -> Result<String, RemoteAnswerFailure> {
        let text = match self {
            Backend::OpenAI(backend) => backend.complete(prompt).await?,
            Backend::Gemini(backend) => backend.complete(prompt).await?,
        };
        if text.trim().is_empty() {
            return Err(RemoteAnswerFailure::EmptyReply(self.provider()));
        }
        Ok(text)
    }

    /// Ask the backend about `instance` and validate the reply against it.
    pub async fn answer(
        &self,
        instance: &PuzzleInstance,
    ) -> Result<OpponentAnswer, RemoteAnswerFailure> {
        let prompt = build_prompt(instance);
        tracing::debug!(provider = %self.provider(), domain = %instance.domain(), "remote answer request");
        let text = self.complete(&prompt).await?;
        interpret_reply(instance, &text, self.provider())
    }
}
