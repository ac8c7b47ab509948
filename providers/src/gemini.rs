use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;

use crate::{
    ApiConfig, GEMINI_API_BASE_URL, RemoteAnswerFailure, http_client, retry::RetryConfig,
    send_json,
};
use duel_types::Provider;

const GENERATE_CONTENT_METHOD: &str = "generateContent";
const TEMPERATURE: f64 = 0.2;

/// Models tried after the requested one, most preferred first.
const FALLBACK_FLASH_MODELS: [&str; 2] = ["gemini-2.5-flash", "gemini-2.0-flash"];
const FLASH_PREVIEW: &str = "gemini-3-flash-preview";
const FLASH_PREVIEW_SPELLINGS: [&str; 3] = ["gemini-3-flash", "gemini-3.0-flash", "gemini3-flash"];

static LABEL_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_\s]+").expect("valid separator regex"));

#[derive(Debug, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Gemini generateContent client.
///
/// The configured model is matched against ListModels on first use and the
/// result is kept for the life of this backend (and its clones). A credential
/// change means a new backend and therefore a fresh lookup.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    config: ApiConfig,
    retry: RetryConfig,
    resolved_model: Arc<OnceCell<String>>,
}

impl GeminiBackend {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(config, http_client().clone(), GEMINI_API_BASE_URL)
    }

    /// Backend against an arbitrary base URL, e.g. a local mock server.
    #[must_use]
    pub fn with_client(
        config: ApiConfig,
        client: reqwest::Client,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config,
            retry: RetryConfig::default(),
            resolved_model: Arc::new(OnceCell::new()),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Names of every model that supports generateContent, without the
    /// `models/` prefix.
    pub async fn list_models(&self) -> Result<Vec<String>, RemoteAnswerFailure> {
        let url = format!("{}/models", self.base_url);
        let key = self.config.api_key();
        let reply = send_json(
            Provider::Gemini,
            || self.client.get(&url).header("x-goog-api-key", key),
            &self.retry,
        )
        .await?;

        let listing: ListModelsResponse =
            serde_json::from_value(reply).map_err(|e| RemoteAnswerFailure::Transport {
                provider: Provider::Gemini,
                message: format!("unexpected ListModels body: {e}"),
            })?;

        Ok(listing
            .models
            .into_iter()
            .filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_CONTENT_METHOD)
            })
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }

    /// Model used for generateContent, discovered once per backend.
    pub async fn model(&self) -> Result<&str, RemoteAnswerFailure> {
        let resolved = self
            .resolved_model
            .get_or_try_init(|| async {
                let available = self.list_models().await?;
                let requested = self.config.model().as_str();
                let model = resolve_model(&available, requested)
                    .ok_or(RemoteAnswerFailure::NoModels)?
                    .to_string();
                tracing::info!(requested, resolved = %model, "Resolved Gemini model");
                Ok::<_, RemoteAnswerFailure>(model)
            })
            .await?;
        Ok(resolved.as_str())
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, RemoteAnswerFailure> {
        let model = self.model().await?;
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let key = self.config.api_key();
        let body = build_request_body(prompt);

        let reply = send_json(
            Provider::Gemini,
            || {
                self.client
                    .post(&url)
                    .header("x-goog-api-key", key)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            &self.retry,
        )
        .await?;

        Ok(extract_text(&reply))
    }
}

fn normalize_model_label(label: &str) -> String {
    LABEL_SEPARATORS
        .replace_all(&label.to_lowercase(), "-")
        .trim()
        .to_string()
}

/// Candidate names for `label`, most preferred first, without duplicates.
#[must_use]
pub fn preferred_aliases(label: &str) -> Vec<String> {
    let normalized = normalize_model_label(label);
    let preview = FLASH_PREVIEW_SPELLINGS
        .contains(&normalized.as_str())
        .then_some(FLASH_PREVIEW.to_string());

    let mut aliases: Vec<String> = Vec::with_capacity(4);
    for alias in preview
        .into_iter()
        .chain(std::iter::once(normalized))
        .chain(FALLBACK_FLASH_MODELS.iter().map(ToString::to_string))
    {
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }
    aliases
}

/// Pick a model from `available`: exact name, then aliases, then the first
/// flash model, then whatever comes first. `None` only when nothing is available.
#[must_use]
pub fn resolve_model<'a>(available: &'a [String], requested: &str) -> Option<&'a str> {
    let find = |name: &str| available.iter().find(|m| m.as_str() == name);

    let exact = requested.trim_start_matches("models/");
    find(exact)
        .or_else(|| {
            preferred_aliases(exact)
                .iter()
                .find_map(|alias| find(alias.as_str()))
        })
        .or_else(|| available.iter().find(|m| m.contains("flash")))
        .or_else(|| available.first())
        .map(String::as_str)
}

fn build_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": { "temperature": TEMPERATURE },
    })
}

/// `candidates[0].content.parts[].text`, joined and trimmed.
fn extract_text(reply: &Value) -> String {
    reply
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
