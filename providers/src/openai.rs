use serde_json::{Value, json};

use crate::{
    ApiConfig, OPENAI_API_BASE_URL, RemoteAnswerFailure, http_client, retry::RetryConfig,
    send_json,
};
use duel_types::Provider;

const RESPONSES_PATH: &str = "/v1/responses";

/// OpenAI Responses API client.
#[derive(Debug, Clone)]
pub struct OpenAIBackend {
    client: reqwest::Client,
    base_url: String,
    config: ApiConfig,
    retry: RetryConfig,
}

impl OpenAIBackend {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(config, http_client().clone(), OPENAI_API_BASE_URL)
    }

    /// Backend against an arbitrary origin, e.g. a local mock server.
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
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, RemoteAnswerFailure> {
        let url = format!("{}{RESPONSES_PATH}", self.base_url);
        let auth_header = format!("Bearer {}", self.config.api_key());
        let body = build_request_body(&self.config, prompt);

        let reply = send_json(
            Provider::OpenAI,
            || {
                self.client
                    .post(&url)
                    .header("Authorization", &auth_header)
                    .header("content-type", "application/json")
                    .json(&body)
            },
            &self.retry,
        )
        .await?;

        Ok(extract_output_text(&reply))
    }
}

fn build_request_body(config: &ApiConfig, prompt: &str) -> Value {
    json!({
        "model": config.model().as_str(),
        "input": prompt,
    })
}

/// `output_text` when the API provides it, else every `output[].content[].text`
/// joined by newlines.
fn extract_output_text(reply: &Value) -> String {
    if let Some(text) = reply.get("output_text").and_then(Value::as_str)
        && !text.trim().is_empty()
    {
        return text.trim().to_string();
    }

    reply
        .get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{OpenAIBackend, build_request_body, extract_output_text};
    use crate::{ApiConfig, RemoteAnswerFailure, retry::RetryConfig};
    use duel_types::{ApiKey, Provider};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> ApiConfig {
        ApiConfig::with_default_model(ApiKey::for_provider(Provider::OpenAI, "sk-test").unwrap())
    }

    fn backend(server: &MockServer) -> OpenAIBackend {
        OpenAIBackend::with_client(config(), reqwest::Client::new(), server.uri()).with_retry(
            RetryConfig {
                max_retries: 1,
                delay: Duration::from_millis(1),
                ..RetryConfig::default()
            },
        )
    }

    #[test]
    fn request_body_carries_model_and_input() {
        let body = build_request_body(&config(), "hello");
        assert_eq!(body, json!({"model": "gpt-5-mini", "input": "hello"}));
    }

    #[test]
    fn output_text_wins_when_present() {
        let reply = json!({"output_text": "  {\"choiceIndex\":1}  ", "output": []});
        assert_eq!(extract_output_text(&reply), "{\"choiceIndex\":1}");
    }

    #[test]
    fn content_parts_are_joined() {
        let reply = json!({
            "output_text": "   ",
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": " first "},
                    {"type": "output_text", "text": ""},
                ]},
                {"type": "message", "content": [{"type": "output_text", "text": "second"}]},
            ]
        });
        assert_eq!(extract_output_text(&reply), "first\nsecond");
        assert_eq!(extract_output_text(&json!({})), "");
    }

    #[tokio::test]
    async fn complete_posts_to_responses_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({"model": "gpt-5-mini", "input": "Q"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"output_text": "{\"answer\":\"echo\"}"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = backend(&server).complete("Q").await.unwrap();
        assert_eq!(text, "{\"answer\":\"echo\"}");
    }

    #[tokio::test]
    async fn client_errors_become_status_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/responses"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = backend(&server).complete("Q").await.unwrap_err();
        match err {
            RemoteAnswerFailure::Status {
                provider,
                status,
                body,
            } => {
                assert_eq!(provider, Provider::OpenAI);
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn opted_in_retry_repeats_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let err = backend(&server).complete("Q").await.unwrap_err();
        assert!(matches!(
            err,
            RemoteAnswerFailure::Status { status: 503, .. }
        ));
    }
}
