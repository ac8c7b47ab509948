//! Send policy for opponent requests.
//!
//! A round is waiting on every call, so the default is one attempt: any error
//! status or transport failure goes straight back to the caller, which answers
//! locally. Callers may opt into a few quick retries; those cover transport
//! failures, 408 and 5xx only. Rate limits (429) are never retried and
//! server-requested delays are not honored.
//!
//! Every attempt carries `X-Retry-Count` and the same `Idempotency-Key`.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial request.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Upper bound on each attempt.
    pub timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_millis(250),
            timeout: Duration::from_secs(30),
        }
    }
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 500..=599)
}

#[must_use]
pub fn generate_idempotency_key() -> String {
    format!("duel-{}", Uuid::new_v4())
}

/// Result of a send. An error response is never reported as success.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Final non-2xx response.
    HttpError(Response),
    /// Transport failure on the last attempt made.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
}

/// Send the request built by `build_request`, retrying per `config`.
///
/// `build_request` is called once per attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let idempotency_key = generate_idempotency_key();
    let mut attempt = 0;

    loop {
        let request = build_request()
            .header("X-Retry-Count", attempt.to_string())
            .header("Idempotency-Key", &idempotency_key)
            .timeout(config.timeout);
        let can_retry = attempt < config.max_retries;

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) => {
                if !can_retry || !should_retry(response.status()) {
                    return RetryOutcome::HttpError(response);
                }
                tracing::debug!(status = %response.status(), attempt, "Retrying opponent request");
            }
            Err(source) => {
                let transient = source.is_connect() || source.is_timeout() || source.is_request();
                if !can_retry || !transient {
                    return RetryOutcome::ConnectionError {
                        attempts: attempt + 1,
                        source,
                    };
                }
                tracing::debug!(error = %source, attempt, "Retrying opponent request");
            }
        }

        tokio::time::sleep(config.delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryConfig, RetryOutcome, send_with_retry, should_retry};
    use reqwest::StatusCode;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            delay: Duration::from_millis(1),
            ..RetryConfig::default()
        }
    }

    #[test]
    fn only_timeouts_and_server_errors_are_retryable() {
        for status in [408, 500, 502, 503, 529] {
            assert!(should_retry(StatusCode::from_u16(status).unwrap()), "{status}");
        }
        for status in [400, 401, 403, 404, 409, 429] {
            assert!(!should_retry(StatusCode::from_u16(status).unwrap()), "{status}");
        }
    }

    #[tokio::test]
    async fn default_policy_makes_a_single_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/answer"))
            .respond_with(ResponseTemplate::new(503).insert_header("retry-after", "30"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/answer", server.uri());
        let started = Instant::now();
        let outcome = send_with_retry(|| client.post(&url), &RetryConfig::default()).await;

        assert!(matches!(outcome, RetryOutcome::HttpError(ref r) if r.status() == StatusCode::SERVICE_UNAVAILABLE));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn rate_limits_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/answer"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/answer", server.uri());
        let outcome = send_with_retry(|| client.post(&url), &quick(3)).await;
        assert!(matches!(outcome, RetryOutcome::HttpError(ref r) if r.status() == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn opted_in_retries_share_one_idempotency_key() {
        let server = MockServer::start().await;
        let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);

        Mock::given(method("POST"))
            .and(path("/answer"))
            .respond_with(move |req: &wiremock::Request| {
                let header = |name: &str| {
                    req.headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                let mut log = recorder.lock().unwrap();
                log.push((header("Idempotency-Key"), header("X-Retry-Count")));
                if log.len() < 2 {
                    ResponseTemplate::new(500)
                } else {
                    ResponseTemplate::new(200).set_body_string("ok")
                }
            })
            .expect(2)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/answer", server.uri());
        let outcome = send_with_retry(|| client.post(&url), &quick(2)).await;

        match outcome {
            RetryOutcome::Success(response) => assert_eq!(response.text().await.unwrap(), "ok"),
            other => panic!("expected Success, got {other:?}"),
        }
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].0, seen[1].0);
        assert!(seen[0].0.starts_with("duel-"));
        assert_eq!([seen[0].1.as_str(), seen[1].1.as_str()], ["0", "1"]);
    }

    #[tokio::test]
    async fn unreachable_host_reports_attempts() {
        // Port 9 on loopback refuses connections.
        let client = reqwest::Client::new();
        let outcome = send_with_retry(|| client.post("http://127.0.0.1:9/answer"), &quick(1)).await;
        assert!(matches!(outcome, RetryOutcome::ConnectionError { attempts: 2, .. }));
    }
}
