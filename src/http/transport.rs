//! Authenticated HTTP transport with retry and exponential backoff.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Credentials, RequestPolicy};
use crate::error::{Error, Result};

/// Fallback wait when a 429 response carries no Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Issues one logical HTTP call at a time against the Zendesk API.
///
/// Applies auth and default headers, enforces the configured timeout, and
/// retries transient failures (network errors, 5xx, 408) with exponential
/// backoff. Stateless apart from the shared connection pool.
#[derive(Clone)]
pub struct Transport {
  client: reqwest::Client,
  credentials: Credentials,
  max_retries: u32,
  backoff_base: Duration,
  backoff_cap: Duration,
}

impl Transport {
  pub fn new(credentials: Credentials, policy: &RequestPolicy) -> Result<Self> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
      .timeout(policy.timeout())
      .default_headers(headers)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self {
      client,
      credentials,
      max_retries: policy.max_retries,
      backoff_base: policy.backoff_base(),
      backoff_cap: policy.backoff_cap(),
    })
  }

  /// Execute a request and decode the JSON body of a successful response.
  ///
  /// Error mapping:
  /// - network failure / timeout / 5xx / 408: retried up to `max_retries`
  ///   times, then `Error::Transport`
  /// - 429: sleeps the server-supplied Retry-After, then surfaces
  ///   `Error::RateLimitExceeded` so the caller decides whether to re-issue
  /// - any other non-2xx: immediate `Error::RemoteService`
  pub async fn execute(
    &self,
    method: Method,
    url: &str,
    query: Option<&[(String, String)]>,
    body: Option<&Value>,
  ) -> Result<Value> {
    let mut attempt: u32 = 0;

    loop {
      let mut request = self
        .client
        .request(method.clone(), url)
        .basic_auth(self.credentials.username(), Some(&self.credentials.api_token));
      if let Some(query) = query {
        request = request.query(query);
      }
      if let Some(body) = body {
        request = request.json(body);
      }

      debug!(attempt = attempt + 1, %method, url, "sending request");

      match request.send().await {
        Ok(response) => {
          let status = response.status();
          debug!(attempt = attempt + 1, %method, url, %status, "received response");

          if status.is_success() {
            return response.json::<Value>().await.map_err(|e| Error::Transport {
              attempts: attempt + 1,
              message: format!("failed to decode response body: {}", e),
            });
          }

          if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after(response.headers());
            warn!(
              url,
              retry_after_secs = retry_after.as_secs(),
              "rate limited by server, waiting before surfacing"
            );
            tokio::time::sleep(retry_after).await;
            return Err(Error::RateLimitExceeded { retry_after });
          }

          if is_retryable_status(status) {
            if attempt < self.max_retries {
              self.sleep_with_backoff(attempt).await;
              attempt += 1;
              continue;
            }
            return Err(Error::Transport {
              attempts: attempt + 1,
              message: format!("HTTP {} from {}", status.as_u16(), url),
            });
          }

          let body = response.text().await.unwrap_or_default();
          return Err(Error::RemoteService {
            status: status.as_u16(),
            body,
          });
        }
        Err(err) => {
          debug!(attempt = attempt + 1, %method, url, error = %err, "request failed");

          if is_retryable_error(&err) && attempt < self.max_retries {
            self.sleep_with_backoff(attempt).await;
            attempt += 1;
            continue;
          }
          return Err(Error::Transport {
            attempts: attempt + 1,
            message: err.to_string(),
          });
        }
      }
    }
  }

  /// Delay before the retry following attempt number `attempt` (0-based):
  /// `backoff_base * 2^attempt`, capped.
  fn backoff_delay(&self, attempt: u32) -> Duration {
    let shift = attempt.min(16);
    let delay = self.backoff_base.saturating_mul(1u32 << shift);
    delay.min(self.backoff_cap)
  }

  async fn sleep_with_backoff(&self, attempt: u32) {
    let delay = self.backoff_delay(attempt);
    debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "backing off");
    tokio::time::sleep(delay).await;
  }
}

fn is_retryable_status(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
  err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_after(headers: &HeaderMap) -> Duration {
  headers
    .get(RETRY_AFTER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.parse::<u64>().ok())
    .map(Duration::from_secs)
    .unwrap_or(Duration::from_secs(DEFAULT_RETRY_AFTER_SECS))
}

#[cfg(test)]
mod tests {
  use wiremock::matchers::{header_exists, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;

  fn test_policy() -> RequestPolicy {
    RequestPolicy {
      max_retries: 3,
      backoff_base_ms: 5,
      backoff_cap_ms: 40,
      ..RequestPolicy::default()
    }
  }

  fn test_transport(policy: &RequestPolicy) -> Transport {
    Transport::new(Credentials::new("agent@example.com", "secret"), policy).unwrap()
  }

  #[tokio::test]
  async fn decodes_successful_json_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/ping"))
      .and(header_exists("authorization"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
      .expect(1)
      .mount(&server)
      .await;

    let transport = test_transport(&test_policy());
    let body = transport
      .execute(Method::GET, &format!("{}/ping", server.uri()), None, None)
      .await
      .unwrap();
    assert_eq!(body["ok"], true);
  }

  #[tokio::test]
  async fn server_errors_exhaust_exactly_max_retries_plus_one_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(503))
      .expect(4) // max_retries = 3, so 4 attempts total
      .mount(&server)
      .await;

    let transport = test_transport(&test_policy());
    let err = transport
      .execute(Method::GET, &server.uri(), None, None)
      .await
      .unwrap_err();

    match err {
      Error::Transport { attempts, .. } => assert_eq!(attempts, 4),
      other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
  }

  #[tokio::test]
  async fn request_timeout_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(408))
      .expect(4)
      .mount(&server)
      .await;

    let transport = test_transport(&test_policy());
    let err = transport
      .execute(Method::GET, &server.uri(), None, None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
  }

  #[tokio::test]
  async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(404).set_body_string("no such record"))
      .expect(1)
      .mount(&server)
      .await;

    let transport = test_transport(&test_policy());
    let err = transport
      .execute(Method::GET, &server.uri(), None, None)
      .await
      .unwrap_err();

    match err {
      Error::RemoteService { status, body } => {
        assert_eq!(status, 404);
        assert_eq!(body, "no such record");
      }
      other => panic!("expected remote service error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn too_many_requests_waits_then_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
      .expect(1)
      .mount(&server)
      .await;

    let transport = test_transport(&test_policy());
    let err = transport
      .execute(Method::GET, &server.uri(), None, None)
      .await
      .unwrap_err();

    match err {
      Error::RateLimitExceeded { retry_after } => {
        assert_eq!(retry_after, Duration::ZERO);
      }
      other => panic!("expected rate limit error, got {:?}", other),
    }
    // Surfaced on the first response, never silently retried.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn connection_refused_surfaces_as_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener); // release the port so connections are refused

    let policy = RequestPolicy {
      max_retries: 1,
      backoff_base_ms: 5,
      ..RequestPolicy::default()
    };
    let transport = test_transport(&policy);
    let err = transport
      .execute(Method::GET, &format!("http://{}", addr), None, None)
      .await
      .unwrap_err();

    assert!(matches!(err, Error::Transport { attempts: 2, .. }));
  }

  #[test]
  fn backoff_delays_are_non_decreasing_and_capped() {
    let policy = RequestPolicy {
      backoff_base_ms: 100,
      backoff_cap_ms: 1_000,
      ..RequestPolicy::default()
    };
    let transport = test_transport(&policy);

    let delays: Vec<Duration> = (0..8).map(|a| transport.backoff_delay(a)).collect();
    assert_eq!(delays[0], Duration::from_millis(100));
    assert_eq!(delays[1], Duration::from_millis(200));
    assert_eq!(delays[2], Duration::from_millis(400));
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    assert!(delays.iter().all(|d| *d <= Duration::from_millis(1_000)));
  }

  #[test]
  fn retry_after_header_parsing_falls_back_to_default() {
    let mut headers = HeaderMap::new();
    assert_eq!(retry_after(&headers), Duration::from_secs(60));

    headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
    assert_eq!(retry_after(&headers), Duration::from_secs(7));

    headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
    assert_eq!(retry_after(&headers), Duration::from_secs(60));
  }
}
