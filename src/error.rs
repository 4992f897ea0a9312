//! Error types for the Zendesk fetch pipeline.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the fetch pipeline.
///
/// Transport-level errors bubble unchanged through the paginator and the
/// fetcher so callers can decide whether a partial multi-group fetch should
/// continue. Cache errors are absorbed by the fetcher (caching is an
/// optimization, never a correctness requirement).
#[derive(Debug, Error)]
pub enum Error {
  /// Network-level failure or retryable HTTP status that persisted through
  /// all retry attempts.
  #[error("transport error after {attempts} attempt(s): {message}")]
  Transport { attempts: u32, message: String },

  /// The server answered 429. The transport has already slept the
  /// server-directed duration before surfacing this, so the caller may
  /// re-issue the request immediately.
  #[error("rate limit exceeded, server asked to retry after {}s", retry_after.as_secs())]
  RateLimitExceeded { retry_after: Duration },

  /// Non-2xx, non-429 response. Not transient, never retried.
  #[error("remote service returned HTTP {status}: {body}")]
  RemoteService { status: u16, body: String },

  /// Cache read/write failure. Degrades to cache-miss behavior upstream.
  #[error("cache error: {0}")]
  Cache(String),

  /// Missing/invalid credentials or malformed endpoint. Fatal at startup,
  /// before any network activity.
  #[error("config error: {0}")]
  Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_includes_status_and_body() {
    let err = Error::RemoteService {
      status: 403,
      body: "forbidden".to_string(),
    };
    let text = err.to_string();
    assert!(text.contains("403"));
    assert!(text.contains("forbidden"));
  }

  #[test]
  fn rate_limit_display_reports_seconds() {
    let err = Error::RateLimitExceeded {
      retry_after: Duration::from_secs(42),
    };
    assert!(err.to_string().contains("42"));
  }
}
