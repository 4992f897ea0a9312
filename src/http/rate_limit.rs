//! Sliding-window request budget shared by every transport call.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// Counting state for the current window. Runtime-only, never persisted.
#[derive(Debug)]
struct RateWindow {
  window_start: Instant,
  requests_in_window: u32,
}

/// Gates requests so that no more than `quota` are issued per rolling window.
///
/// Bursts up to the quota are allowed rather than smoothed to a strict rate,
/// matching the "N requests per rolling window" contract of the Zendesk API.
/// `acquire` may suspend the caller for up to one full window; that is the
/// backpressure mechanism, not a bug. Share one limiter (via `Arc`) across
/// parallel fetches so the budget is global.
#[derive(Debug)]
pub struct RateLimiter {
  quota: u32,
  window: Duration,
  state: Mutex<RateWindow>,
}

impl RateLimiter {
  pub fn new(quota: u32, window: Duration) -> Self {
    Self {
      quota,
      window,
      state: Mutex::new(RateWindow {
        window_start: Instant::now(),
        requests_in_window: 0,
      }),
    }
  }

  /// Wait until it is safe to issue one more request, then record it.
  pub async fn acquire(&self) {
    loop {
      let wait = {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if now.duration_since(state.window_start) >= self.window {
          state.window_start = now;
          state.requests_in_window = 0;
        }

        if state.requests_in_window < self.quota {
          state.requests_in_window += 1;
          return;
        }

        // Quota spent; wait out the remainder of the window.
        self.window - now.duration_since(state.window_start)
      };

      warn!(wait_ms = wait.as_millis() as u64, "rate limit budget spent, waiting");
      tokio::time::sleep(wait).await;
    }
  }
}
