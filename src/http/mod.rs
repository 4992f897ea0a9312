//! HTTP plumbing: authenticated transport with retry/backoff, and the
//! sliding-window rate limiter that gates every call to it.

mod rate_limit;
mod transport;

pub use rate_limit::RateLimiter;
pub use transport::Transport;
