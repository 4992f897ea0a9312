//! zdex: Zendesk ticket fetch client.
//!
//! Retrieves paginated resources from the Zendesk API under a per-minute
//! request budget, with retry/backoff on transient failures and a
//! file-backed cache of completed fetches keyed by query signature.
//!
//! The pipeline is layered one direction:
//! fetcher → cache → paginating client → rate limiter → transport → Zendesk.
//! Records come back as opaque JSON values; interpreting or formatting them
//! is left to callers.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod zendesk;

pub use cache::CacheStore;
pub use config::{Config, Credentials};
pub use error::{Error, Result};
pub use fetcher::TicketFetcher;
pub use zendesk::{Record, TicketFilters, TicketQuery, ZendeskClient};
