//! Zendesk API client: endpoint operations and pagination.

mod client;
mod pagination;
mod query;

pub use client::ZendeskClient;
pub use pagination::{collection_items, has_next_page, Paged};
pub use query::{TicketFilters, TicketQuery};

/// One decoded response item, passed through without interpretation of its
/// internal fields.
pub type Record = serde_json::Value;
