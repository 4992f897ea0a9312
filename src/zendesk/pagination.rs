//! Pure helpers for walking paginated Zendesk responses.

use serde_json::Value;

use super::Record;

/// Collection keys known to hold the item sequence, checked in order.
///
/// Response shapes vary by resource: search results nest under `results`,
/// a groups listing under `groups`, and so on. The first matching key wins;
/// a body matching none of them is treated as a terminal page with zero
/// items (schema drift must not abort a fetch).
const COLLECTION_KEYS: &[&str] = &["results", "tickets", "users", "groups", "comments"];

/// Extract the item sequence from a page body, if any recognized key holds one.
pub fn collection_items(body: &Value) -> Option<&Vec<Value>> {
  COLLECTION_KEYS
    .iter()
    .find_map(|key| body.get(*key).and_then(Value::as_array))
}

/// Whether the page indicates a following page (`next_page` present and
/// non-null).
pub fn has_next_page(body: &Value) -> bool {
  body.get("next_page").map(|v| !v.is_null()).unwrap_or(false)
}

/// Result of a paginated fetch.
#[derive(Debug, Clone)]
pub struct Paged {
  /// All items across fetched pages, in the order the service returned them.
  pub records: Vec<Record>,
  /// False when a max-page bound stopped the fetch early. Partial results
  /// must never be written to the cache.
  pub complete: bool,
}
