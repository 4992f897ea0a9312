//! Ticket search filters and the cache keys derived from them.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// Optional filters narrowing a ticket search.
#[derive(Debug, Clone, Default)]
pub struct TicketFilters {
  /// Ticket status (open, pending, solved, closed); None means all
  pub status: Option<String>,
  pub created_after: Option<NaiveDate>,
  pub created_before: Option<NaiveDate>,
}

/// A fully-specified ticket query for one group.
///
/// The cache key is derived from exactly these fields, so identical queries
/// map to identical keys and distinct filters never collide.
#[derive(Debug, Clone)]
pub struct TicketQuery {
  pub group_id: String,
  pub filters: TicketFilters,
}

impl TicketQuery {
  pub fn new(group_id: impl Into<String>, filters: TicketFilters) -> Self {
    Self {
      group_id: group_id.into(),
      filters,
    }
  }

  /// Build the Zendesk search string, e.g.
  /// `group_id:123 status:open created>=2026-01-01`.
  pub fn search_string(&self) -> String {
    let mut parts = vec![format!("group_id:{}", self.group_id)];

    if let Some(status) = &self.filters.status {
      parts.push(format!("status:{}", status));
    }
    if let Some(after) = self.filters.created_after {
      parts.push(format!("created>={}", after.format("%Y-%m-%d")));
    }
    if let Some(before) = self.filters.created_before {
      parts.push(format!("created<={}", before.format("%Y-%m-%d")));
    }

    parts.join(" ")
  }

  /// Human-readable form of the query, for logs.
  pub fn description(&self) -> String {
    format!(
      "tickets|group:{}|status:{}|after:{}|before:{}",
      self.group_id,
      self.filters.status.as_deref().unwrap_or("-"),
      self
        .filters
        .created_after
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string()),
      self
        .filters
        .created_before
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string()),
    )
  }

  /// Deterministic cache key: hex SHA-256 over the query fields.
  ///
  /// Each field is hashed length-prefixed, with a distinct marker for unset
  /// filters, so no field value can forge another query's key (a group id
  /// containing a separator, or a status spelled like the unset placeholder,
  /// still hashes apart). Fixed-length and filesystem-safe, so the key
  /// doubles as the entry file stem.
  pub fn cache_key(&self) -> String {
    let after = self.filters.created_after.map(|d| d.to_string());
    let before = self.filters.created_before.map(|d| d.to_string());
    let fields = [
      Some(self.group_id.as_str()),
      self.filters.status.as_deref(),
      after.as_deref(),
      before.as_deref(),
    ];

    let mut hasher = Sha256::new();
    for field in fields {
      match field {
        Some(value) => {
          hasher.update((value.len() as u64).to_be_bytes());
          hasher.update(value.as_bytes());
        }
        None => hasher.update(u64::MAX.to_be_bytes()),
      }
    }
    hex::encode(hasher.finalize())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
  }

  #[test]
  fn search_string_includes_only_set_filters() {
    let query = TicketQuery::new("77", TicketFilters::default());
    assert_eq!(query.search_string(), "group_id:77");

    let query = TicketQuery::new(
      "77",
      TicketFilters {
        status: Some("open".to_string()),
        created_after: Some(date("2026-01-15")),
        created_before: Some(date("2026-02-15")),
      },
    );
    assert_eq!(
      query.search_string(),
      "group_id:77 status:open created>=2026-01-15 created<=2026-02-15"
    );
  }

  #[test]
  fn identical_queries_share_a_cache_key() {
    let a = TicketQuery::new("5", TicketFilters { status: Some("open".into()), ..Default::default() });
    let b = TicketQuery::new("5", TicketFilters { status: Some("open".into()), ..Default::default() });
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn distinct_filters_never_collide() {
    let base = TicketQuery::new("5", TicketFilters::default());
    let by_status = TicketQuery::new(
      "5",
      TicketFilters { status: Some("solved".into()), ..Default::default() },
    );
    let by_date = TicketQuery::new(
      "5",
      TicketFilters { created_after: Some(date("2026-01-01")), ..Default::default() },
    );
    let other_group = TicketQuery::new("6", TicketFilters::default());

    let keys = [base.cache_key(), by_status.cache_key(), by_date.cache_key(), other_group.cache_key()];
    for (i, key) in keys.iter().enumerate() {
      for other in &keys[i + 1..] {
        assert_ne!(key, other);
      }
    }
  }

  #[test]
  fn field_values_cannot_forge_another_key() {
    // A status spelled like the unset placeholder is still a distinct query.
    let unset = TicketQuery::new("5", TicketFilters::default());
    let dash = TicketQuery::new(
      "5",
      TicketFilters { status: Some("-".into()), ..Default::default() },
    );
    assert_ne!(unset.cache_key(), dash.cache_key());

    // A group id smuggling a filter-shaped suffix does not collide with the
    // query that sets the filter properly.
    let smuggled = TicketQuery::new("5|status:open", TicketFilters::default());
    let proper = TicketQuery::new(
      "5",
      TicketFilters { status: Some("open".into()), ..Default::default() },
    );
    assert_ne!(smuggled.cache_key(), proper.cache_key());
  }

  #[test]
  fn cache_key_is_hex_sha256() {
    let key = TicketQuery::new("1", TicketFilters::default()).cache_key();
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
  }
}
