//! Orchestrates cache lookups and paginated fetches per group.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::cache::CacheStore;
use crate::error::Result;
use crate::zendesk::{Record, TicketFilters, TicketQuery, ZendeskClient};

/// Default sort for ticket searches (newest first).
const SORT_BY: &str = "created_at";
const SORT_ORDER: &str = "desc";

/// Answers "give me all tickets for group G matching filters F", optionally
/// across all groups, consulting the cache before touching the network.
pub struct TicketFetcher {
  client: ZendeskClient,
  store: CacheStore,
  max_pages: Option<u32>,
}

impl TicketFetcher {
  pub fn new(client: ZendeskClient, store: CacheStore) -> Self {
    Self {
      client,
      store,
      max_pages: None,
    }
  }

  /// Bound every search to at most this many pages. Bounded fetches may be
  /// partial, and partial results are never cached.
  pub fn with_max_pages(mut self, max_pages: u32) -> Self {
    self.max_pages = Some(max_pages);
    self
  }

  /// Fetch all tickets for one group.
  ///
  /// With `use_cache` set, a fresh cache entry answers the call with zero
  /// network activity. On a miss the full paginated result is fetched and
  /// written back; cache write failures are logged and absorbed, since
  /// caching is an optimization.
  pub async fn fetch_for_group(
    &self,
    group_id: &str,
    filters: &TicketFilters,
    use_cache: bool,
  ) -> Result<Vec<Record>> {
    let query = TicketQuery::new(group_id, filters.clone());
    let key = query.cache_key();

    if use_cache {
      if let Some(records) = self.store.get(&key) {
        info!(query = %query.description(), count = records.len(), "loaded tickets from cache");
        return Ok(records);
      }
    }

    info!(group = group_id, query = %query.search_string(), "searching tickets");
    let paged = self
      .client
      .search_tickets(&query.search_string(), SORT_BY, SORT_ORDER, self.max_pages)
      .await?;
    info!(group = group_id, count = paged.records.len(), "search finished");

    // Only complete result sets are cached; a page-bounded partial fetch
    // must not be replayed as if it were the full answer.
    if paged.complete {
      if let Err(err) = self.store.put(&key, &paged.records) {
        warn!(%err, "failed to write cache entry");
      }
    }

    Ok(paged.records)
  }

  /// Fetch tickets for every group, keyed by group id.
  ///
  /// Groups yielding zero tickets are omitted. One group's failure is
  /// reported and skipped; sibling groups still complete.
  pub async fn fetch_for_all_groups(
    &self,
    filters: &TicketFilters,
    use_cache: bool,
  ) -> Result<BTreeMap<String, Vec<Record>>> {
    let groups = self.client.get_groups().await?.records;
    info!(count = groups.len(), "resolved groups");

    let mut all_tickets = BTreeMap::new();
    for group in &groups {
      let group_id = match group.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(id) if !id.is_null() => id.to_string(),
        _ => {
          warn!("group record without an id, skipping");
          continue;
        }
      };

      match self.fetch_for_group(&group_id, filters, use_cache).await {
        Ok(records) if records.is_empty() => {}
        Ok(records) => {
          all_tickets.insert(group_id, records);
        }
        Err(err) => {
          error!(group = %group_id, %err, "failed to fetch tickets for group");
        }
      }
    }

    Ok(all_tickets)
  }

  /// Remove every cache entry; returns how many were removed.
  pub fn clear_cache(&self) -> Result<usize> {
    self.store.clear()
  }
}
