//! Zendesk API client wrapper.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, Credentials, Endpoints, Resource};
use crate::error::{Error, Result};
use crate::http::{RateLimiter, Transport};

use super::pagination::{collection_items, has_next_page, Paged};
use super::Record;

/// Client for the Zendesk REST API.
///
/// Every request goes through the shared rate limiter and then the retrying
/// transport; the paginator never bypasses either. Construction is explicit
/// (config + credentials), so multiple independently-configured clients can
/// coexist in one process.
#[derive(Clone)]
pub struct ZendeskClient {
  transport: Transport,
  limiter: Arc<RateLimiter>,
  endpoints: Endpoints,
  page_size: u32,
}

impl ZendeskClient {
  pub fn new(config: &Config, credentials: Credentials) -> Result<Self> {
    let transport = Transport::new(credentials, &config.request)?;
    let limiter = Arc::new(RateLimiter::new(
      config.request.rate_limit_quota,
      config.request.rate_limit_window(),
    ));
    let endpoints = Endpoints::new(config.zendesk.base_url()?);

    Ok(Self {
      transport,
      limiter,
      endpoints,
      page_size: config.request.page_size,
    })
  }

  /// One rate-limited GET returning the decoded body.
  async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
    self.limiter.acquire().await;
    self
      .transport
      .execute(Method::GET, url, Some(params), None)
      .await
  }

  /// Fetch all pages of a paginated endpoint.
  ///
  /// Follows `next_page` until exhausted, stopping early at `max_pages` when
  /// set (the result is then marked incomplete and must not be cached). A
  /// page answered with 429 is re-issued once after the transport has slept
  /// the server-directed wait; a second consecutive 429 propagates.
  pub async fn get_paginated(
    &self,
    url: &str,
    base_params: &[(String, String)],
    max_pages: Option<u32>,
  ) -> Result<Paged> {
    let mut records: Vec<Record> = Vec::new();
    let mut page: u32 = 1;

    loop {
      if let Some(max) = max_pages {
        if page > max {
          info!(total = records.len(), max_pages = max, "stopping at page bound, result is partial");
          return Ok(Paged { records, complete: false });
        }
      }

      let mut params = base_params.to_vec();
      params.push(("per_page".to_string(), self.page_size.to_string()));
      params.push(("page".to_string(), page.to_string()));

      let mut reissued = false;
      let body = loop {
        match self.get(url, &params).await {
          Ok(body) => break body,
          Err(Error::RateLimitExceeded { .. }) if !reissued => {
            reissued = true;
            warn!(page, "page hit the server rate limit, re-issuing once");
          }
          Err(err) => return Err(err),
        }
      };

      let items = match collection_items(&body) {
        Some(items) if !items.is_empty() => items,
        Some(_) => {
          debug!(page, "empty page, pagination exhausted");
          break;
        }
        None => {
          // Schema drift: terminal page with zero items, never an error.
          debug!(page, "no recognized collection key in page body");
          break;
        }
      };

      records.extend(items.iter().cloned());
      debug!(page, total = records.len(), "fetched page");

      if has_next_page(&body) {
        page += 1;
      } else {
        break;
      }
    }

    info!(total = records.len(), "paginated fetch complete");
    Ok(Paged { records, complete: true })
  }

  /// Verify connectivity and auth by fetching the current user.
  pub async fn test_connection(&self) -> bool {
    let url = match self.endpoints.url(Resource::Users, &[("user_id", "me")]) {
      Ok(url) => url,
      Err(err) => {
        warn!(%err, "could not build connection test URL");
        return false;
      }
    };

    match self.get(&url, &[]).await {
      Ok(body) => match body.get("user") {
        Some(user) => {
          info!(
            name = user.get("name").and_then(|v| v.as_str()).unwrap_or("unknown"),
            email = user.get("email").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "connected to Zendesk"
          );
          true
        }
        None => {
          warn!("connection test response carried no user object");
          false
        }
      },
      Err(err) => {
        warn!(%err, "connection test failed");
        false
      }
    }
  }

  /// Fetch all groups.
  pub async fn get_groups(&self) -> Result<Paged> {
    let url = self.endpoints.url(Resource::Groups, &[])?;
    self.get_paginated(&url, &[], None).await
  }

  /// Search tickets with the Search API, across all result pages.
  pub async fn search_tickets(
    &self,
    query: &str,
    sort_by: &str,
    sort_order: &str,
    max_pages: Option<u32>,
  ) -> Result<Paged> {
    let url = self.endpoints.url(Resource::Search, &[])?;
    let params = vec![
      ("query".to_string(), format!("type:ticket {}", query)),
      ("sort_by".to_string(), sort_by.to_string()),
      ("sort_order".to_string(), sort_order.to_string()),
    ];
    self.get_paginated(&url, &params, max_pages).await
  }

  /// Fetch one ticket with its users and groups sideloaded.
  pub async fn get_ticket(&self, ticket_id: u64) -> Result<Record> {
    let url = self
      .endpoints
      .url(Resource::Tickets, &[("ticket_id", &ticket_id.to_string())])?;
    let params = vec![("include".to_string(), "users,groups".to_string())];
    let body = self.get(&url, &params).await?;
    Ok(
      body
        .get("ticket")
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
    )
  }

  /// Fetch all comments for a ticket.
  pub async fn get_ticket_comments(&self, ticket_id: u64) -> Result<Vec<Record>> {
    let url = self
      .endpoints
      .url(Resource::TicketComments, &[("ticket_id", &ticket_id.to_string())])?;
    let body = self.get(&url, &[]).await?;
    Ok(
      body
        .get("comments")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default(),
    )
  }
}
