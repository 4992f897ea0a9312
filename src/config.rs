use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Zendesk Search API caps `per_page` at 100.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub zendesk: ZendeskConfig,
  #[serde(default)]
  pub request: RequestPolicy,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ZendeskConfig {
  /// Zendesk subdomain, e.g. "acme" for acme.zendesk.com
  pub subdomain: Option<String>,
  /// Full API base URL override (takes precedence over `subdomain`).
  /// Useful for custom domains and for pointing tests at a local server.
  pub url: Option<String>,
  /// Account email used for API token authentication
  pub email: String,
  /// Group to fetch from when none is given on the command line
  pub default_group_id: Option<String>,
}

impl ZendeskConfig {
  /// Resolve the API base URL, without a trailing slash.
  pub fn base_url(&self) -> Result<String> {
    if let Some(url) = &self.url {
      return Ok(url.trim_end_matches('/').to_string());
    }
    match &self.subdomain {
      Some(subdomain) if !subdomain.is_empty() => {
        Ok(format!("https://{}.zendesk.com/api/v2", subdomain))
      }
      _ => Err(Error::Config(
        "either zendesk.url or zendesk.subdomain must be set".to_string(),
      )),
    }
  }
}

/// Timeout, retry, pagination and rate-limit budget for one client.
///
/// Defaults match the Zendesk Essential plan limits (700 requests/minute).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestPolicy {
  pub timeout_secs: u64,
  /// Retries after the initial attempt, so `max_retries + 1` attempts total.
  pub max_retries: u32,
  pub backoff_base_ms: u64,
  pub backoff_cap_ms: u64,
  pub page_size: u32,
  pub rate_limit_quota: u32,
  pub rate_limit_window_secs: u64,
}

impl Default for RequestPolicy {
  fn default() -> Self {
    Self {
      timeout_secs: 30,
      max_retries: 3,
      backoff_base_ms: 1_000,
      backoff_cap_ms: 10_000,
      page_size: MAX_PAGE_SIZE,
      rate_limit_quota: 700,
      rate_limit_window_secs: 60,
    }
  }
}

impl RequestPolicy {
  pub fn validate(&self) -> Result<()> {
    if self.timeout_secs == 0 {
      return Err(Error::Config("request.timeout_secs must be positive".into()));
    }
    if self.max_retries == 0 {
      return Err(Error::Config("request.max_retries must be positive".into()));
    }
    if self.backoff_base_ms == 0 {
      return Err(Error::Config("request.backoff_base_ms must be positive".into()));
    }
    if self.backoff_cap_ms == 0 {
      return Err(Error::Config("request.backoff_cap_ms must be positive".into()));
    }
    if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
      return Err(Error::Config(format!(
        "request.page_size must be in 1..={}",
        MAX_PAGE_SIZE
      )));
    }
    if self.rate_limit_quota == 0 {
      return Err(Error::Config("request.rate_limit_quota must be positive".into()));
    }
    if self.rate_limit_window_secs == 0 {
      return Err(Error::Config(
        "request.rate_limit_window_secs must be positive".into(),
      ));
    }
    Ok(())
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn backoff_base(&self) -> Duration {
    Duration::from_millis(self.backoff_base_ms)
  }

  pub fn backoff_cap(&self) -> Duration {
    Duration::from_millis(self.backoff_cap_ms)
  }

  pub fn rate_limit_window(&self) -> Duration {
    Duration::from_secs(self.rate_limit_window_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Cache directory (default: $XDG_CACHE_HOME/zdex)
  pub dir: Option<PathBuf>,
  /// Freshness TTL; entries older than this are treated as absent
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      dir: None,
      ttl_secs: 3_600,
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

/// API token credentials. Immutable after load.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub email: String,
  pub api_token: String,
}

impl Credentials {
  pub fn new(email: impl Into<String>, api_token: impl Into<String>) -> Self {
    Self {
      email: email.into(),
      api_token: api_token.into(),
    }
  }

  /// Basic-auth username for Zendesk API token auth.
  pub fn username(&self) -> String {
    format!("{}/token", self.email)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./zdex.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/zdex/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Config(format!("config file not found: {}", p.display())));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(Error::Config(
        "no configuration file found; create one at ~/.config/zdex/config.yaml".to_string(),
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("zdex.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("zdex").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("failed to read config file {}: {}", path.display(), e)))?;
    Self::parse(&contents)
  }

  /// Parse and validate a YAML configuration document.
  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)
      .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.zendesk.email.is_empty() {
      return Err(Error::Config("zendesk.email must be set".into()));
    }
    let base = self.zendesk.base_url()?;
    url::Url::parse(&base)
      .map_err(|e| Error::Config(format!("invalid API base URL {}: {}", base, e)))?;
    self.request.validate()?;
    Ok(())
  }

  /// Get the Zendesk API token from environment variables.
  ///
  /// Checks ZDEX_API_TOKEN first, then ZENDESK_API_TOKEN as fallback.
  pub fn api_token() -> Result<String> {
    std::env::var("ZDEX_API_TOKEN")
      .or_else(|_| std::env::var("ZENDESK_API_TOKEN"))
      .map_err(|_| {
        Error::Config(
          "Zendesk API token not found; set ZDEX_API_TOKEN or ZENDESK_API_TOKEN".to_string(),
        )
      })
  }
}

/// Logical API resources exposed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  Tickets,
  Search,
  Groups,
  Users,
  TicketComments,
}

/// Maps logical resources to URL templates under one API base.
#[derive(Debug, Clone)]
pub struct Endpoints {
  base_url: String,
}

impl Endpoints {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
    }
  }

  fn template(&self, resource: Resource) -> String {
    let suffix = match resource {
      Resource::Tickets => "tickets/{ticket_id}.json",
      Resource::Search => "search.json",
      Resource::Groups => "groups.json",
      Resource::Users => "users/{user_id}.json",
      Resource::TicketComments => "tickets/{ticket_id}/comments.json",
    };
    format!("{}/{}", self.base_url, suffix)
  }

  /// Render the URL for a resource, substituting named placeholders.
  ///
  /// Fails if the template references a placeholder the caller did not supply.
  pub fn url(&self, resource: Resource, params: &[(&str, &str)]) -> Result<String> {
    render_template(&self.template(resource), params)
  }
}

fn render_template(template: &str, params: &[(&str, &str)]) -> Result<String> {
  let mut rendered = template.to_string();
  for (name, value) in params {
    rendered = rendered.replace(&format!("{{{}}}", name), value);
  }
  if let Some(start) = rendered.find('{') {
    let end = rendered[start..]
      .find('}')
      .map(|i| start + i + 1)
      .unwrap_or(rendered.len());
    return Err(Error::Config(format!(
      "unresolved placeholder {} in endpoint template {}",
      &rendered[start..end],
      template
    )));
  }
  Ok(rendered)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn minimal_yaml() -> &'static str {
    "zendesk:\n  subdomain: acme\n  email: agent@example.com\n"
  }

  #[test]
  fn parse_applies_policy_defaults() {
    let config = Config::parse(minimal_yaml()).unwrap();
    assert_eq!(config.request.page_size, 100);
    assert_eq!(config.request.max_retries, 3);
    assert_eq!(config.request.rate_limit_quota, 700);
    assert_eq!(config.cache.ttl_secs, 3_600);
  }

  #[test]
  fn base_url_from_subdomain() {
    let config = Config::parse(minimal_yaml()).unwrap();
    assert_eq!(
      config.zendesk.base_url().unwrap(),
      "https://acme.zendesk.com/api/v2"
    );
  }

  #[test]
  fn url_override_wins_over_subdomain() {
    let yaml = "zendesk:\n  subdomain: acme\n  url: http://localhost:8080/api/v2/\n  email: a@b.c\n";
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.zendesk.base_url().unwrap(), "http://localhost:8080/api/v2");
  }

  #[test]
  fn missing_tenant_is_a_config_error() {
    let yaml = "zendesk:\n  email: a@b.c\n";
    assert!(matches!(Config::parse(yaml), Err(Error::Config(_))));
  }

  #[test]
  fn oversized_page_size_is_rejected() {
    let yaml = "zendesk:\n  subdomain: acme\n  email: a@b.c\nrequest:\n  page_size: 500\n";
    assert!(matches!(Config::parse(yaml), Err(Error::Config(_))));
  }

  #[test]
  fn zero_max_retries_is_rejected() {
    let yaml = "zendesk:\n  subdomain: acme\n  email: a@b.c\nrequest:\n  max_retries: 0\n";
    assert!(matches!(Config::parse(yaml), Err(Error::Config(_))));
  }

  #[test]
  fn zero_backoff_cap_is_rejected() {
    let yaml = "zendesk:\n  subdomain: acme\n  email: a@b.c\nrequest:\n  backoff_cap_ms: 0\n";
    assert!(matches!(Config::parse(yaml), Err(Error::Config(_))));
  }

  #[test]
  fn zero_rate_limit_window_is_rejected() {
    let yaml =
      "zendesk:\n  subdomain: acme\n  email: a@b.c\nrequest:\n  rate_limit_window_secs: 0\n";
    assert!(matches!(Config::parse(yaml), Err(Error::Config(_))));
  }

  #[test]
  fn credentials_username_uses_token_suffix() {
    let credentials = Credentials::new("agent@example.com", "secret");
    assert_eq!(credentials.username(), "agent@example.com/token");
  }

  #[test]
  fn endpoint_placeholders_are_substituted() {
    let endpoints = Endpoints::new("https://acme.zendesk.com/api/v2");
    let url = endpoints
      .url(Resource::TicketComments, &[("ticket_id", "42")])
      .unwrap();
    assert_eq!(url, "https://acme.zendesk.com/api/v2/tickets/42/comments.json");
  }

  #[test]
  fn unresolved_placeholder_fails_construction() {
    let endpoints = Endpoints::new("https://acme.zendesk.com/api/v2");
    let err = endpoints.url(Resource::TicketComments, &[]).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("{ticket_id}"));
  }

  #[test]
  fn plain_endpoints_need_no_params() {
    let endpoints = Endpoints::new("https://acme.zendesk.com/api/v2");
    assert_eq!(
      endpoints.url(Resource::Search, &[]).unwrap(),
      "https://acme.zendesk.com/api/v2/search.json"
    );
    assert_eq!(
      endpoints.url(Resource::Groups, &[]).unwrap(),
      "https://acme.zendesk.com/api/v2/groups.json"
    );
  }
}
