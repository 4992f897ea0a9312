use std::path::PathBuf;

use chrono::{Days, Utc};
use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use zdex::cache::CacheStore;
use zdex::config::{Config, Credentials};
use zdex::fetcher::TicketFetcher;
use zdex::zendesk::{TicketFilters, ZendeskClient};

#[derive(Parser, Debug)]
#[command(name = "zdex")]
#[command(about = "Fetch Zendesk tickets per group, with caching and rate limiting")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/zdex/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Group ID to fetch tickets from
  #[arg(short, long)]
  group_id: Option<String>,

  /// Fetch tickets from all groups
  #[arg(long)]
  all_groups: bool,

  /// Ticket status filter (open, pending, solved, closed)
  #[arg(long)]
  status: Option<String>,

  /// Only fetch tickets created in the last N days
  #[arg(long)]
  days_back: Option<u64>,

  /// Use cached ticket data if available
  #[arg(long)]
  use_cache: bool,

  /// Clear all cached data and exit
  #[arg(long)]
  clear_cache: bool,

  /// List all available groups and exit
  #[arg(long)]
  list_groups: bool,

  /// Test connection and list groups without fetching tickets
  #[arg(long)]
  dry_run: bool,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let default_level = if args.verbose { "debug" } else { "info" };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    )
    .with_writer(std::io::stderr)
    .init();

  let config = Config::load(args.config.as_deref())?;
  let store = CacheStore::open(&config.cache)?;

  if args.clear_cache {
    let removed = store.clear()?;
    println!("cleared {} cache entries", removed);
    return Ok(());
  }

  let credentials = Credentials::new(config.zendesk.email.clone(), Config::api_token()?);
  let client = ZendeskClient::new(&config, credentials)?;

  if args.list_groups || args.dry_run {
    if args.dry_run && !client.test_connection().await {
      return Err(eyre!("connection test failed"));
    }
    let groups = client.get_groups().await?;
    for group in &groups.records {
      println!(
        "{}\t{}",
        group.get("id").map(|v| v.to_string()).unwrap_or_default(),
        group.get("name").and_then(|v| v.as_str()).unwrap_or("unknown")
      );
    }
    return Ok(());
  }

  let filters = TicketFilters {
    status: args.status.filter(|s| s != "all"),
    created_after: args
      .days_back
      .and_then(|days| Utc::now().date_naive().checked_sub_days(Days::new(days))),
    created_before: None,
  };

  let fetcher = TicketFetcher::new(client, store);

  if args.all_groups {
    let all_tickets = fetcher.fetch_for_all_groups(&filters, args.use_cache).await?;
    println!("{}", serde_json::to_string_pretty(&all_tickets)?);
    return Ok(());
  }

  let group_id = args
    .group_id
    .or_else(|| config.zendesk.default_group_id.clone())
    .ok_or_else(|| eyre!("pass --group-id, --all-groups, or set zendesk.default_group_id"))?;

  let tickets = fetcher.fetch_for_group(&group_id, &filters, args.use_cache).await?;
  println!("{}", serde_json::to_string_pretty(&tickets)?);

  Ok(())
}
