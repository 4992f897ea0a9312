//! Short-lived local cache for completed fetches.
//!
//! One JSON entry file per distinct query signature, with a freshness TTL.
//! Persists across process restarts; corrupt or unreadable entries degrade
//! to a miss rather than a hard failure.

mod store;

pub use store::CacheStore;
