//! Queue synchronisation and caching engine for store command delivery.
//!
//! The engine polls a remote store backend for due commands, executes them on
//! a game host, acknowledges what ran, and keeps catalog data in a TTL cache.
//! Transport and host integration are supplied through [`StoreApi`] and
//! [`Host`].

pub mod api;
pub mod cache;
pub mod catalog;
mod error;
pub mod flush;
pub mod host;
pub mod joins;
mod models;
pub mod queue;
pub mod storefront;
pub mod triage;

pub use api::{ApiResult, StoreApi};
pub use cache::{CacheError, TtlCache};
pub use catalog::{CatalogSync, ListingRefresh};
pub use error::{ApiError, HostError, Result, SyncError, error_trace};
pub use flush::{ExecutedCommands, Flusher};
pub use host::Host;
pub use joins::JoinBatcher;
pub use models::{
  Account, BanRequest, Category, CategoryRef, CheckoutUrl, Command, CommandConditions, Currency,
  JoinEvent, OfflineCommands, OfflineMeta, OnlineCommands, Package, PlayerInfo, QueueMeta,
  QueueSummary, ServerInfo, StoreInfo, TriageEvent, UserLookup, UserPlayer,
};
pub use queue::{CycleOutcome, QueueProcessor};
pub use storefront::Storefront;
pub use triage::TriageReporter;

use std::sync::Arc;
use std::time::Duration;

/// Options the engine honours.
#[derive(Debug, Clone)]
pub struct SyncSettings {
  /// Log expanded commands and response bodies.
  pub debug_mode: bool,
  /// Gate for every triage transmission.
  pub auto_reporting_enabled: bool,
  /// Lifetime applied to every cache write.
  pub cache_lifetime: Duration,
  /// Diagnostics endpoint; empty disables triage.
  pub triage_url: String,
}

impl Default for SyncSettings {
  fn default() -> Self {
    Self {
      debug_mode: false,
      auto_reporting_enabled: true,
      cache_lifetime: Duration::from_secs(30 * 60),
      triage_url: String::new(),
    }
  }
}

/// All engine services, wired to one store backend and one host.
///
/// Owns the process-lifetime state: cache, executed-command list, join queue
/// and rate limiter.
pub struct StoreSync<A, H> {
  pub api: Arc<A>,
  pub host: Arc<H>,
  pub cache: Arc<TtlCache>,
  pub executed: Arc<ExecutedCommands>,
  pub triage: Arc<TriageReporter<A, H>>,
  pub catalog: Arc<CatalogSync<A, H>>,
  pub joins: JoinBatcher<A, H>,
  pub queue: QueueProcessor<A, H>,
  pub flusher: Flusher<A, H>,
  pub storefront: Storefront<A, H>,
}

impl<A: StoreApi, H: Host> StoreSync<A, H> {
  pub fn new(api: Arc<A>, host: Arc<H>, settings: &SyncSettings) -> Self {
    let cache = Arc::new(TtlCache::new(settings.cache_lifetime));
    let executed = Arc::new(ExecutedCommands::new());
    let triage = Arc::new(TriageReporter::new(
      api.clone(),
      host.clone(),
      cache.clone(),
      settings,
    ));
    let catalog = Arc::new(CatalogSync::new(api.clone(), cache.clone(), triage.clone()));

    Self {
      joins: JoinBatcher::new(api.clone(), triage.clone()),
      queue: QueueProcessor::new(
        api.clone(),
        host.clone(),
        executed.clone(),
        triage.clone(),
        settings,
      ),
      flusher: Flusher::new(api.clone(), executed.clone(), triage.clone()),
      storefront: Storefront::new(api.clone(), host.clone(), catalog.clone(), triage.clone()),
      api,
      host,
      cache,
      executed,
      triage,
      catalog,
    }
  }

  /// Maintenance tick: acknowledge executed commands, ship join events and
  /// refresh stale catalog data.
  pub async fn maintain(&self) {
    self.flusher.flush_executed_commands().await;
    self.joins.process_join_queue().await;
    self.catalog.refresh_stale().await;
  }
}
