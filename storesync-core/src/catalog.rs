//! Category, package and store information listings, read through the cache.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::api::StoreApi;
use crate::cache::{CATEGORIES, INFORMATION, PACKAGE_SHORT_CODES, PACKAGES, TtlCache};
use crate::error::{ApiError, Result, SyncError};
use crate::host::Host;
use crate::models::{Category, Package, StoreInfo};
use crate::triage::{TriageReporter, metadata};

pub type ShortCodes = HashMap<String, Package>;

/// Which halves of a listing refresh landed in the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingRefresh {
  pub categories: bool,
  pub packages: bool,
}

impl ListingRefresh {
  pub fn is_complete(&self) -> bool {
    self.categories && self.packages
  }
}

/// Assigns `P1`, `P2`, ... to packages in ascending `order`.
///
/// The sort is stable, so packages sharing an order keep their listing order.
pub fn derive_short_codes(packages: &[Package]) -> ShortCodes {
  let mut sorted: Vec<&Package> = packages.iter().collect();
  sorted.sort_by_key(|package| package.order);
  sorted
    .into_iter()
    .enumerate()
    .map(|(rank, package)| (format!("P{}", rank + 1), package.clone()))
    .collect()
}

pub struct CatalogSync<A, H> {
  api: Arc<A>,
  cache: Arc<TtlCache>,
  triage: Arc<TriageReporter<A, H>>,
}

impl<A: StoreApi, H: Host> CatalogSync<A, H> {
  pub fn new(api: Arc<A>, cache: Arc<TtlCache>, triage: Arc<TriageReporter<A, H>>) -> Self {
    Self { api, cache, triage }
  }

  /// Fetch categories and packages concurrently, storing each as it arrives.
  ///
  /// A failed half leaves its cache entries untouched.
  pub async fn refresh_listings(&self) -> ListingRefresh {
    let (categories, packages) = tokio::join!(self.refresh_categories(), self.refresh_packages());
    let refresh = ListingRefresh {
      categories,
      packages,
    };
    if refresh.is_complete() {
      info!("store listings refreshed");
    }
    refresh
  }

  async fn refresh_categories(&self) -> bool {
    match self.api.get_listing().await {
      Ok(categories) => {
        debug!(count = categories.len(), "categories fetched");
        self.cache.set(CATEGORIES, categories).await;
        true
      }
      Err(err) => {
        log_fetch_error("categories", &err);
        false
      }
    }
  }

  async fn refresh_packages(&self) -> bool {
    match self.api.get_packages().await {
      Ok(packages) => {
        debug!(count = packages.len(), "packages fetched");
        let short_codes = derive_short_codes(&packages);
        self.cache.set(PACKAGES, packages).await;
        self.cache.set(PACKAGE_SHORT_CODES, short_codes).await;
        true
      }
      Err(err) => {
        log_fetch_error("packages", &err);
        false
      }
    }
  }

  /// Fetch store information into the cache.
  pub async fn refresh_information(&self) -> bool {
    match self.api.get_information().await {
      Ok(info) => {
        info!(store = %info.account.name, server = %info.server.name, "store information refreshed");
        self.cache.set(INFORMATION, info).await;
        true
      }
      Err(err) => {
        log_fetch_error("information", &err);
        false
      }
    }
  }

  /// Refresh whatever has gone stale. Used by the maintenance tick.
  pub async fn refresh_stale(&self) {
    if !self.cache.has_valid(INFORMATION).await {
      self.refresh_information().await;
    }
    if !self.cache.has_valid(CATEGORIES).await || !self.cache.has_valid(PACKAGES).await {
      self.refresh_listings().await;
    }
  }

  pub async fn get_categories(&self) -> Result<Arc<Vec<Category>>> {
    let valid = self.cache.has_valid(CATEGORIES).await;
    match self.load_categories(valid).await {
      Ok(categories) => Ok(categories),
      Err(err) => Err(self.report_fault(CATEGORIES, valid, err).await),
    }
  }

  async fn load_categories(&self, valid: bool) -> Result<Arc<Vec<Category>>> {
    if !valid {
      self.refresh_categories().await;
    }
    self
      .cache
      .get::<Vec<Category>>(CATEGORIES)
      .await?
      .ok_or(SyncError::MissingCacheEntry(CATEGORIES))
  }

  pub async fn get_packages(&self) -> Result<Arc<Vec<Package>>> {
    let valid = self.cache.has_valid(PACKAGES).await;
    match self.load_packages(valid).await {
      Ok(packages) => Ok(packages),
      Err(err) => Err(self.report_fault(PACKAGES, valid, err).await),
    }
  }

  async fn load_packages(&self, valid: bool) -> Result<Arc<Vec<Package>>> {
    if !valid {
      // Always through the full refresh so short codes stay in step
      self.refresh_listings().await;
    }
    self
      .cache
      .get::<Vec<Package>>(PACKAGES)
      .await?
      .ok_or(SyncError::MissingCacheEntry(PACKAGES))
  }

  pub async fn get_store_information(&self) -> Result<Arc<StoreInfo>> {
    let valid = self.cache.has_valid(INFORMATION).await;
    match self.load_information(valid).await {
      Ok(info) => Ok(info),
      Err(err) => Err(self.report_fault(INFORMATION, valid, err).await),
    }
  }

  async fn load_information(&self, valid: bool) -> Result<Arc<StoreInfo>> {
    if !valid {
      self.refresh_information().await;
    }
    self
      .cache
      .get::<StoreInfo>(INFORMATION)
      .await?
      .ok_or(SyncError::MissingCacheEntry(INFORMATION))
  }

  /// Resolve `token` as a short code, falling back to a package id.
  pub async fn get_package_by_short_code_or_id(&self, token: &str) -> Option<Package> {
    if let Ok(Some(codes)) = self.cache.get::<ShortCodes>(PACKAGE_SHORT_CODES).await {
      if let Some(package) = codes.get(token) {
        return Some(package.clone());
      }
    }

    let packages = self.cache.get::<Vec<Package>>(PACKAGES).await.ok()??;
    packages
      .iter()
      .find(|package| package.id.to_string() == token)
      .cloned()
  }

  /// Packages paired with their short codes, ordered `P1`, `P2`, ...
  pub async fn short_code_listing(&self) -> Result<Vec<(String, Package)>> {
    self.get_packages().await?;
    let codes = self
      .cache
      .get::<ShortCodes>(PACKAGE_SHORT_CODES)
      .await?
      .ok_or(SyncError::MissingCacheEntry(PACKAGE_SHORT_CODES))?;

    let mut listing: Vec<(String, Package)> = codes
      .iter()
      .map(|(code, package)| (code.clone(), package.clone()))
      .collect();
    listing.sort_by_key(|(code, _)| code[1..].parse::<usize>().unwrap_or(usize::MAX));
    Ok(listing)
  }

  async fn report_fault(&self, key: &'static str, cache_valid: bool, err: SyncError) -> SyncError {
    error!(key, cache_valid, error = %err, "failed to load catalog data");
    self
      .triage
      .report_error(
        &err,
        metadata([
          ("cache_key", key.to_string()),
          ("cache_valid", cache_valid.to_string()),
        ]),
      )
      .await;
    SyncError::Reported(err.to_string())
  }
}

fn log_fetch_error(what: &str, err: &ApiError) {
  match err {
    ApiError::Parse { message, .. } => {
      error!(what, %message, "failed to parse listing response, keeping cached copy")
    }
    other => error!(what, error = %other, "failed to fetch listing, keeping cached copy"),
  }
}
