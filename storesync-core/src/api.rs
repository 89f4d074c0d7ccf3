//! Capabilities the core needs from the store backend transport.

use std::future::Future;

use crate::error::ApiError;
use crate::models::{
  BanRequest, Category, CheckoutUrl, JoinEvent, OfflineCommands, OnlineCommands, Package,
  QueueSummary, StoreInfo, TriageEvent, UserLookup,
};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Remote store backend.
///
/// Every call resolves to success, an error payload ([`ApiError::Api`]), an
/// unexpected response ([`ApiError::Server`], [`ApiError::Transport`]) or an
/// undecodable body ([`ApiError::Parse`]).
pub trait StoreApi: Send + Sync + 'static {
  fn get_information(&self) -> impl Future<Output = ApiResult<StoreInfo>> + Send;

  fn get_listing(&self) -> impl Future<Output = ApiResult<Vec<Category>>> + Send;

  /// Verbose package listing.
  fn get_packages(&self) -> impl Future<Output = ApiResult<Vec<Package>>> + Send;

  fn get_queue(&self) -> impl Future<Output = ApiResult<QueueSummary>> + Send;

  fn get_offline_commands(&self) -> impl Future<Output = ApiResult<OfflineCommands>> + Send;

  fn get_online_commands(
    &self,
    player_id: i64,
  ) -> impl Future<Output = ApiResult<OnlineCommands>> + Send;

  /// Remove executed commands from the backend queue.
  fn delete_commands(&self, ids: &[i64]) -> impl Future<Output = ApiResult<()>> + Send;

  fn create_checkout_url(
    &self,
    package_id: i64,
    username: &str,
  ) -> impl Future<Output = ApiResult<CheckoutUrl>> + Send;

  fn create_ban(&self, ban: &BanRequest) -> impl Future<Output = ApiResult<()>> + Send;

  fn get_user(&self, user_id: &str) -> impl Future<Output = ApiResult<UserLookup>> + Send;

  fn send_join_events(&self, events: &[JoinEvent]) -> impl Future<Output = ApiResult<()>> + Send;

  fn post_triage_event(
    &self,
    url: &str,
    event: &TriageEvent,
  ) -> impl Future<Output = ApiResult<()>> + Send;
}
