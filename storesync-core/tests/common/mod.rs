//! In-memory store backend and host that record every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use storesync_core::{
  ApiError, ApiResult, BanRequest, Category, CheckoutUrl, Command, HostError, JoinEvent,
  OfflineCommands, OnlineCommands, Package, PlayerInfo, QueueMeta, QueueSummary, StoreApi,
  StoreInfo, StoreSync, SyncSettings, TriageEvent, UserLookup, UserPlayer,
};

fn not_configured() -> ApiError {
  ApiError::Server {
    status: 404,
    body: "not configured".to_string(),
  }
}

#[derive(Default)]
pub struct FakeStore {
  pub calls: Mutex<Vec<String>>,
  pub information: Mutex<Option<ApiResult<StoreInfo>>>,
  pub listing: Mutex<Option<ApiResult<Vec<Category>>>>,
  pub packages: Mutex<Option<ApiResult<Vec<Package>>>>,
  pub queue: Mutex<Option<ApiResult<QueueSummary>>>,
  pub offline: Mutex<Option<ApiResult<OfflineCommands>>>,
  pub online: Mutex<HashMap<i64, ApiResult<OnlineCommands>>>,
  pub fail_deletes: AtomicBool,
  pub fail_joins: AtomicBool,
  pub deleted: Mutex<Vec<Vec<i64>>>,
  pub join_batches: Mutex<Vec<Vec<JoinEvent>>>,
  pub bans: Mutex<Vec<BanRequest>>,
  pub triage: Mutex<Vec<(String, TriageEvent)>>,
  /// When set, due-queue fetches wait for a notification.
  pub hold_queue: Mutex<Option<Arc<Notify>>>,
}

impl FakeStore {
  fn record(&self, call: impl Into<String>) {
    self.calls.lock().unwrap().push(call.into());
  }

  /// Number of recorded calls starting with `prefix`.
  pub fn count(&self, prefix: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|call| call.starts_with(prefix))
      .count()
  }

  pub fn set_queue(&self, queue: ApiResult<QueueSummary>) {
    *self.queue.lock().unwrap() = Some(queue);
  }

  pub fn set_offline(&self, offline: ApiResult<OfflineCommands>) {
    *self.offline.lock().unwrap() = Some(offline);
  }

  pub fn set_online(&self, player_id: i64, online: ApiResult<OnlineCommands>) {
    self.online.lock().unwrap().insert(player_id, online);
  }

  pub fn set_packages(&self, packages: ApiResult<Vec<Package>>) {
    *self.packages.lock().unwrap() = Some(packages);
  }

  pub fn set_listing(&self, listing: ApiResult<Vec<Category>>) {
    *self.listing.lock().unwrap() = Some(listing);
  }

  pub fn set_information(&self, information: ApiResult<StoreInfo>) {
    *self.information.lock().unwrap() = Some(information);
  }

  pub fn triage_events(&self) -> Vec<TriageEvent> {
    self
      .triage
      .lock()
      .unwrap()
      .iter()
      .map(|(_, event)| event.clone())
      .collect()
  }
}

fn configured<T: Clone>(slot: &Mutex<Option<ApiResult<T>>>) -> ApiResult<T> {
  slot.lock().unwrap().clone().unwrap_or_else(|| Err(not_configured()))
}

impl StoreApi for FakeStore {
  async fn get_information(&self) -> ApiResult<StoreInfo> {
    self.record("get_information");
    configured(&self.information)
  }

  async fn get_listing(&self) -> ApiResult<Vec<Category>> {
    self.record("get_listing");
    configured(&self.listing)
  }

  async fn get_packages(&self) -> ApiResult<Vec<Package>> {
    self.record("get_packages");
    configured(&self.packages)
  }

  async fn get_queue(&self) -> ApiResult<QueueSummary> {
    self.record("get_queue");
    let hold = self.hold_queue.lock().unwrap().clone();
    if let Some(hold) = hold {
      hold.notified().await;
    }
    configured(&self.queue)
  }

  async fn get_offline_commands(&self) -> ApiResult<OfflineCommands> {
    self.record("get_offline_commands");
    configured(&self.offline)
  }

  async fn get_online_commands(&self, player_id: i64) -> ApiResult<OnlineCommands> {
    self.record(format!("get_online_commands:{player_id}"));
    self
      .online
      .lock()
      .unwrap()
      .get(&player_id)
      .cloned()
      .unwrap_or_else(|| Err(not_configured()))
  }

  async fn delete_commands(&self, ids: &[i64]) -> ApiResult<()> {
    self.record("delete_commands");
    if self.fail_deletes.load(Ordering::SeqCst) {
      return Err(ApiError::Server {
        status: 500,
        body: "delete failed".to_string(),
      });
    }
    self.deleted.lock().unwrap().push(ids.to_vec());
    Ok(())
  }

  async fn create_checkout_url(&self, package_id: i64, username: &str) -> ApiResult<CheckoutUrl> {
    self.record(format!("create_checkout_url:{package_id}:{username}"));
    Ok(CheckoutUrl {
      url: format!("https://store.example/checkout/{package_id}"),
      expires: String::new(),
    })
  }

  async fn create_ban(&self, ban: &BanRequest) -> ApiResult<()> {
    self.record("create_ban");
    self.bans.lock().unwrap().push(ban.clone());
    Ok(())
  }

  async fn get_user(&self, user_id: &str) -> ApiResult<UserLookup> {
    self.record(format!("get_user:{user_id}"));
    Ok(UserLookup {
      player: UserPlayer {
        id: user_id.to_string(),
        username: user_id.to_string(),
      },
      ..Default::default()
    })
  }

  async fn send_join_events(&self, events: &[JoinEvent]) -> ApiResult<()> {
    self.record("send_join_events");
    if self.fail_joins.load(Ordering::SeqCst) {
      return Err(ApiError::Api {
        code: 422,
        message: "invalid event".to_string(),
      });
    }
    self.join_batches.lock().unwrap().push(events.to_vec());
    Ok(())
  }

  async fn post_triage_event(&self, url: &str, event: &TriageEvent) -> ApiResult<()> {
    self.record("post_triage_event");
    self
      .triage
      .lock()
      .unwrap()
      .push((url.to_string(), event.clone()));
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
  pub command_id: i64,
  pub player: Option<String>,
  pub name: String,
  pub args: Vec<String>,
}

/// Host whose live players are tracked by name.
#[derive(Default)]
pub struct FakeHost {
  pub online: Mutex<HashSet<String>>,
  /// Online players whose reference lookup fails.
  pub detached: Mutex<HashSet<String>>,
  pub rejected_commands: Mutex<HashSet<i64>>,
  pub executed: Mutex<Vec<Executed>>,
  pub replies: Mutex<Vec<(String, String)>>,
  pub ref_lookups: Mutex<usize>,
  pub detach_after_first_command: AtomicBool,
}

impl FakeHost {
  pub fn connect(&self, name: &str) {
    self.online.lock().unwrap().insert(name.to_string());
  }

  pub fn executed(&self) -> Vec<Executed> {
    self.executed.lock().unwrap().clone()
  }
}

impl storesync_core::Host for FakeHost {
  type Player = String;

  async fn is_player_online(&self, player: &PlayerInfo) -> bool {
    self.online.lock().unwrap().contains(&player.name)
  }

  async fn get_player_ref(&self, player: &PlayerInfo) -> Option<String> {
    *self.ref_lookups.lock().unwrap() += 1;
    if self.detach_after_first_command.load(Ordering::SeqCst) && !self.executed().is_empty() {
      return None;
    }
    let online = self.online.lock().unwrap().contains(&player.name);
    let detached = self.detached.lock().unwrap().contains(&player.name);
    (online && !detached).then(|| player.name.clone())
  }

  async fn execute_offline_command(
    &self,
    command: &Command,
    name: &str,
    args: &[String],
  ) -> Result<(), HostError> {
    if self.rejected_commands.lock().unwrap().contains(&command.id) {
      return Err(HostError::Rejected(name.to_string()));
    }
    self.executed.lock().unwrap().push(Executed {
      command_id: command.id,
      player: None,
      name: name.to_string(),
      args: args.to_vec(),
    });
    Ok(())
  }

  async fn execute_online_command(
    &self,
    command: &Command,
    player: &String,
    name: &str,
    args: &[String],
  ) -> Result<(), HostError> {
    if self.rejected_commands.lock().unwrap().contains(&command.id) {
      return Err(HostError::Rejected(name.to_string()));
    }
    self.executed.lock().unwrap().push(Executed {
      command_id: command.id,
      player: Some(player.clone()),
      name: name.to_string(),
      args: args.to_vec(),
    });
    Ok(())
  }

  fn expand_username_variables(&self, template: &str, player: &String) -> String {
    template.replace("{username}", player)
  }

  fn expand_offline_variables(&self, template: &str, player: &PlayerInfo) -> String {
    template
      .replace("{player}", &player.name)
      .replace("{id}", &player.id.to_string())
  }

  async fn reply_to_player(&self, player: &String, message: &str) -> Result<(), HostError> {
    self
      .replies
      .lock()
      .unwrap()
      .push((player.clone(), message.to_string()));
    Ok(())
  }

  fn fill_triage_parameters(&self, mut event: TriageEvent) -> TriageEvent {
    event.framework_id = "fake".to_string();
    event.plugin_version = "0.0.0-test".to_string();
    event
  }
}

pub type Engine = StoreSync<FakeStore, FakeHost>;

pub const TRIAGE_URL: &str = "https://triage.example/events";

pub fn settings() -> SyncSettings {
  SyncSettings {
    debug_mode: true,
    auto_reporting_enabled: true,
    cache_lifetime: Duration::from_secs(30 * 60),
    triage_url: TRIAGE_URL.to_string(),
  }
}

pub fn engine() -> (Engine, Arc<FakeStore>, Arc<FakeHost>) {
  engine_with(settings())
}

pub fn engine_with(settings: SyncSettings) -> (Engine, Arc<FakeStore>, Arc<FakeHost>) {
  let store = Arc::new(FakeStore::default());
  let host = Arc::new(FakeHost::default());
  let engine = StoreSync::new(store.clone(), host.clone(), &settings);
  (engine, store, host)
}

pub fn player(id: i64, name: &str) -> PlayerInfo {
  PlayerInfo {
    id,
    name: name.to_string(),
    uuid: None,
  }
}

pub fn command(id: i64, template: &str, player: Option<PlayerInfo>) -> Command {
  Command {
    id,
    command: template.to_string(),
    payment: None,
    package: None,
    conditions: Default::default(),
    player,
  }
}

pub fn summary(next_check: u64, execute_offline: bool, players: Vec<PlayerInfo>) -> QueueSummary {
  QueueSummary {
    meta: QueueMeta {
      execute_offline,
      next_check,
      more: false,
    },
    players,
  }
}

pub fn package(id: i64, order: i64) -> Package {
  Package {
    id,
    name: format!("Package {id}"),
    order,
    price: "4.99".to_string(),
    ..Default::default()
  }
}
