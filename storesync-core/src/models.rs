use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Player details bundled by the backend with due players and offline commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub uuid: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConditions {
  #[serde(default)]
  pub delay: u64,
  #[serde(default)]
  pub slots: u32,
}

/// A queued command produced by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
  pub id: i64,
  /// Template string; variables are expanded by the host.
  pub command: String,
  #[serde(default)]
  pub payment: Option<i64>,
  #[serde(default)]
  pub package: Option<i64>,
  #[serde(default)]
  pub conditions: CommandConditions,
  /// Present on offline commands.
  #[serde(default)]
  pub player: Option<PlayerInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMeta {
  #[serde(default)]
  pub execute_offline: bool,
  /// Seconds until the backend accepts the next queue check.
  pub next_check: u64,
  #[serde(default)]
  pub more: bool,
}

/// Due-queue summary returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
  pub meta: QueueMeta,
  #[serde(default)]
  pub players: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineMeta {
  #[serde(default)]
  pub limited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineCommands {
  #[serde(default)]
  pub meta: OfflineMeta,
  pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineCommands {
  pub commands: Vec<Command>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
  pub id: i64,
  pub name: String,
}

/// A purchasable package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
  pub id: i64,
  pub name: String,
  /// Display ordering; short codes follow it.
  #[serde(default)]
  pub order: i64,
  /// Decimal price as sent by the backend, e.g. "4.99".
  #[serde(default)]
  pub price: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub category: Option<CategoryRef>,
  #[serde(default)]
  pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub order: i64,
  #[serde(default)]
  pub packages: Vec<Package>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
  pub iso_4217: String,
  pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  pub id: i64,
  pub domain: String,
  pub name: String,
  #[serde(default)]
  pub currency: Currency,
  #[serde(default)]
  pub online_mode: bool,
  #[serde(default)]
  pub game_type: String,
  #[serde(default)]
  pub log_events: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
  pub id: i64,
  pub name: String,
}

/// Store metadata, cached under `"information"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
  pub account: Account,
  pub server: ServerInfo,
}

/// A player connection reported to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEvent {
  pub username_id: String,
  pub event_type: String,
  /// Unix timestamp (seconds)
  pub event_date: i64,
  pub ip: String,
}

impl JoinEvent {
  pub const SERVER_JOIN: &'static str = "server.join";

  pub fn server_join(player_id: impl Into<String>, ip: impl Into<String>, now: i64) -> Self {
    Self {
      username_id: player_id.into(),
      event_type: Self::SERVER_JOIN.to_string(),
      event_date: now,
      ip: ip.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutUrl {
  pub url: String,
  #[serde(default)]
  pub expires: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRequest {
  pub reason: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ip: Option<String>,
  pub user: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPlayer {
  pub id: String,
  pub username: String,
}

/// Customer record returned by a user lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLookup {
  pub player: UserPlayer,
  #[serde(default)]
  pub ban_count: u32,
  #[serde(default)]
  pub chargeback_rate: f64,
  #[serde(default)]
  pub payments: Vec<serde_json::Value>,
}

/// Diagnostic record sent to the triage endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageEvent {
  pub game_id: String,
  pub framework_id: String,
  pub runtime_version: String,
  pub framework_version: String,
  pub plugin_version: String,
  pub server_ip: String,
  pub error_message: String,
  pub trace: String,
  pub metadata: BTreeMap<String, String>,
  pub store_name: String,
  pub store_url: String,
}

impl TriageEvent {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error_message: message.into(),
      ..Default::default()
    }
  }

  #[must_use]
  pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
    self.metadata.insert(key.into(), value.to_string());
    self
  }
}
