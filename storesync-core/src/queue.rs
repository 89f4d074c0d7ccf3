//! The command queue polling cycle.
//!
//! A cycle checks the rate limit gate, fetches the due-queue summary, moves the
//! gate forward by the interval the backend asked for, then dispatches offline
//! and online commands concurrently. Every failure is logged and reported;
//! none escapes the cycle.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::SyncSettings;
use crate::api::StoreApi;
use crate::error::{ApiError, HostError};
use crate::flush::ExecutedCommands;
use crate::host::Host;
use crate::models::{Command, PlayerInfo, QueueSummary};
use crate::triage::{Metadata, TriageReporter, metadata};

/// Longest wait the backend can impose between due-queue checks.
pub const MAX_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Earliest instant the backend accepts another due-queue check.
#[derive(Debug, Default)]
pub struct RateLimiter {
  next_check_allowed_at: Mutex<Option<Instant>>,
}

impl RateLimiter {
  pub fn new() -> Self {
    Self::default()
  }

  /// True once `now` is strictly past the allowed instant.
  pub async fn can_check(&self) -> bool {
    match *self.next_check_allowed_at.lock().await {
      Some(allowed_at) => Instant::now() > allowed_at,
      None => true,
    }
  }

  /// Push the next allowed check `interval` past now, capped at
  /// [`MAX_CHECK_INTERVAL`].
  pub async fn defer(&self, interval: Duration) {
    if interval > MAX_CHECK_INTERVAL {
      warn!(
        requested_secs = interval.as_secs(),
        "next check interval out of range, capping"
      );
    }
    let interval = interval.min(MAX_CHECK_INTERVAL);
    *self.next_check_allowed_at.lock().await = Some(Instant::now() + interval);
  }

  pub async fn next_check_allowed_at(&self) -> Option<Instant> {
    *self.next_check_allowed_at.lock().await
  }
}

/// What a call to [`QueueProcessor::process_queue`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
  /// Another cycle was still running.
  InFlight,
  /// The backend's minimum interval has not passed yet.
  RateLimited,
  /// The due-queue summary could not be fetched or decoded.
  Failed,
  Completed { offline: usize, online: usize },
}

/// Split an expanded command on single spaces into name and arguments.
pub fn split_command(line: &str) -> (String, Vec<String>) {
  let mut parts = line.split(' ');
  let name = parts.next().unwrap_or_default().to_string();
  (name, parts.map(str::to_string).collect())
}

pub struct QueueProcessor<A, H> {
  api: Arc<A>,
  host: Arc<H>,
  executed: Arc<ExecutedCommands>,
  triage: Arc<TriageReporter<A, H>>,
  rate_limiter: RateLimiter,
  cycle: Mutex<()>,
  /// Offline commands without a player that were already reported.
  unroutable: Mutex<HashSet<i64>>,
  debug_mode: bool,
}

impl<A: StoreApi, H: Host> QueueProcessor<A, H> {
  pub fn new(
    api: Arc<A>,
    host: Arc<H>,
    executed: Arc<ExecutedCommands>,
    triage: Arc<TriageReporter<A, H>>,
    settings: &SyncSettings,
  ) -> Self {
    Self {
      api,
      host,
      executed,
      triage,
      rate_limiter: RateLimiter::new(),
      cycle: Mutex::new(()),
      unroutable: Mutex::new(HashSet::new()),
      debug_mode: settings.debug_mode,
    }
  }

  pub fn rate_limiter(&self) -> &RateLimiter {
    &self.rate_limiter
  }

  pub async fn can_process_next_queue(&self) -> bool {
    self.rate_limiter.can_check().await
  }

  /// Run one polling cycle.
  pub async fn process_queue(&self) -> CycleOutcome {
    let Ok(_cycle) = self.cycle.try_lock() else {
      debug!("queue cycle already in flight, skipping tick");
      return CycleOutcome::InFlight;
    };

    if !self.can_process_next_queue().await {
      debug!("next queue check not allowed yet, skipping tick");
      return CycleOutcome::RateLimited;
    }

    let summary = match self.api.get_queue().await {
      Ok(summary) => summary,
      Err(err) if err.is_parse() => {
        error!(error = %err, "failed to parse due queue");
        return CycleOutcome::Failed;
      }
      Err(err) => {
        error!(error = %err, "failed to fetch due queue");
        self
          .report(&err, "failed to fetch due queue", metadata([]))
          .await;
        return CycleOutcome::Failed;
      }
    };

    // Applied before dispatch so a failing cycle cannot retry in a tight loop
    self
      .rate_limiter
      .defer(Duration::from_secs(summary.meta.next_check))
      .await;
    info!(
      due_players = summary.players.len(),
      execute_offline = summary.meta.execute_offline,
      next_check = summary.meta.next_check,
      "due queue fetched"
    );

    let (offline, online) = tokio::join!(
      self.process_offline(&summary),
      self.process_online(&summary)
    );
    CycleOutcome::Completed { offline, online }
  }

  async fn process_offline(&self, summary: &QueueSummary) -> usize {
    if !summary.meta.execute_offline {
      return 0;
    }

    let offline = match self.api.get_offline_commands().await {
      Ok(offline) => offline,
      Err(err) => {
        error!(error = %err, "failed to fetch offline commands");
        self
          .report(&err, "failed to fetch offline commands", metadata([]))
          .await;
        return 0;
      }
    };

    let mut executed = 0;
    for command in &offline.commands {
      let Some(player) = &command.player else {
        self.report_unroutable(command).await;
        continue;
      };
      if self.executed.contains(command.id).await {
        debug!(command_id = command.id, "offline command awaiting acknowledgement, skipping");
        continue;
      }
      let line = self.host.expand_offline_variables(&command.command, player);
      if self.execute_offline(command, player, &line).await {
        executed += 1;
      }
    }
    executed
  }

  async fn execute_offline(&self, command: &Command, player: &PlayerInfo, line: &str) -> bool {
    let (name, args) = split_command(line);
    if self.debug_mode {
      debug!(command_id = command.id, player = %player.name, %line, "dispatching offline command");
    }

    match self.host.execute_offline_command(command, &name, &args).await {
      Ok(()) => {
        self.executed.push(command.id).await;
        true
      }
      Err(err) => {
        self.report_execution_failure(command, &player.name, err).await;
        false
      }
    }
  }

  async fn process_online(&self, summary: &QueueSummary) -> usize {
    let mut executed = 0;
    for player in &summary.players {
      executed += self.process_player(player).await;
    }
    executed
  }

  async fn process_player(&self, player: &PlayerInfo) -> usize {
    if !self.host.is_player_online(player).await {
      debug!(player = %player.name, "due player is not online, skipping");
      return 0;
    }

    let commands = match self.api.get_online_commands(player.id).await {
      Ok(online) => online.commands,
      Err(err) => {
        error!(player = %player.name, error = %err, "failed to fetch online commands");
        self
          .report(
            &err,
            "failed to fetch online commands",
            metadata([("player", player.name.clone())]),
          )
          .await;
        return 0;
      }
    };

    let mut executed = 0;
    for command in &commands {
      if self.executed.contains(command.id).await {
        debug!(command_id = command.id, player = %player.name, "online command awaiting acknowledgement, skipping");
        continue;
      }

      let Some(player_ref) = self.host.get_player_ref(player).await else {
        // The session went away mid-dispatch; nothing after this can be trusted
        warn!(
          player = %player.name,
          command_id = command.id,
          "player reference unavailable, skipping remaining commands"
        );
        break;
      };

      let line = self
        .host
        .expand_username_variables(&command.command, &player_ref);
      let (name, args) = split_command(&line);
      if self.debug_mode {
        debug!(command_id = command.id, player = %player.name, %line, "dispatching online command");
      }

      match self
        .host
        .execute_online_command(command, &player_ref, &name, &args)
        .await
      {
        Ok(()) => {
          self.executed.push(command.id).await;
          executed += 1;
        }
        Err(err) => self.report_execution_failure(command, &player.name, err).await,
      }
    }
    executed
  }

  /// Offline commands without a player cannot be expanded. They stay queued on
  /// the backend, so each one is reported once per process.
  async fn report_unroutable(&self, command: &Command) {
    if !self.unroutable.lock().await.insert(command.id) {
      return;
    }
    warn!(command_id = command.id, "offline command has no player, skipping");
    self
      .triage
      .report_auto(
        "offline command has no player",
        metadata([("command_id", command.id.to_string())]),
      )
      .await;
  }

  async fn report_execution_failure(&self, command: &Command, player: &str, err: HostError) {
    warn!(command_id = command.id, player, error = %err, "command execution failed");
    self
      .triage
      .report_error(
        &err,
        metadata([
          ("command_id", command.id.to_string()),
          ("player", player.to_string()),
        ]),
      )
      .await;
  }

  async fn report(&self, err: &ApiError, context: &str, mut metadata: Metadata) {
    if let ApiError::Api { code, .. } = err {
      metadata.insert("error_code".to_string(), code.to_string());
    }
    if let Some(body) = err.body() {
      metadata.insert("body".to_string(), body.to_string());
    }
    self
      .triage
      .report_auto(format!("{context}: {err}"), metadata)
      .await;
  }
}
