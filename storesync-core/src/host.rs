//! Capabilities the core needs from the game host integration.

use std::future::Future;

use crate::error::HostError;
use crate::models::{Command, PlayerInfo, TriageEvent};

/// A game host the commands are executed against.
///
/// `Player` is the host's live handle for a connected player.
pub trait Host: Send + Sync + 'static {
  type Player: Send + Sync;

  fn is_player_online(&self, player: &PlayerInfo) -> impl Future<Output = bool> + Send;

  /// Live reference for a connected player, `None` if the session is gone.
  fn get_player_ref(
    &self,
    player: &PlayerInfo,
  ) -> impl Future<Output = Option<Self::Player>> + Send;

  fn execute_offline_command(
    &self,
    command: &Command,
    name: &str,
    args: &[String],
  ) -> impl Future<Output = Result<(), HostError>> + Send;

  fn execute_online_command(
    &self,
    command: &Command,
    player: &Self::Player,
    name: &str,
    args: &[String],
  ) -> impl Future<Output = Result<(), HostError>> + Send;

  fn expand_username_variables(&self, template: &str, player: &Self::Player) -> String;

  fn expand_offline_variables(&self, template: &str, player: &PlayerInfo) -> String;

  fn reply_to_player(
    &self,
    player: &Self::Player,
    message: &str,
  ) -> impl Future<Output = Result<(), HostError>> + Send;

  /// Attach platform details (framework, versions, address) to a triage event.
  fn fill_triage_parameters(&self, event: TriageEvent) -> TriageEvent;
}
