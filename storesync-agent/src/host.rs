//! Host integration for game servers that talk to the agent over HTTP.
//!
//! The game server reports presence through the bridge routes and polls an
//! outbox for the commands and chat messages the engine dispatches.

use std::sync::Arc;

use serde::Serialize;
use storesync_core::{Command, Host, HostError, PlayerInfo, TriageEvent};
use tokio::sync::Mutex;
use tracing::debug;

use crate::presence::{PlayerSession, Presence};

/// Most dispatches held before execution starts failing.
pub const OUTBOX_CAPACITY: usize = 10_000;

/// Something the game server should carry out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dispatch {
    /// Run a command, from the console when `player` is absent.
    Command {
        command_id: i64,
        player: Option<String>,
        name: String,
        args: Vec<String>,
    },
    /// Show a chat message to a player.
    Message { player: String, text: String },
}

pub struct BridgeHost {
    presence: Arc<Presence>,
    outbox: Mutex<Vec<Dispatch>>,
    capacity: usize,
    server_ip: String,
}

impl BridgeHost {
    pub fn new(presence: Arc<Presence>, server_ip: impl Into<String>) -> Self {
        Self::with_capacity(presence, server_ip, OUTBOX_CAPACITY)
    }

    pub fn with_capacity(
        presence: Arc<Presence>,
        server_ip: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            presence,
            outbox: Mutex::new(Vec::new()),
            capacity,
            server_ip: server_ip.into(),
        }
    }

    pub fn presence(&self) -> &Arc<Presence> {
        &self.presence
    }

    /// Take everything waiting in the outbox.
    pub async fn drain(&self) -> Vec<Dispatch> {
        std::mem::take(&mut *self.outbox.lock().await)
    }

    pub async fn pending(&self) -> usize {
        self.outbox.lock().await.len()
    }

    async fn push(&self, dispatch: Dispatch) -> Result<(), HostError> {
        let mut outbox = self.outbox.lock().await;
        if outbox.len() >= self.capacity {
            return Err(HostError::Backlog);
        }
        outbox.push(dispatch);
        Ok(())
    }
}

fn expand(template: &str, name: &str, uuid: &str) -> String {
    template
        .replace("{username}", name)
        .replace("{name}", name)
        .replace("{player}", name)
        .replace("{uuid}", uuid)
        .replace("{id}", uuid)
}

impl Host for BridgeHost {
    type Player = PlayerSession;

    async fn is_player_online(&self, player: &PlayerInfo) -> bool {
        self.presence.is_online(&player.name).await
    }

    async fn get_player_ref(&self, player: &PlayerInfo) -> Option<PlayerSession> {
        self.presence.get(&player.name).await
    }

    async fn execute_offline_command(
        &self,
        command: &Command,
        name: &str,
        args: &[String],
    ) -> Result<(), HostError> {
        self.push(Dispatch::Command {
            command_id: command.id,
            player: None,
            name: name.to_string(),
            args: args.to_vec(),
        })
        .await
    }

    async fn execute_online_command(
        &self,
        command: &Command,
        player: &PlayerSession,
        name: &str,
        args: &[String],
    ) -> Result<(), HostError> {
        if !self.presence.is_online(&player.name).await {
            return Err(HostError::NotConnected(player.name.to_string()));
        }
        self.push(Dispatch::Command {
            command_id: command.id,
            player: Some(player.name.to_string()),
            name: name.to_string(),
            args: args.to_vec(),
        })
        .await
    }

    fn expand_username_variables(&self, template: &str, player: &PlayerSession) -> String {
        let uuid = player.uuid.as_deref().unwrap_or_default();
        expand(template, &player.name, uuid).replace("{ip}", &player.ip)
    }

    fn expand_offline_variables(&self, template: &str, player: &PlayerInfo) -> String {
        let uuid = player.uuid.as_deref().unwrap_or_default();
        expand(template, &player.name, uuid)
    }

    async fn reply_to_player(&self, player: &PlayerSession, message: &str) -> Result<(), HostError> {
        debug!(player = %player.name, "queueing chat message");
        self.push(Dispatch::Message {
            player: player.name.to_string(),
            text: message.to_string(),
        })
        .await
    }

    fn fill_triage_parameters(&self, mut event: TriageEvent) -> TriageEvent {
        event.framework_id = "http-bridge".to_string();
        event.runtime_version = "rust".to_string();
        event.plugin_version = env!("CARGO_PKG_VERSION").to_string();
        event.server_ip = self.server_ip.clone();
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(id: i64) -> Command {
        Command {
            id,
            command: String::new(),
            payment: None,
            package: None,
            conditions: Default::default(),
            player: None,
        }
    }

    async fn host_with_steve() -> BridgeHost {
        let presence = Arc::new(Presence::new());
        presence
            .player_join("Steve", Some("069a79f4".into()), "10.0.0.1", 0)
            .await
            .unwrap();
        BridgeHost::with_capacity(presence, "203.0.113.5", 2)
    }

    #[tokio::test]
    async fn test_online_variables() {
        let host = host_with_steve().await;
        let session = host.presence().get("Steve").await.unwrap();

        let line = host.expand_username_variables("give {username} diamond {uuid} {ip}", &session);
        assert_eq!(line, "give Steve diamond 069a79f4 10.0.0.1");
    }

    #[tokio::test]
    async fn test_offline_variables_without_uuid() {
        let host = host_with_steve().await;
        let player = PlayerInfo {
            id: 9,
            name: "Notch".into(),
            uuid: None,
        };

        assert_eq!(
            host.expand_offline_variables("mail {player} thanks [{id}]", &player),
            "mail Notch thanks []"
        );
    }

    #[tokio::test]
    async fn test_outbox_bounded() {
        let host = host_with_steve().await;
        let args = vec!["a".to_string()];

        host.execute_offline_command(&command(1), "say", &args).await.unwrap();
        host.execute_offline_command(&command(2), "say", &args).await.unwrap();
        let third = host.execute_offline_command(&command(3), "say", &args).await;

        assert_eq!(third, Err(HostError::Backlog));
        assert_eq!(host.drain().await.len(), 2);
        assert_eq!(host.pending().await, 0);
    }

    #[tokio::test]
    async fn test_online_command_requires_connected_player() {
        let host = host_with_steve().await;
        let session = host.presence().get("Steve").await.unwrap();
        host.presence().player_leave("Steve").await;

        let result = host.execute_online_command(&command(1), &session, "kit", &[]).await;
        assert_eq!(result, Err(HostError::NotConnected("Steve".into())));
    }

    #[test]
    fn test_triage_parameters() {
        let host = BridgeHost::new(Arc::new(Presence::new()), "203.0.113.5");
        let event = host.fill_triage_parameters(TriageEvent::new("boom"));
        assert_eq!(event.framework_id, "http-bridge");
        assert_eq!(event.server_ip, "203.0.113.5");
        assert_eq!(event.plugin_version, env!("CARGO_PKG_VERSION"));
    }
}
