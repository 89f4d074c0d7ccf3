use std::collections::HashSet;

use arrayvec::ArrayString;
use scc::HashMap;

pub type PlayerName = ArrayString<16>;

/// A connected player as reported by the game server.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSession {
    pub name: PlayerName,
    pub uuid: Option<String>,
    pub ip: String,
    pub joined_at: i64,
}

/// In-memory view of who is connected to the game server.
///
/// Keyed by lowercase name, since player names are case-insensitive.
pub struct Presence {
    players: HashMap<String, PlayerSession>,
}

impl Presence {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
        }
    }

    /// Record a player joining. A rejoin replaces the previous session.
    pub async fn player_join(
        &self,
        player: &str,
        uuid: Option<String>,
        ip: &str,
        now: i64,
    ) -> Result<PlayerSession, PresenceError> {
        let name = PlayerName::try_from(player).map_err(|_| PresenceError::PlayerNameTooLong)?;
        let session = PlayerSession {
            name,
            uuid,
            ip: ip.to_string(),
            joined_at: now,
        };
        let _ = self
            .players
            .upsert_async(player.to_ascii_lowercase(), session.clone())
            .await;
        Ok(session)
    }

    /// Record a player leaving. Returns whether they were known.
    pub async fn player_leave(&self, player: &str) -> bool {
        self.players
            .remove_async(&player.to_ascii_lowercase())
            .await
            .is_some()
    }

    /// Replace the connected set with `players`. Known sessions keep their details.
    pub async fn sync_players(&self, players: &[String], now: i64) -> Result<(), PresenceError> {
        let names = players
            .iter()
            .map(|p| PlayerName::try_from(p.as_str()).map_err(|_| PresenceError::PlayerNameTooLong))
            .collect::<Result<Vec<_>, _>>()?;
        let keep: HashSet<String> = players.iter().map(|p| p.to_ascii_lowercase()).collect();

        let _ = self
            .players
            .retain_async(|key, _| keep.contains(key))
            .await;

        for name in names {
            let key = name.to_ascii_lowercase();
            if !self.players.contains_async(&key).await {
                let _ = self
                    .players
                    .insert_async(
                        key,
                        PlayerSession {
                            name,
                            uuid: None,
                            ip: String::new(),
                            joined_at: now,
                        },
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Get a copy of a player's session.
    pub async fn get(&self, player: &str) -> Option<PlayerSession> {
        self.players
            .read_async(&player.to_ascii_lowercase(), |_, session| session.clone())
            .await
    }

    pub async fn is_online(&self, player: &str) -> bool {
        self.players
            .contains_async(&player.to_ascii_lowercase())
            .await
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for Presence {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PresenceError {
    #[error("player name exceeds 16 characters")]
    PlayerNameTooLong,
}
