/// Input validation functions for all bridge routes
use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Player name cannot be empty")]
    PlayerNameEmpty,

    #[error("Player name too long (max 16 characters, got {0})")]
    PlayerNameTooLong(usize),

    #[error("Player name contains invalid characters (only alphanumeric and underscore allowed)")]
    PlayerNameInvalidChars,

    #[error("Player list too large (max {max} players, got {actual})")]
    PlayerListTooLarge { max: usize, actual: usize },

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    #[error("Package must be a short code or id (1-32 alphanumeric characters)")]
    PackageTokenInvalid,

    #[error("Ban reason must be between 1 and 255 characters (got {0})")]
    ReasonLength(usize),

    #[error("Triage message cannot be empty")]
    TriageMessageEmpty,
}

/// Validates a Minecraft player name
///
/// Rules:
/// - Cannot be empty
/// - Max 16 characters (Minecraft username limit)
/// - Only alphanumeric characters and underscores
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::PlayerNameEmpty);
    }

    if name.len() > 16 {
        return Err(ValidationError::PlayerNameTooLong(name.len()));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ValidationError::PlayerNameInvalidChars);
    }

    Ok(())
}

/// Validates a list of player names for bulk operations
///
/// Rules:
/// - Max 1000 players per request (prevents DOS)
/// - Each player name must be valid
pub fn validate_player_list(players: &[String]) -> Result<(), ValidationError> {
    const MAX_PLAYERS: usize = 1000;

    if players.len() > MAX_PLAYERS {
        return Err(ValidationError::PlayerListTooLarge {
            max: MAX_PLAYERS,
            actual: players.len(),
        });
    }

    for player in players {
        validate_player_name(player)?;
    }

    Ok(())
}

pub fn validate_ip(ip: &str) -> Result<(), ValidationError> {
    ip.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidIp(ip.to_string()))
}

/// Validates a package short code (`P3`) or numeric id
pub fn validate_package_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() || token.len() > 32 || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::PackageTokenInvalid);
    }
    Ok(())
}

pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    let len = reason.chars().count();
    if len == 0 || len > 255 {
        return Err(ValidationError::ReasonLength(len));
    }
    Ok(())
}

pub fn validate_triage_message(message: &str) -> Result<(), ValidationError> {
    if message.trim().is_empty() {
        return Err(ValidationError::TriageMessageEmpty);
    }
    Ok(())
}
