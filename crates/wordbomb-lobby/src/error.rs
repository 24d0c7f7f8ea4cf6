//! Error types for the lobby layer.

use wordbomb_protocol::LobbyId;
use wordbomb_roster::RosterError;

/// The backing store could not serve a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("lobby store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No lobby with this id exists in the store.
    #[error("lobby {0} not found")]
    NotFound(LobbyId),

    /// A roster rule rejected the change (full, duplicate, unknown player).
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// The lobby is in a state that doesn't allow this operation, e.g.
    /// starting a game that is already running.
    #[error("invalid lobby transition: {0}")]
    InvalidTransition(String),

    /// A fuse fired for a bomb that is no longer armed.
    #[error("stale fuse generation {0}")]
    StaleTimer(u64),

    /// The lobby's actor is gone or its command channel is closed.
    #[error("lobby {0} is unavailable")]
    Unavailable(LobbyId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LobbyError {
    /// HTTP-style status code reported to clients.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Roster(RosterError::UnknownPlayer(_)) => 404,
            Self::Roster(_) | Self::InvalidTransition(_) | Self::StaleTimer(_) => 409,
            Self::Unavailable(_) | Self::Store(_) => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_error_codes() {
        assert_eq!(LobbyError::NotFound(LobbyId::public()).code(), 404);
        assert_eq!(
            LobbyError::from(RosterError::CapacityExceeded { max: 16 }).code(),
            409
        );
        assert_eq!(
            LobbyError::from(StoreError::Unavailable("down".into())).code(),
            503
        );
    }

    #[test]
    fn test_roster_error_message_passes_through() {
        let err = LobbyError::from(RosterError::GameInProgress);
        assert_eq!(err.to_string(), "a game is already in progress");
    }
}
