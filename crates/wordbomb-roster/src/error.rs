//! Error types for the roster layer.

/// Errors that can occur while changing who is in a lobby.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// The lobby already holds `max_players` players.
    #[error("lobby is full ({max} players)")]
    CapacityExceeded { max: usize },

    /// Someone with this username is already seated. Usernames are the
    /// player's identity inside a lobby, so they must be unique.
    #[error("player {0} is already in the lobby")]
    DuplicatePlayer(String),

    /// Joining is only possible between games.
    #[error("a game is already in progress")]
    GameInProgress,

    /// No player with this username is seated.
    #[error("player {0} is not in the lobby")]
    UnknownPlayer(String),
}
