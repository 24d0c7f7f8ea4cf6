//! Unified error type for the word bomb server.

use wordbomb_lobby::LobbyError;
use wordbomb_protocol::ProtocolError;
use wordbomb_transport::TransportError;

/// Top-level error that wraps the error of every layer.
///
/// The `#[from]` conversions let `?` lift layer errors into it.
#[derive(Debug, thiserror::Error)]
pub enum WordbombError {
    /// Connection, send or receive failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded, decoded or validated.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A lobby operation failed.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// Binding or serving the HTTP listener failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl WordbombError {
    /// HTTP-style status code for an `error` event sent to a client.
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(_) => 400,
            Self::Lobby(e) => e.code(),
            Self::Transport(_) | Self::Io(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordbomb_protocol::LobbyId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::SendFailed("gone".into());
        let wordbomb_err: WordbombError = err.into();
        assert!(matches!(wordbomb_err, WordbombError::Transport(_)));
        assert!(wordbomb_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error_is_bad_request() {
        let err = ProtocolError::InvalidEvent("bad".into());
        let wordbomb_err: WordbombError = err.into();
        assert!(matches!(wordbomb_err, WordbombError::Protocol(_)));
        assert_eq!(wordbomb_err.code(), 400);
    }

    #[test]
    fn test_from_lobby_error_keeps_its_code() {
        let err = LobbyError::NotFound(LobbyId::new("nope"));
        let wordbomb_err: WordbombError = err.into();
        assert!(matches!(wordbomb_err, WordbombError::Lobby(_)));
        assert_eq!(wordbomb_err.code(), 404);
    }
}
