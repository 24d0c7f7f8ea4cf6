//! Named events in both directions.
//!
//! Every frame is adjacently tagged:
//!
//! ```json
//! {"event":"sendAnswer","data":{"lobbyId":"public","username":"ana","answer":"cart"}}
//! ```
//!
//! The event names are the ones the browser client already emits and
//! listens for, so renaming a variant is a wire break.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::types::{ChatMessage, Lobby, LobbyId, Player, PlayerProfile, PlayerStatistics};

/// Longest accepted username, in characters.
pub const MAX_USERNAME_LEN: usize = 32;
/// Longest accepted chat line, in characters.
pub const MAX_MESSAGE_LEN: usize = 500;
/// Longest accepted answer or draft, in characters.
pub const MAX_ANSWER_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Subscribe to a lobby's broadcasts without joining its game.
    WatchLobby { lobby_id: LobbyId },
    JoinGame {
        lobby_id: LobbyId,
        player: PlayerProfile,
    },
    LeaveGame { lobby_id: LobbyId, username: String },
    StartGame { lobby_id: LobbyId },
    SendAnswer {
        lobby_id: LobbyId,
        username: String,
        answer: String,
    },
    /// The active player's in-progress typing, relayed to spectators.
    ChangeAnswerField {
        lobby_id: LobbyId,
        username: String,
        draft_text: String,
    },
    SendMessage {
        lobby_id: LobbyId,
        username: String,
        message: String,
        #[serde(default)]
        avatar: Option<String>,
    },
}

impl ClientEvent {
    /// The lobby this event is addressed to.
    pub fn lobby_id(&self) -> &LobbyId {
        match self {
            Self::WatchLobby { lobby_id }
            | Self::JoinGame { lobby_id, .. }
            | Self::LeaveGame { lobby_id, .. }
            | Self::StartGame { lobby_id }
            | Self::SendAnswer { lobby_id, .. }
            | Self::ChangeAnswerField { lobby_id, .. }
            | Self::SendMessage { lobby_id, .. } => lobby_id,
        }
    }

    /// The wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::WatchLobby { .. } => "watchLobby",
            Self::JoinGame { .. } => "joinGame",
            Self::LeaveGame { .. } => "leaveGame",
            Self::StartGame { .. } => "startGame",
            Self::SendAnswer { .. } => "sendAnswer",
            Self::ChangeAnswerField { .. } => "changeAnswerField",
            Self::SendMessage { .. } => "sendMessage",
        }
    }

    /// Checks payload limits that don't need any lobby state.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidEvent` naming the offending field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.lobby_id().as_str().is_empty() {
            return Err(ProtocolError::InvalidEvent("lobbyId is empty".into()));
        }
        match self {
            Self::WatchLobby { .. } | Self::StartGame { .. } => Ok(()),
            Self::JoinGame { player, .. } => check_username(&player.username),
            Self::LeaveGame { username, .. } => check_username(username),
            Self::SendAnswer {
                username, answer, ..
            } => {
                check_username(username)?;
                check_len("answer", answer, MAX_ANSWER_LEN)
            }
            Self::ChangeAnswerField {
                username,
                draft_text,
                ..
            } => {
                check_username(username)?;
                check_len("draftText", draft_text, MAX_ANSWER_LEN)
            }
            Self::SendMessage {
                username, message, ..
            } => {
                check_username(username)?;
                check_len("message", message, MAX_MESSAGE_LEN)
            }
        }
    }
}

fn check_username(username: &str) -> Result<(), ProtocolError> {
    if username.trim().is_empty() {
        return Err(ProtocolError::InvalidEvent("username is empty".into()));
    }
    check_len("username", username, MAX_USERNAME_LEN)
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ProtocolError> {
    if value.chars().count() > max {
        return Err(ProtocolError::InvalidEvent(format!(
            "{field} is longer than {max} characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Events the server pushes to clients.
///
/// Everything except `error` is broadcast to everyone watching a lobby.
/// `error` goes only to the connection that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    ReceiveMessage(ChatMessage),
    /// The turn moved on. Carries the full lobby so clients can redraw.
    NextTurn { lobby: Lobby, reason: TurnReason },
    /// The game ended. `lobby` is the snapshot before it was cleared.
    GameFinished {
        lobby: Lobby,
        winner: Option<Player>,
        summary: GameSummary,
    },
    /// Roster or status changed outside of turn flow (join, leave while
    /// waiting, reset after a game).
    LobbyUpdated { lobby: Lobby },
    AnswerRejected {
        lobby_id: LobbyId,
        username: String,
        answer: String,
        reason: RejectReason,
    },
    AnswerFieldChanged {
        lobby_id: LobbyId,
        username: String,
        draft_text: String,
    },
    Error { code: u16, message: String },
}

/// Why the turn advanced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum TurnReason {
    GameStarted,
    Answered { username: String, word: String },
    /// The fuse ran out on `username`. `eliminated` is false when the
    /// bomb was passed on without knocking anyone out.
    Exploded { username: String, eliminated: bool },
    PlayerLeft { username: String },
}

impl TurnReason {
    /// The chat notice for a turn that knocked someone out, if any.
    pub fn announcement(&self) -> Option<String> {
        match self {
            Self::Exploded {
                username,
                eliminated: true,
            } => Some(format!("{username} was eliminated!")),
            Self::PlayerLeft { username } => Some(format!("{username} left the game.")),
            _ => None,
        }
    }
}

/// Why an answer was not accepted. The turn is unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RejectReason {
    NotYourTurn,
    Empty,
    MissingPrompt,
    AlreadyUsed,
    NotAWord,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotYourTurn => write!(f, "it is not your turn"),
            Self::Empty => write!(f, "the answer is empty"),
            Self::MissingPrompt => write!(f, "the answer does not contain the prompt"),
            Self::AlreadyUsed => write!(f, "the word was already used this game"),
            Self::NotAWord => write!(f, "the word is not in the dictionary"),
        }
    }
}

/// End-of-game numbers, sent with `gameFinished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// Whole seconds between the start and the end of the game.
    pub duration_secs: u64,
    pub winner: Option<String>,
    pub best_guesser: Option<PlayerStatistics>,
    /// Winner first, then the rest from last eliminated to first.
    pub standings: Vec<String>,
}

impl GameSummary {
    /// The announcement posted to chat when a game ends.
    pub fn announcement(&self) -> String {
        let winner = self.winner.as_deref().unwrap_or("No one");
        let (guesser, words) = match &self.best_guesser {
            Some(stats) => (stats.username.as_str(), stats.words_found),
            None => ("No one", 0),
        };
        format!(
            "Game finished! GG!\nGame lasted {} seconds.\n{} survived!\nMost words guessed by {}, with {} words guessed!",
            self.duration_secs, winner, guesser, words
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> ClientEvent {
        serde_json::from_str(json).unwrap()
    }

    // =======================================================================
    // ClientEvent
    // =======================================================================

    #[test]
    fn test_client_event_join_game_decodes() {
        let event = decode(
            r#"{"event":"joinGame","data":{"lobbyId":"public","player":{"username":"ana","avatar":"cat.png"}}}"#,
        );
        assert_eq!(
            event,
            ClientEvent::JoinGame {
                lobby_id: LobbyId::public(),
                player: PlayerProfile {
                    username: "ana".into(),
                    avatar: Some("cat.png".into()),
                },
            }
        );
        assert_eq!(event.name(), "joinGame");
    }

    #[test]
    fn test_client_event_draft_uses_camel_case_field() {
        let event = decode(
            r#"{"event":"changeAnswerField","data":{"lobbyId":"public","username":"ana","draftText":"ca"}}"#,
        );
        assert!(matches!(
            event,
            ClientEvent::ChangeAnswerField { ref draft_text, .. } if draft_text == "ca"
        ));
    }

    #[test]
    fn test_client_event_unknown_name_fails() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"explode","data":{"lobbyId":"public"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_username() {
        let event = ClientEvent::LeaveGame {
            lobby_id: LobbyId::public(),
            username: "  ".into(),
        };
        assert!(matches!(event.validate(), Err(ProtocolError::InvalidEvent(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_message() {
        let event = ClientEvent::SendMessage {
            lobby_id: LobbyId::public(),
            username: "ana".into(),
            message: "x".repeat(MAX_MESSAGE_LEN + 1),
            avatar: None,
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_empty_answer() {
        // Emptiness is a turn rule, reported as answerRejected.
        let event = ClientEvent::SendAnswer {
            lobby_id: LobbyId::public(),
            username: "ana".into(),
            answer: String::new(),
        };
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_lobby_id() {
        let event = ClientEvent::StartGame {
            lobby_id: LobbyId::new(""),
        };
        assert!(event.validate().is_err());
    }

    // =======================================================================
    // ServerEvent
    // =======================================================================

    #[test]
    fn test_server_event_next_turn_shape() {
        let event = ServerEvent::NextTurn {
            lobby: Lobby::public("english"),
            reason: TurnReason::Exploded {
                username: "ana".into(),
                eliminated: true,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "nextTurn");
        assert_eq!(json["data"]["lobby"]["id"], "public");
        assert_eq!(json["data"]["reason"]["kind"], "exploded");
        assert_eq!(json["data"]["reason"]["eliminated"], true);
    }

    #[test]
    fn test_server_event_receive_message_is_flat_chat_message() {
        let event = ServerEvent::ReceiveMessage(ChatMessage::system(LobbyId::public(), "hi"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "receiveMessage");
        assert_eq!(json["data"]["message"], "hi");
    }

    #[test]
    fn test_reject_reason_wire_name() {
        let json = serde_json::to_string(&RejectReason::NotYourTurn).unwrap();
        assert_eq!(json, "\"notYourTurn\"");
    }

    #[test]
    fn test_summary_announcement_defaults_to_no_one() {
        let summary = GameSummary {
            duration_secs: 42,
            winner: None,
            best_guesser: None,
            standings: Vec::new(),
        };
        assert_eq!(
            summary.announcement(),
            "Game finished! GG!\nGame lasted 42 seconds.\nNo one survived!\nMost words guessed by No one, with 0 words guessed!"
        );
    }

    #[test]
    fn test_turn_reason_announcement_only_for_knockouts() {
        let passed = TurnReason::Exploded {
            username: "ana".into(),
            eliminated: false,
        };
        let eliminated = TurnReason::Exploded {
            username: "ana".into(),
            eliminated: true,
        };
        let left = TurnReason::PlayerLeft {
            username: "bo".into(),
        };

        assert_eq!(passed.announcement(), None);
        assert_eq!(TurnReason::GameStarted.announcement(), None);
        assert_eq!(eliminated.announcement().as_deref(), Some("ana was eliminated!"));
        assert_eq!(left.announcement().as_deref(), Some("bo left the game."));
    }
}
