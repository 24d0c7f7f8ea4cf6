//! Lobby snapshot types.
//!
//! Everything in here is sent to clients as-is: a `nextTurn` event carries
//! a whole [`Lobby`], and the HTTP endpoint returns the same shape. Field
//! names are camelCase on the wire because the browser client reads them
//! directly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique, stable identifier for a lobby.
///
/// Lobby ids appear in URLs (`/lobby/public`), so they are strings rather
/// than numbers. `#[serde(transparent)]` keeps the JSON a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LobbyId(pub String);

impl LobbyId {
    /// The id of the lobby every fresh server starts with.
    pub const PUBLIC: &'static str = "public";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The default public lobby's id.
    pub fn public() -> Self {
        Self::new(Self::PUBLIC)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LobbyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ---------------------------------------------------------------------------
// LobbyStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a lobby.
///
/// ```text
/// Waiting → InProgress → Finished → (clear) → Waiting
/// ```
///
/// `Finished` is short-lived: as soon as the summary is out, the lobby is
/// cleared back to `Waiting` so the same room can host the next game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LobbyStatus {
    #[default]
    Waiting,
    InProgress,
    Finished,
}

impl LobbyStatus {
    /// Returns `true` if players may join the next game.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` while a game is being played.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` if moving from `self` to `target` is a legal step.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::InProgress)
                | (Self::InProgress, Self::Finished)
                | (Self::Finished, Self::Waiting)
        )
    }
}

impl fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// What a client sends when it joins a game: just who it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// A player seated in a lobby's game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Unique within the lobby.
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// `false` once the player has been eliminated (or left mid-game).
    #[serde(default = "alive_by_default")]
    pub alive: bool,
    /// 1 for the first player knocked out, 2 for the second, and so on.
    /// `None` while the player is still alive.
    #[serde(default)]
    pub eliminated_order: Option<u32>,
}

fn alive_by_default() -> bool {
    true
}

impl Player {
    pub fn new(username: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            username: username.into(),
            avatar,
            alive: true,
            eliminated_order: None,
        }
    }
}

impl From<PlayerProfile> for Player {
    fn from(profile: PlayerProfile) -> Self {
        Self::new(profile.username, profile.avatar)
    }
}

/// Running counters for one player during one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatistics {
    pub username: String,
    /// Accepted answers. Never incremented by an explosion.
    pub words_found: u32,
    /// Explosions that went off while this player held the bomb.
    pub explosions: u32,
}

impl PlayerStatistics {
    pub fn zeroed(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            words_found: 0,
            explosions: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Turn and bomb
// ---------------------------------------------------------------------------

/// The countdown the active player is racing.
///
/// A bomb belongs to exactly one [`GameTurn`] and is replaced wholesale
/// whenever the turn advances. `generation` is unique per armed bomb within
/// a lobby; a timer that fires for any other generation is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bomb {
    pub generation: u64,
    /// The fragment the answer must contain. Carried over unchanged when
    /// the bomb explodes without an elimination.
    pub prompt: String,
    /// Consecutive explosions on this prompt so far.
    pub times: u32,
    /// Wall-clock instant the fuse runs out.
    pub fuse_deadline: DateTime<Utc>,
    /// Total fuse length, so clients can animate the burn.
    pub fuse_millis: u64,
    pub is_exploded: bool,
}

impl Bomb {
    /// Marks the bomb as exploded. Returns `false` if it already was, so
    /// a second resolution can be detected and skipped.
    pub fn explode(&mut self) -> bool {
        if self.is_exploded {
            return false;
        }
        self.is_exploded = true;
        true
    }
}

/// One unit of play: exactly one player is prompted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTurn {
    pub active_player: String,
    pub prompt: String,
    pub bomb: Bomb,
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// A named, capacity-bounded room and the state of its current game.
///
/// Invariants (upheld by the roster and turn engine, checked in tests):
/// - `players.len() <= max_players`
/// - `current_turn.is_some()` iff `status == InProgress`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lobby {
    pub id: LobbyId,
    pub name: String,
    pub max_players: usize,
    pub players: Vec<Player>,
    pub status: LobbyStatus,
    /// Which word list answers are checked against.
    pub dictionary: String,
    /// Username with lobby-management privileges in the UI.
    pub host: Option<String>,
    pub created_at: DateTime<Utc>,
    pub game_started_at: Option<DateTime<Utc>>,
    pub current_turn: Option<GameTurn>,
    pub players_statistics: Vec<PlayerStatistics>,
    /// Words already accepted this game.
    #[serde(default)]
    pub used_words: Vec<String>,
}

impl Lobby {
    /// Capacity of the default public lobby.
    pub const PUBLIC_MAX_PLAYERS: usize = 16;

    pub fn new(
        id: LobbyId,
        name: impl Into<String>,
        max_players: usize,
        dictionary: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            max_players,
            players: Vec::new(),
            status: LobbyStatus::Waiting,
            dictionary: dictionary.into(),
            host: None,
            created_at: Utc::now(),
            game_started_at: None,
            current_turn: None,
            players_statistics: Vec::new(),
            used_words: Vec::new(),
        }
    }

    /// The lobby a fresh server is seeded with.
    pub fn public(dictionary: impl Into<String>) -> Self {
        Self::new(
            LobbyId::public(),
            "Public Lobby",
            Self::PUBLIC_MAX_PLAYERS,
            dictionary,
        )
    }

    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }

    pub fn player_mut(&mut self, username: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.username == username)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// The username currently holding the bomb, if a game is running.
    pub fn active_player(&self) -> Option<&str> {
        self.current_turn.as_ref().map(|t| t.active_player.as_str())
    }

    /// Generation of the armed bomb, if any.
    pub fn bomb_generation(&self) -> Option<u64> {
        self.current_turn.as_ref().map(|t| t.bomb.generation)
    }

    /// Wipes the game and the roster, keeping identity and capacity.
    ///
    /// This is what a finished lobby goes through before it can host the
    /// next game.
    pub fn reset(&mut self) {
        self.players.clear();
        self.host = None;
        self.status = LobbyStatus::Waiting;
        self.game_started_at = None;
        self.current_turn = None;
        self.players_statistics.clear();
        self.used_words.clear();
    }

    /// A short summary for lobby listings.
    pub fn list_entry(&self) -> LobbyListEntry {
        LobbyListEntry {
            id: self.id.clone(),
            name: self.name.clone(),
            player_count: self.players.len(),
            max_players: self.max_players,
            status: self.status,
        }
    }
}

/// One row in the lobby list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyListEntry {
    pub id: LobbyId,
    pub name: String,
    pub player_count: usize,
    pub max_players: usize,
    pub status: LobbyStatus,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Typed by a player.
    Text,
    /// Generated by the server (eliminations, game summary).
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Player,
    System,
}

/// A chat line or system announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub lobby_id: LobbyId,
    pub username: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub user_type: UserType,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl ChatMessage {
    /// Display name used for server-generated lines.
    pub const SYSTEM_USERNAME: &'static str = "System Message";

    pub fn player(
        lobby_id: LobbyId,
        username: impl Into<String>,
        message: impl Into<String>,
        avatar: Option<String>,
    ) -> Self {
        Self {
            lobby_id,
            username: username.into(),
            message: message.into(),
            kind: MessageType::Text,
            user_type: UserType::Player,
            avatar,
        }
    }

    pub fn system(lobby_id: LobbyId, message: impl Into<String>) -> Self {
        Self {
            lobby_id,
            username: Self::SYSTEM_USERNAME.to_string(),
            message: message.into(),
            kind: MessageType::Server,
            user_type: UserType::System,
            avatar: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&LobbyId::public()).unwrap();
        assert_eq!(json, "\"public\"");
    }

    #[test]
    fn test_lobby_status_uses_kebab_case() {
        let json = serde_json::to_string(&LobbyStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(LobbyStatus::InProgress.to_string(), "in-progress");
    }

    #[test]
    fn test_lobby_status_transitions() {
        assert!(LobbyStatus::Waiting.can_transition_to(LobbyStatus::InProgress));
        assert!(LobbyStatus::InProgress.can_transition_to(LobbyStatus::Finished));
        assert!(LobbyStatus::Finished.can_transition_to(LobbyStatus::Waiting));
        assert!(!LobbyStatus::Waiting.can_transition_to(LobbyStatus::Finished));
        assert!(!LobbyStatus::InProgress.can_transition_to(LobbyStatus::InProgress));
    }

    #[test]
    fn test_public_lobby_defaults() {
        let lobby = Lobby::public("english");
        assert_eq!(lobby.id.as_str(), "public");
        assert_eq!(lobby.max_players, 16);
        assert_eq!(lobby.status, LobbyStatus::Waiting);
        assert!(lobby.players.is_empty());
        assert!(lobby.current_turn.is_none());
    }

    #[test]
    fn test_lobby_json_uses_camel_case_fields() {
        let json = serde_json::to_value(Lobby::public("english")).unwrap();
        assert_eq!(json["maxPlayers"], 16);
        assert!(json["currentTurn"].is_null());
        assert!(json["gameStartedAt"].is_null());
        assert_eq!(json["status"], "waiting");
        assert!(json["playersStatistics"].is_array());
    }

    #[test]
    fn test_player_deserializes_with_defaults() {
        let player: Player =
            serde_json::from_str(r#"{"username":"ana"}"#).unwrap();
        assert!(player.alive);
        assert_eq!(player.eliminated_order, None);
        assert_eq!(player.avatar, None);
    }

    #[test]
    fn test_bomb_explode_is_monotonic() {
        let mut bomb = Bomb {
            generation: 1,
            prompt: "ar".into(),
            times: 0,
            fuse_deadline: Utc::now(),
            fuse_millis: 15_000,
            is_exploded: false,
        };
        assert!(bomb.explode());
        assert!(!bomb.explode(), "second explosion must be detected");
        assert!(bomb.is_exploded);
    }

    #[test]
    fn test_lobby_reset_keeps_identity_and_capacity() {
        let mut lobby = Lobby::new(LobbyId::new("room"), "Room", 4, "english");
        lobby.host = Some("ana".into());
        lobby.players.push(Player::new("ana", None));
        lobby.status = LobbyStatus::Finished;
        lobby.game_started_at = Some(Utc::now());
        lobby.players_statistics.push(PlayerStatistics::zeroed("ana"));
        lobby.used_words.push("cart".into());

        lobby.reset();

        assert_eq!(lobby.id.as_str(), "room");
        assert_eq!(lobby.max_players, 4);
        assert!(lobby.host.is_none(), "the host left with the roster");
        assert_eq!(lobby.status, LobbyStatus::Waiting);
        assert!(lobby.players.is_empty());
        assert!(lobby.players_statistics.is_empty());
        assert!(lobby.used_words.is_empty());
        assert!(lobby.game_started_at.is_none());
    }

    #[test]
    fn test_chat_message_type_field_is_named_type() {
        let msg = ChatMessage::system(LobbyId::public(), "Game started!");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "server");
        assert_eq!(json["userType"], "system");
        assert_eq!(json["username"], "System Message");
        assert_eq!(json["lobbyId"], "public");
    }
}
