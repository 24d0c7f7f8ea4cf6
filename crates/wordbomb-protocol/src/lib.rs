//! Wire protocol for the word bomb server.
//!
//! - **Types** ([`Lobby`], [`Player`], [`Bomb`], [`ChatMessage`], ...) are
//!   the snapshots clients render.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) are the named messages
//!   that travel over the socket.
//! - **Codec** ([`Codec`], [`JsonCodec`]) turns events into bytes.
//!
//! This crate knows nothing about connections or timers. It only knows
//! what the messages look like.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Lobby actor
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    ClientEvent, GameSummary, MAX_ANSWER_LEN, MAX_MESSAGE_LEN, MAX_USERNAME_LEN, RejectReason,
    ServerEvent, TurnReason,
};
pub use types::{
    Bomb, ChatMessage, GameTurn, Lobby, LobbyId, LobbyListEntry, LobbyStatus, MessageType,
    Player, PlayerProfile, PlayerStatistics, UserType,
};
