//! # Word Bomb
//!
//! Real-time multiplayer word bomb server.
//!
//! Players sit in a lobby and pass a bomb around. Whoever holds it must
//! type a word containing the prompt before the fuse runs out. Each lobby
//! runs as its own actor; clients talk to it over WebSocket and can read
//! snapshots over HTTP.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wordbomb::prelude::*;
//!
//! # async fn serve() -> Result<(), WordbombError> {
//! let words = WordList::new().with_dictionary("english", "cart\nstar\nharp\n");
//! let server = WordbombServer::<MemoryLobbyStore, WordList>::builder()
//!     .ws_addr("0.0.0.0:8080")
//!     .http_addr("0.0.0.0:8081")
//!     .build(MemoryLobbyStore::new(), words)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod http;
mod server;

pub use error::WordbombError;
pub use server::{ServerConfig, WordbombServer, WordbombServerBuilder};

pub mod prelude {
    pub use crate::{ServerConfig, WordbombError, WordbombServer, WordbombServerBuilder};
    pub use wordbomb_fuse::{ExplosionPolicy, FuseConfig};
    pub use wordbomb_lobby::{
        LobbyConfig, LobbyError, LobbyStore, MemoryLobbyStore, WordList, WordOracle,
    };
    pub use wordbomb_protocol::{
        ClientEvent, Lobby, LobbyId, LobbyStatus, PlayerProfile, RejectReason, ServerEvent,
        TurnReason,
    };
    pub use wordbomb_roster::RosterError;
}
