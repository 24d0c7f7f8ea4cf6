//! Lobby lifecycle for the word bomb server.
//!
//! Each lobby runs as an isolated Tokio task (actor model) that owns the
//! lobby's bomb timer and is the only writer of that lobby's stored
//! state. Everything a lobby does is pushed to its broadcast group.
//!
//! # Key types
//!
//! - [`LobbyStore`]: where lobby snapshots live ([`MemoryLobbyStore`])
//! - [`WordOracle`]: which words count ([`WordList`])
//! - [`LobbyManager`]: creates lobby actors on demand, serves snapshots
//! - [`LobbyHandle`]: send commands to a running lobby, subscribe to it
//! - [`LobbyConfig`]: player minimum, channel sizes, fuse and policy

mod actor;
mod config;
mod error;
mod manager;
mod oracle;
mod store;
mod turn;

pub use actor::{AnswerVerdict, LobbyHandle};
pub use config::LobbyConfig;
pub use error::{LobbyError, StoreError};
pub use manager::LobbyManager;
pub use oracle::{WordList, WordOracle};
pub use store::{LobbyStore, MemoryLobbyStore, seed_public_lobby};
