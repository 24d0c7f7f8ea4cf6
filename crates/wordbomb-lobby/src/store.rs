//! Where lobby snapshots live.
//!
//! Whole-lobby reads and writes only, no partial updates. The lobby actor
//! is the only writer for its id, so the in-memory backend is a plain map
//! behind a lock.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use wordbomb_protocol::{Lobby, LobbyId};

use crate::StoreError;

/// Durable mapping from lobby id to lobby state.
///
/// Methods return `Send` futures so a store can be awaited from spawned
/// tasks. Implementations may be written with `async fn`:
///
/// ```rust
/// use wordbomb_lobby::{LobbyStore, StoreError};
/// use wordbomb_protocol::{Lobby, LobbyId};
///
/// /// A store that is always down.
/// struct Offline;
///
/// impl LobbyStore for Offline {
///     async fn get(&self, _id: &LobbyId) -> Result<Option<Lobby>, StoreError> {
///         Err(StoreError::Unavailable("offline".into()))
///     }
///     async fn put(&self, _lobby: Lobby) -> Result<(), StoreError> {
///         Err(StoreError::Unavailable("offline".into()))
///     }
///     async fn clear(&self, _id: &LobbyId) -> Result<Option<Lobby>, StoreError> {
///         Err(StoreError::Unavailable("offline".into()))
///     }
///     async fn list(&self) -> Result<Vec<Lobby>, StoreError> {
///         Err(StoreError::Unavailable("offline".into()))
///     }
/// }
/// ```
pub trait LobbyStore: Send + Sync + 'static {
    /// Returns the lobby, or `None` if the id is unknown.
    fn get(
        &self,
        id: &LobbyId,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;

    /// Inserts or replaces the lobby stored under `lobby.id`.
    fn put(&self, lobby: Lobby) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Resets the lobby to a joinable waiting state, keeping its id, name,
    /// capacity, dictionary and creation time. Returns the cleared lobby,
    /// or `None` if the id is unknown.
    fn clear(
        &self,
        id: &LobbyId,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;

    /// Every stored lobby, ordered by id.
    fn list(&self) -> impl Future<Output = Result<Vec<Lobby>, StoreError>> + Send;
}

/// An in-memory [`LobbyStore`]. Cheap to clone; clones share the map.
#[derive(Debug, Clone, Default)]
pub struct MemoryLobbyStore {
    lobbies: Arc<RwLock<HashMap<LobbyId, Lobby>>>,
}

impl MemoryLobbyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with the given lobbies.
    pub fn with_lobbies(lobbies: impl IntoIterator<Item = Lobby>) -> Self {
        let map = lobbies.into_iter().map(|l| (l.id.clone(), l)).collect();
        Self {
            lobbies: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn len(&self) -> usize {
        self.lobbies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lobbies.read().await.is_empty()
    }
}

impl LobbyStore for MemoryLobbyStore {
    async fn get(&self, id: &LobbyId) -> Result<Option<Lobby>, StoreError> {
        Ok(self.lobbies.read().await.get(id).cloned())
    }

    async fn put(&self, lobby: Lobby) -> Result<(), StoreError> {
        self.lobbies.write().await.insert(lobby.id.clone(), lobby);
        Ok(())
    }

    async fn clear(&self, id: &LobbyId) -> Result<Option<Lobby>, StoreError> {
        let mut lobbies = self.lobbies.write().await;
        let Some(lobby) = lobbies.get_mut(id) else {
            return Ok(None);
        };
        lobby.reset();
        Ok(Some(lobby.clone()))
    }

    async fn list(&self) -> Result<Vec<Lobby>, StoreError> {
        let mut lobbies: Vec<Lobby> = self.lobbies.read().await.values().cloned().collect();
        lobbies.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(lobbies)
    }
}

/// Seeds the default public lobby if the store holds no lobbies at all.
///
/// Returns `true` if the lobby was inserted.
pub async fn seed_public_lobby<S: LobbyStore>(
    store: &S,
    dictionary: &str,
) -> Result<bool, StoreError> {
    if !store.list().await?.is_empty() {
        return Ok(false);
    }
    store.put(Lobby::public(dictionary)).await?;
    tracing::info!(lobby_id = LobbyId::PUBLIC, %dictionary, "seeded public lobby");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use wordbomb_protocol::{LobbyStatus, Player};

    use super::*;

    #[tokio::test]
    async fn test_seed_public_lobby_only_when_empty() {
        let store = MemoryLobbyStore::new();
        assert!(seed_public_lobby(&store, "english").await.unwrap());
        assert!(!seed_public_lobby(&store, "english").await.unwrap());
        assert_eq!(store.len().await, 1);

        let lobby = store.get(&LobbyId::public()).await.unwrap().unwrap();
        assert_eq!(lobby.name, "Public Lobby");
        assert_eq!(lobby.max_players, 16);
        assert_eq!(lobby.status, LobbyStatus::Waiting);
    }

    #[tokio::test]
    async fn test_seed_skips_non_empty_store() {
        let store = MemoryLobbyStore::with_lobbies([Lobby::new(
            LobbyId::new("custom"),
            "Custom",
            4,
            "english",
        )]);
        assert!(!seed_public_lobby(&store, "english").await.unwrap());
        assert!(store.get(&LobbyId::public()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_returns_none() {
        let store = MemoryLobbyStore::new();
        assert!(store.get(&LobbyId::new("nope")).await.unwrap().is_none());
        assert!(store.clear(&LobbyId::new("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_resets_game_but_keeps_identity() {
        let store = MemoryLobbyStore::new();
        let mut lobby = Lobby::public("english");
        lobby.players.push(Player::new("ana", None));
        lobby.status = LobbyStatus::Finished;
        let created_at = lobby.created_at;
        store.put(lobby).await.unwrap();

        let cleared = store.clear(&LobbyId::public()).await.unwrap().unwrap();

        assert_eq!(cleared.status, LobbyStatus::Waiting);
        assert!(cleared.players.is_empty());
        assert_eq!(cleared.max_players, 16);
        assert_eq!(cleared.created_at, created_at);
        assert_eq!(store.get(&LobbyId::public()).await.unwrap(), Some(cleared));
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_id() {
        let store = MemoryLobbyStore::with_lobbies([
            Lobby::new(LobbyId::new("b"), "B", 4, "english"),
            Lobby::new(LobbyId::new("a"), "A", 4, "english"),
        ]);
        let ids: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id.0)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
