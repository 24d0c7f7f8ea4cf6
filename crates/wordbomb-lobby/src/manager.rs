//! Lobby manager: starts lobby actors on demand and serves snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use wordbomb_protocol::{Lobby, LobbyId, LobbyListEntry};

use crate::actor::spawn_lobby;
use crate::{LobbyConfig, LobbyError, LobbyHandle, LobbyStore, WordOracle};

/// Tracks one running actor per lobby id.
///
/// This is the entry point for lobby operations from the server. Actors
/// are created lazily the first time a lobby is addressed, and only for
/// ids the store knows about.
pub struct LobbyManager<S, W> {
    store: Arc<S>,
    oracle: Arc<W>,
    config: LobbyConfig,
    /// Running actors, keyed by lobby id. Lookups share the read lock.
    /// Spawning re-checks under the write lock, so two callers can never
    /// start the same lobby twice. The store is never awaited while the
    /// lock is held.
    lobbies: RwLock<HashMap<LobbyId, LobbyHandle>>,
}

impl<S: LobbyStore, W: WordOracle> LobbyManager<S, W> {
    pub fn new(store: Arc<S>, oracle: Arc<W>, config: LobbyConfig) -> Self {
        Self {
            store,
            oracle,
            config: config.validated(),
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Returns the handle for a lobby, starting its actor if needed.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`] if the store has no such lobby.
    pub async fn handle(&self, id: &LobbyId) -> Result<LobbyHandle, LobbyError> {
        if let Some(handle) = live(&*self.lobbies.read().await, id) {
            return Ok(handle);
        }

        if self.store.get(id).await?.is_none() {
            return Err(LobbyError::NotFound(id.clone()));
        }

        let mut lobbies = self.lobbies.write().await;
        if let Some(handle) = live(&lobbies, id) {
            return Ok(handle);
        }
        if lobbies.contains_key(id) {
            tracing::debug!(lobby_id = %id, "lobby actor gone, restarting");
        }
        let handle = spawn_lobby(
            id.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.oracle),
            self.config.clone(),
        );
        lobbies.insert(id.clone(), handle.clone());
        Ok(handle)
    }

    /// The stored lobby, read without going through its actor.
    ///
    /// # Errors
    /// [`LobbyError::NotFound`] if the store has no such lobby.
    pub async fn snapshot(&self, id: &LobbyId) -> Result<Lobby, LobbyError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| LobbyError::NotFound(id.clone()))
    }

    /// A summary row for every stored lobby.
    pub async fn list(&self) -> Result<Vec<LobbyListEntry>, LobbyError> {
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .map(Lobby::list_entry)
            .collect())
    }

    /// Number of lobby actors currently running.
    pub async fn running(&self) -> usize {
        self.lobbies
            .read()
            .await
            .values()
            .filter(|h| !h.is_closed())
            .count()
    }

    /// Stops every lobby actor.
    pub async fn shutdown(&self) {
        let handles: Vec<LobbyHandle> = self.lobbies.write().await.drain().map(|(_, h)| h).collect();
        for handle in handles {
            let _ = handle.shutdown().await;
        }
        tracing::info!("all lobby actors stopped");
    }
}

fn live(lobbies: &HashMap<LobbyId, LobbyHandle>, id: &LobbyId) -> Option<LobbyHandle> {
    lobbies.get(id).filter(|h| !h.is_closed()).cloned()
}
