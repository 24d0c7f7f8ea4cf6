//! Lobby configuration.

use std::time::Duration;

use wordbomb_fuse::{ExplosionPolicy, FuseConfig};

/// Settings shared by every lobby actor a manager spawns.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// Minimum players required to start a game.
    pub min_players: usize,

    /// Dictionary the seeded public lobby checks answers against.
    pub default_dictionary: String,

    /// Events buffered per lobby before slow subscribers start lagging.
    pub broadcast_capacity: usize,

    /// Chat lines kept in memory per lobby.
    pub chat_log_size: usize,

    /// Command channel size per lobby actor. Senders wait when full.
    pub channel_size: usize,

    pub fuse: FuseConfig,

    pub policy: ExplosionPolicy,

    /// How long to wait before trying again when an explosion could not
    /// be resolved, e.g. because the store was unavailable.
    pub explosion_retry: Duration,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            default_dictionary: "english".to_string(),
            broadcast_capacity: 256,
            chat_log_size: 100,
            channel_size: 64,
            fuse: FuseConfig::default(),
            policy: ExplosionPolicy::default(),
            explosion_retry: Duration::from_secs(1),
        }
    }
}

impl LobbyConfig {
    const MIN_EXPLOSION_RETRY: Duration = Duration::from_millis(100);

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called by [`LobbyManager::new`](crate::LobbyManager::new). A game
    /// needs at least two players, and every channel needs room for at
    /// least one item. Explosion retries are spaced at least 100 ms apart.
    pub fn validated(mut self) -> Self {
        if self.min_players < 2 {
            tracing::warn!(min_players = self.min_players, "min_players below 2, clamping");
            self.min_players = 2;
        }
        self.broadcast_capacity = self.broadcast_capacity.max(1);
        self.channel_size = self.channel_size.max(1);
        self.fuse = self.fuse.validated();
        self.policy = self.policy.validated();
        self.explosion_retry = self.explosion_retry.max(Self::MIN_EXPLOSION_RETRY);
        self
    }
}
