//! Bomb fuses for word bomb lobbies.
//!
//! Every turn arms a bomb with a randomized fuse. The active player has
//! until the fuse runs out to type a word; if they don't, the bomb
//! explodes and [`ExplosionPolicy`] decides what that costs them.
//!
//! # Generations
//!
//! Each arm bumps a generation counter. An expiry is only acted on if it
//! belongs to the generation that is still pending, so an answer that
//! lands in the same instant as the explosion can't resolve the turn
//! twice. [`BombTimer::claim`] enforces that.
//!
//! # Integration
//!
//! The timer sits inside a lobby actor's `tokio::select!` loop, the same
//! way a tick scheduler would:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* answers may call timer.defuse() */ }
//!         expired = timer.wait_for_explosion() => {
//!             if timer.claim(expired.generation).is_ok() {
//!                 /* resolve the explosion */
//!             }
//!         }
//!     }
//! }
//! ```

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Bounds for the randomized fuse length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseConfig {
    pub min_fuse: Duration,
    pub max_fuse: Duration,
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            min_fuse: Duration::from_secs(15),
            max_fuse: Duration::from_secs(60),
        }
    }
}

impl FuseConfig {
    /// Shortest fuse that will be accepted.
    pub const MIN_FUSE_FLOOR: Duration = Duration::from_millis(100);

    /// A config that always draws exactly `fuse`.
    pub fn fixed(fuse: Duration) -> Self {
        Self {
            min_fuse: fuse,
            max_fuse: fuse,
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`BombTimer::new`]. Rules:
    /// - `min_fuse` raised to [`Self::MIN_FUSE_FLOOR`].
    /// - `max_fuse` raised to `min_fuse` if it was below it.
    pub fn validated(mut self) -> Self {
        if self.min_fuse < Self::MIN_FUSE_FLOOR {
            warn!(
                min_ms = self.min_fuse.as_millis() as u64,
                floor_ms = Self::MIN_FUSE_FLOOR.as_millis() as u64,
                "min_fuse below floor, clamping"
            );
            self.min_fuse = Self::MIN_FUSE_FLOOR;
        }
        if self.max_fuse < self.min_fuse {
            warn!(
                min_ms = self.min_fuse.as_millis() as u64,
                max_ms = self.max_fuse.as_millis() as u64,
                "max_fuse below min_fuse, clamping"
            );
            self.max_fuse = self.min_fuse;
        }
        self
    }

    /// The range fuse lengths are drawn from.
    pub fn range(&self) -> RangeInclusive<Duration> {
        self.min_fuse..=self.max_fuse
    }

    /// Draws a fuse length uniformly from the configured bounds.
    pub fn draw(&self) -> Duration {
        let min = self.min_fuse.as_millis() as u64;
        let max = self.max_fuse.as_millis() as u64;
        if min >= max {
            return self.min_fuse;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

// ---------------------------------------------------------------------------
// Explosion policy
// ---------------------------------------------------------------------------

/// What an explosion costs, given how many players are left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detonation {
    /// Nobody is left to pass the bomb to. The game ends.
    GameOver,
    /// The active player is knocked out. The next bomb starts fresh.
    Eliminate,
    /// Nobody is knocked out. The bomb moves on with the same prompt.
    Pass,
}

/// How many consecutive explosions a prompt may survive before the
/// player holding it is knocked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplosionPolicy {
    /// Threshold with exactly two players alive.
    pub duel_threshold: u32,
    /// Threshold with three or more players alive.
    pub crowd_threshold: u32,
}

impl Default for ExplosionPolicy {
    fn default() -> Self {
        Self {
            duel_threshold: 2,
            crowd_threshold: 3,
        }
    }
}

impl ExplosionPolicy {
    /// Thresholds below 1 are raised to 1 (eliminate on every explosion).
    pub fn validated(mut self) -> Self {
        if self.duel_threshold == 0 || self.crowd_threshold == 0 {
            warn!(
                duel = self.duel_threshold,
                crowd = self.crowd_threshold,
                "explosion thresholds must be at least 1, clamping"
            );
            self.duel_threshold = self.duel_threshold.max(1);
            self.crowd_threshold = self.crowd_threshold.max(1);
        }
        self
    }

    /// Decides the outcome of an explosion.
    ///
    /// `alive` is the number of players still in the game and `times` the
    /// number of explosions this prompt had already survived.
    pub fn decide(&self, alive: usize, times: u32) -> Detonation {
        let exploded = times.saturating_add(1);
        let threshold = match alive {
            0 | 1 => return Detonation::GameOver,
            2 => self.duel_threshold,
            _ => self.crowd_threshold,
        };
        if exploded >= threshold {
            Detonation::Eliminate
        } else {
            Detonation::Pass
        }
    }
}

// ---------------------------------------------------------------------------
// Timer output
// ---------------------------------------------------------------------------

/// A freshly armed fuse, returned by [`BombTimer::arm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedFuse {
    pub generation: u64,
    /// The drawn fuse length.
    pub duration: Duration,
    /// When it runs out, on the runtime clock.
    pub deadline: Instant,
}

/// A fuse ran out. Returned by [`BombTimer::wait_for_explosion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseExpired {
    pub generation: u64,
}

/// An expiry or claim for a generation that is no longer pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleFuse {
    pub generation: u64,
    /// The generation the timer is currently on.
    pub current: u64,
}

/// Counters for one lobby's timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuseMetrics {
    pub armed: u64,
    pub defused: u64,
    pub exploded: u64,
    pub stale_discarded: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Pending {
    generation: u64,
    deadline: Instant,
}

/// The fuse for a single lobby. One `BombTimer` per lobby actor.
///
/// At most one fuse is pending at a time. Arming again replaces it, and
/// the replaced generation can never be claimed.
///
/// `Clone` captures the whole timer state, so a caller can roll back to
/// it if a transition fails after arming.
#[derive(Debug, Clone)]
pub struct BombTimer {
    config: FuseConfig,
    generation: u64,
    pending: Option<Pending>,
    /// Expired but not yet claimed.
    fired: Option<u64>,
    metrics: FuseMetrics,
}

impl BombTimer {
    pub fn new(config: FuseConfig) -> Self {
        Self {
            config: config.validated(),
            generation: 0,
            pending: None,
            fired: None,
            metrics: FuseMetrics::default(),
        }
    }

    /// Arms a new fuse with a freshly drawn length.
    pub fn arm(&mut self) -> ArmedFuse {
        let duration = self.config.draw();
        self.arm_for(duration)
    }

    /// Arms a new fuse of exactly `duration`.
    pub fn arm_for(&mut self, duration: Duration) -> ArmedFuse {
        if let Some(old) = self.pending {
            trace!(generation = old.generation, "pending fuse replaced");
        }
        self.generation += 1;
        let deadline = Instant::now() + duration;
        self.pending = Some(Pending {
            generation: self.generation,
            deadline,
        });
        self.fired = None;
        self.metrics.armed += 1;

        debug!(
            generation = self.generation,
            fuse_ms = duration.as_millis() as u64,
            "fuse armed"
        );

        ArmedFuse {
            generation: self.generation,
            duration,
            deadline,
        }
    }

    /// Takes the pending fuse out before it runs out. Returns its
    /// generation, or `None` if nothing was pending.
    pub fn defuse(&mut self) -> Option<u64> {
        let pending = self.pending.take()?;
        self.fired = None;
        self.metrics.defused += 1;
        debug!(generation = pending.generation, "fuse defused");
        Some(pending.generation)
    }

    /// Re-arms the fuse of a bomb that is already in play, keeping its
    /// generation, so it runs out after `remaining`.
    ///
    /// Picks a turn back up after its explosion could not be resolved, or
    /// after the timer was rebuilt for a game already underway. The next
    /// [`arm`](Self::arm) continues from `generation`.
    ///
    /// # Errors
    /// Returns [`StaleFuse`] if the timer has already armed a newer
    /// generation.
    pub fn resume(&mut self, generation: u64, remaining: Duration) -> Result<ArmedFuse, StaleFuse> {
        if generation < self.generation {
            return Err(StaleFuse {
                generation,
                current: self.generation,
            });
        }
        self.generation = generation;
        let deadline = Instant::now() + remaining;
        self.pending = Some(Pending {
            generation,
            deadline,
        });
        self.fired = None;

        debug!(
            generation,
            remaining_ms = remaining.as_millis() as u64,
            "fuse resumed"
        );

        Ok(ArmedFuse {
            generation,
            duration: remaining,
            deadline,
        })
    }

    /// Drops the pending fuse without counting it as defused.
    ///
    /// Used when a game ends for reasons other than an answer.
    pub fn disarm(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(generation = pending.generation, "fuse disarmed");
        }
        self.fired = None;
    }

    /// Waits until the pending fuse runs out.
    ///
    /// With nothing pending this future never resolves, so inside
    /// `tokio::select!` only the other branches make progress. It is
    /// cancel-safe: dropping it before the deadline leaves the fuse
    /// pending.
    pub async fn wait_for_explosion(&mut self) -> FuseExpired {
        let Some(pending) = self.pending else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(pending.deadline).await;

        self.pending = None;
        self.fired = Some(pending.generation);
        trace!(generation = pending.generation, "fuse ran out");
        FuseExpired {
            generation: pending.generation,
        }
    }

    /// Claims an expiry so it is resolved exactly once.
    ///
    /// # Errors
    /// Returns [`StaleFuse`] if `generation` is not the fuse that just ran
    /// out: it was defused, replaced by a newer arm, or already claimed.
    pub fn claim(&mut self, generation: u64) -> Result<(), StaleFuse> {
        if self.fired == Some(generation) {
            self.fired = None;
            self.metrics.exploded += 1;
            return Ok(());
        }
        self.metrics.stale_discarded += 1;
        debug!(generation, current = self.generation, "stale fuse discarded");
        Err(StaleFuse {
            generation,
            current: self.generation,
        })
    }

    /// Whether a fuse is currently burning.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// The most recently armed generation (0 before the first arm).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &FuseConfig {
        &self.config
    }

    pub fn metrics(&self) -> &FuseMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_default_thresholds() {
        let policy = ExplosionPolicy::default();
        assert_eq!(policy.duel_threshold, 2);
        assert_eq!(policy.crowd_threshold, 3);
    }

    #[test]
    fn test_policy_zero_threshold_is_clamped() {
        let policy = ExplosionPolicy {
            duel_threshold: 0,
            crowd_threshold: 3,
        }
        .validated();
        assert_eq!(policy.duel_threshold, 1);
        assert_eq!(policy.decide(2, 0), Detonation::Eliminate);
    }

    #[test]
    fn test_config_validated_raises_max_to_min() {
        let cfg = FuseConfig {
            min_fuse: Duration::from_secs(10),
            max_fuse: Duration::from_secs(5),
        }
        .validated();
        assert_eq!(cfg.max_fuse, Duration::from_secs(10));
    }

    #[test]
    fn test_config_draw_stays_in_bounds() {
        let cfg = FuseConfig::default();
        for _ in 0..200 {
            assert!(cfg.range().contains(&cfg.draw()));
        }
    }
}
