//! Roster rules for word bomb lobbies.
//!
//! A [`Lobby`](wordbomb_protocol::Lobby) is plain data. This crate adds the
//! rules for changing who is in it, through the [`Roster`] extension trait:
//!
//! 1. **Membership**: joining under capacity, leaving, host handoff
//! 2. **Turn order**: who is alive and who goes next
//! 3. **Elimination**: ordering knockouts so standings can be derived
//! 4. **Statistics**: words found and explosions per player
//!
//! ```text
//! Lobby actor (above)  ← calls roster methods on its working copy
//!     ↕
//! Roster (this crate)
//!     ↕
//! Protocol (below)     ← provides Lobby, Player, PlayerStatistics
//! ```

mod error;
mod roster;

pub use error::RosterError;
pub use roster::{LeaveOutcome, Roster};
