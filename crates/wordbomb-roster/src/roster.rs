//! Membership, turn order, and statistics rules over a [`Lobby`].
//!
//! The trait is implemented directly on [`Lobby`] so callers holding a
//! working copy can write `lobby.join(profile)?` without a wrapper type.
//! Nothing here touches timers or the store. The lobby actor decides when
//! to call these and what to broadcast afterwards.

use wordbomb_protocol::{Lobby, Player, PlayerProfile, PlayerStatistics};

use crate::RosterError;

/// What happened to a player who left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Removed from a lobby that wasn't playing. `new_host` is set when the
    /// leaver was the host and someone else inherited the role.
    Removed { new_host: Option<String> },
    /// Left mid-game and was counted as knocked out.
    Eliminated { order: u32 },
    /// Left mid-game after already being knocked out. Nothing changed.
    AlreadyEliminated,
}

/// Roster operations on a lobby.
pub trait Roster {
    /// Seats a new player.
    ///
    /// # Errors
    /// - [`RosterError::GameInProgress`] unless the lobby is waiting
    /// - [`RosterError::DuplicatePlayer`] if the username is taken
    /// - [`RosterError::CapacityExceeded`] if the lobby is full
    ///
    /// On error the roster is unchanged.
    fn join(&mut self, profile: PlayerProfile) -> Result<(), RosterError>;

    /// Takes a player out. Mid-game this eliminates rather than removes,
    /// so standings can still be computed at the end.
    ///
    /// # Errors
    /// Returns [`RosterError::UnknownPlayer`] if nobody has that username.
    fn leave(&mut self, username: &str) -> Result<LeaveOutcome, RosterError>;

    /// Alive players in roster order. This is the turn order.
    fn alive_players(&self) -> Vec<&Player>;

    fn alive_count(&self) -> usize;

    /// The next alive player after `username` in roster order, wrapping
    /// around. `username` itself need not be alive. If they aren't seated
    /// at all, the first alive player is returned.
    ///
    /// Returns `None` when nobody else is alive.
    fn next_alive_after(&self, username: &str) -> Option<&Player>;

    /// Knocks a player out and returns their elimination order.
    ///
    /// Eliminating someone who is already out returns their existing
    /// order unchanged.
    ///
    /// # Errors
    /// Returns [`RosterError::UnknownPlayer`] if nobody has that username.
    fn eliminate(&mut self, username: &str) -> Result<u32, RosterError>;

    /// Marks every seated player alive again, for a fresh game.
    fn revive_all(&mut self);

    /// Replaces statistics with one zeroed entry per seated player.
    fn reset_statistics(&mut self);

    fn record_word(&mut self, username: &str);

    fn record_explosion(&mut self, username: &str);

    /// The first player with the most words found.
    fn best_guesser(&self) -> Option<&PlayerStatistics>;

    /// Winner first, then everyone else from last knocked out to first.
    fn standings(&self) -> Vec<String>;
}

impl Roster for Lobby {
    fn join(&mut self, profile: PlayerProfile) -> Result<(), RosterError> {
        if !self.status.is_joinable() {
            return Err(RosterError::GameInProgress);
        }
        if self.player(&profile.username).is_some() {
            return Err(RosterError::DuplicatePlayer(profile.username));
        }
        if self.is_full() {
            return Err(RosterError::CapacityExceeded {
                max: self.max_players,
            });
        }

        if self.host.is_none() {
            self.host = Some(profile.username.clone());
        }
        tracing::info!(lobby_id = %self.id, username = %profile.username, "player joined");
        self.players.push(Player::from(profile));
        Ok(())
    }

    fn leave(&mut self, username: &str) -> Result<LeaveOutcome, RosterError> {
        let index = self
            .players
            .iter()
            .position(|p| p.username == username)
            .ok_or_else(|| RosterError::UnknownPlayer(username.to_string()))?;

        if self.status.is_in_progress() {
            if !self.players[index].alive {
                return Ok(LeaveOutcome::AlreadyEliminated);
            }
            let order = self.eliminate(username)?;
            tracing::info!(lobby_id = %self.id, %username, order, "player left mid-game");
            return Ok(LeaveOutcome::Eliminated { order });
        }

        self.players.remove(index);
        self.players_statistics.retain(|s| s.username != username);

        let mut new_host = None;
        if self.host.as_deref() == Some(username) {
            // The player who was seated after the leaver now sits at `index`.
            self.host = self
                .players
                .get(index)
                .or_else(|| self.players.first())
                .map(|p| p.username.clone());
            new_host = self.host.clone();
        }
        tracing::info!(lobby_id = %self.id, %username, "player left");
        Ok(LeaveOutcome::Removed { new_host })
    }

    fn alive_players(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| p.alive).collect()
    }

    fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    fn next_alive_after(&self, username: &str) -> Option<&Player> {
        let len = self.players.len();
        if len == 0 {
            return None;
        }
        let Some(start) = self.players.iter().position(|p| p.username == username) else {
            return self.players.iter().find(|p| p.alive);
        };
        (1..len)
            .map(|offset| &self.players[(start + offset) % len])
            .find(|p| p.alive)
    }

    fn eliminate(&mut self, username: &str) -> Result<u32, RosterError> {
        let next_order = self
            .players
            .iter()
            .filter_map(|p| p.eliminated_order)
            .max()
            .unwrap_or(0)
            + 1;

        let player = self
            .player_mut(username)
            .ok_or_else(|| RosterError::UnknownPlayer(username.to_string()))?;
        if let Some(order) = player.eliminated_order {
            return Ok(order);
        }
        player.alive = false;
        player.eliminated_order = Some(next_order);
        Ok(next_order)
    }

    fn revive_all(&mut self) {
        for player in &mut self.players {
            player.alive = true;
            player.eliminated_order = None;
        }
    }

    fn reset_statistics(&mut self) {
        self.players_statistics = self
            .players
            .iter()
            .map(|p| PlayerStatistics::zeroed(&p.username))
            .collect();
    }

    fn record_word(&mut self, username: &str) {
        stats_entry(self, username).words_found += 1;
    }

    fn record_explosion(&mut self, username: &str) {
        stats_entry(self, username).explosions += 1;
    }

    fn best_guesser(&self) -> Option<&PlayerStatistics> {
        // Strictly greater keeps the earliest entry on ties.
        self.players_statistics.iter().fold(None, |best, s| match best {
            Some(b) if b.words_found >= s.words_found => Some(b),
            _ => Some(s),
        })
    }

    fn standings(&self) -> Vec<String> {
        let mut out: Vec<&Player> = self.players.iter().filter(|p| p.alive).collect();
        let mut out_of_game: Vec<&Player> = self.players.iter().filter(|p| !p.alive).collect();
        out_of_game.sort_by(|a, b| b.eliminated_order.cmp(&a.eliminated_order));
        out.extend(out_of_game);
        out.into_iter().map(|p| p.username.clone()).collect()
    }
}

/// Finds the player's statistics entry, creating a zeroed one if missing.
fn stats_entry<'a>(lobby: &'a mut Lobby, username: &str) -> &'a mut PlayerStatistics {
    let index = match lobby
        .players_statistics
        .iter()
        .position(|s| s.username == username)
    {
        Some(index) => index,
        None => {
            lobby
                .players_statistics
                .push(PlayerStatistics::zeroed(username));
            lobby.players_statistics.len() - 1
        }
    };
    &mut lobby.players_statistics[index]
}

#[cfg(test)]
mod tests {
    use wordbomb_protocol::{LobbyId, LobbyStatus};

    use super::*;

    fn profile(name: &str) -> PlayerProfile {
        PlayerProfile {
            username: name.into(),
            avatar: None,
        }
    }

    fn lobby_with(names: &[&str]) -> Lobby {
        let mut lobby = Lobby::new(LobbyId::new("t"), "Test", 8, "english");
        for name in names {
            lobby.join(profile(name)).unwrap();
        }
        lobby
    }

    #[test]
    fn test_join_first_player_becomes_host() {
        let lobby = lobby_with(&["ana", "bo"]);
        assert_eq!(lobby.host.as_deref(), Some("ana"));
    }

    #[test]
    fn test_join_while_in_progress_is_rejected() {
        let mut lobby = lobby_with(&["ana", "bo"]);
        lobby.status = LobbyStatus::InProgress;
        assert_eq!(lobby.join(profile("cy")), Err(RosterError::GameInProgress));
        assert_eq!(lobby.players.len(), 2);
    }

    #[test]
    fn test_join_finished_lobby_is_rejected() {
        let mut lobby = lobby_with(&["ana", "bo"]);
        lobby.status = LobbyStatus::Finished;
        assert_eq!(lobby.join(profile("cy")), Err(RosterError::GameInProgress));
    }

    #[test]
    fn test_next_alive_after_wraps_and_skips_dead() {
        let mut lobby = lobby_with(&["ana", "bo", "cy"]);
        lobby.eliminate("ana").unwrap();
        assert_eq!(lobby.next_alive_after("cy").unwrap().username, "bo");
        assert_eq!(lobby.next_alive_after("bo").unwrap().username, "cy");
    }

    #[test]
    fn test_next_alive_after_only_self_alive_returns_none() {
        let mut lobby = lobby_with(&["ana", "bo"]);
        lobby.eliminate("bo").unwrap();
        assert!(lobby.next_alive_after("ana").is_none());
    }

    #[test]
    fn test_eliminate_twice_keeps_first_order() {
        let mut lobby = lobby_with(&["ana", "bo", "cy"]);
        assert_eq!(lobby.eliminate("bo").unwrap(), 1);
        assert_eq!(lobby.eliminate("ana").unwrap(), 2);
        assert_eq!(lobby.eliminate("bo").unwrap(), 1);
    }

    #[test]
    fn test_leave_host_while_waiting_hands_off() {
        let mut lobby = lobby_with(&["ana", "bo", "cy"]);
        let outcome = lobby.leave("ana").unwrap();
        assert_eq!(
            outcome,
            LeaveOutcome::Removed {
                new_host: Some("bo".into())
            }
        );
        assert_eq!(lobby.host.as_deref(), Some("bo"));
    }

    #[test]
    fn test_leave_last_host_clears_host() {
        let mut lobby = lobby_with(&["ana"]);
        lobby.leave("ana").unwrap();
        assert!(lobby.host.is_none());
    }

    #[test]
    fn test_record_word_creates_missing_entry() {
        let mut lobby = lobby_with(&["ana"]);
        lobby.record_word("ana");
        lobby.record_word("ana");
        lobby.record_explosion("ana");
        assert_eq!(lobby.players_statistics.len(), 1);
        assert_eq!(lobby.players_statistics[0].words_found, 2);
        assert_eq!(lobby.players_statistics[0].explosions, 1);
    }

    #[test]
    fn test_best_guesser_empty_is_none() {
        let lobby = lobby_with(&[]);
        assert!(lobby.best_guesser().is_none());
    }
}
