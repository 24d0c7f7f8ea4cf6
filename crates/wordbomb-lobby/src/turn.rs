//! The turn engine: start, answer, explode, leave.
//!
//! Works on a lobby the actor has loaded and cloned. Every operation
//! either returns a [`Transition`] describing what changed or an error,
//! in which case the caller throws the working copy away. Fallible steps
//! (prompt selection, roster checks) run before the timer is touched.

use chrono::{DateTime, Utc};
use wordbomb_fuse::{BombTimer, Detonation};
use wordbomb_protocol::{
    Bomb, GameSummary, GameTurn, Lobby, LobbyStatus, Player, RejectReason, TurnReason,
};
use wordbomb_roster::{LeaveOutcome, Roster};

use crate::{LobbyConfig, LobbyError, WordOracle};

/// What an operation did to the lobby.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transition {
    /// Roster or host changed; the turn did not.
    Roster,
    /// A player was knocked out off-turn. The bomb stayed where it was.
    Knockout(TurnReason),
    /// The bomb moved to a new holder or was re-armed.
    Turn(TurnReason),
    /// An answer was refused. Nothing changed.
    Rejected(RejectReason),
    /// The game ended. The lobby is `Finished` and has no turn. `cause`
    /// is the knockout that ended it, if there was one.
    Finished {
        winner: Option<Player>,
        summary: GameSummary,
        cause: Option<TurnReason>,
    },
}

/// A turn-engine operation, as queued by the lobby actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TurnOp {
    Start,
    Leave { username: String },
    Answer { username: String, answer: String },
    Explode { generation: u64 },
}

/// One operation's worth of access to the things a turn needs.
pub(crate) struct TurnEngine<'a, W> {
    oracle: &'a W,
    timer: &'a mut BombTimer,
    config: &'a LobbyConfig,
    now: DateTime<Utc>,
}

impl<'a, W: WordOracle> TurnEngine<'a, W> {
    pub(crate) fn new(
        oracle: &'a W,
        timer: &'a mut BombTimer,
        config: &'a LobbyConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            oracle,
            timer,
            config,
            now,
        }
    }

    pub(crate) fn apply(&mut self, lobby: &mut Lobby, op: &TurnOp) -> Result<Transition, LobbyError> {
        match op {
            TurnOp::Start => self.start(lobby),
            TurnOp::Leave { username } => self.leave(lobby, username),
            TurnOp::Answer { username, answer } => self.answer(lobby, username, answer),
            TurnOp::Explode { generation } => self.explode(lobby, *generation),
        }
    }

    /// Starts a game in a waiting lobby.
    pub(crate) fn start(&mut self, lobby: &mut Lobby) -> Result<Transition, LobbyError> {
        if !lobby.status.can_transition_to(LobbyStatus::InProgress) {
            return Err(LobbyError::InvalidTransition(format!(
                "cannot start a game while {}",
                lobby.status
            )));
        }
        if lobby.players.len() < self.config.min_players {
            return Err(LobbyError::InvalidTransition(format!(
                "need at least {} players, have {}",
                self.config.min_players,
                lobby.players.len()
            )));
        }
        let prompt = self.prompt_for(lobby)?;
        let first = lobby.players[0].username.clone();

        lobby.status = LobbyStatus::InProgress;
        lobby.game_started_at = Some(self.now);
        lobby.used_words.clear();
        lobby.revive_all();
        lobby.reset_statistics();
        self.arm(lobby, first, prompt, 0);

        tracing::info!(
            lobby_id = %lobby.id,
            players = lobby.players.len(),
            "game started"
        );
        Ok(Transition::Turn(TurnReason::GameStarted))
    }

    /// Checks an answer from `username` and, if it holds, passes the bomb.
    pub(crate) fn answer(
        &mut self,
        lobby: &mut Lobby,
        username: &str,
        answer: &str,
    ) -> Result<Transition, LobbyError> {
        let Some(turn) = lobby.current_turn.as_ref().filter(|_| lobby.status.is_in_progress())
        else {
            return Err(LobbyError::InvalidTransition("no game in progress".into()));
        };

        let word = answer.trim().to_lowercase();
        let verdict = if turn.active_player != username {
            Err(RejectReason::NotYourTurn)
        } else if word.is_empty() {
            Err(RejectReason::Empty)
        } else if !word.contains(&turn.prompt.to_lowercase()) {
            Err(RejectReason::MissingPrompt)
        } else if lobby.used_words.contains(&word) {
            Err(RejectReason::AlreadyUsed)
        } else if !self.oracle.is_word(&lobby.dictionary, &word) {
            Err(RejectReason::NotAWord)
        } else {
            Ok(())
        };
        if let Err(reason) = verdict {
            tracing::debug!(lobby_id = %lobby.id, %username, %reason, "answer rejected");
            return Ok(Transition::Rejected(reason));
        }

        let Some(next) = lobby.next_alive_after(username).map(|p| p.username.clone()) else {
            return Err(LobbyError::InvalidTransition(
                "no other player to pass the bomb to".into(),
            ));
        };
        let prompt = self.prompt_for(lobby)?;

        self.timer.defuse();
        lobby.record_word(username);
        lobby.used_words.push(word.clone());
        self.arm(lobby, next, prompt, 0);

        Ok(Transition::Turn(TurnReason::Answered {
            username: username.to_string(),
            word,
        }))
    }

    /// Resolves the explosion of bomb `generation`.
    ///
    /// # Errors
    /// [`LobbyError::StaleTimer`] if that bomb is not the lobby's current
    /// one or has already exploded.
    pub(crate) fn explode(
        &mut self,
        lobby: &mut Lobby,
        generation: u64,
    ) -> Result<Transition, LobbyError> {
        if !lobby.status.is_in_progress() {
            return Err(LobbyError::StaleTimer(generation));
        }
        let Some(turn) = lobby.current_turn.as_mut() else {
            return Err(LobbyError::StaleTimer(generation));
        };
        if turn.bomb.generation != generation || !turn.bomb.explode() {
            return Err(LobbyError::StaleTimer(generation));
        }
        let holder = turn.active_player.clone();
        let prompt = turn.prompt.clone();
        let times = turn.bomb.times;

        if !lobby.player(&holder).is_some_and(|p| p.alive) {
            // The holder is gone. Move on without a penalty.
            tracing::debug!(lobby_id = %lobby.id, %holder, "bomb exploded with no holder");
            return self.pass_on(lobby, &holder, TurnReason::PlayerLeft { username: holder.clone() });
        }

        lobby.record_explosion(&holder);
        let decision = self.config.policy.decide(lobby.alive_count(), times);
        tracing::info!(
            lobby_id = %lobby.id,
            generation,
            holder = %holder,
            times = times + 1,
            ?decision,
            "bomb exploded"
        );

        match decision {
            Detonation::GameOver => Ok(self.finish(lobby, None)),
            Detonation::Eliminate => {
                lobby.eliminate(&holder)?;
                let reason = TurnReason::Exploded {
                    username: holder.clone(),
                    eliminated: true,
                };
                if lobby.alive_count() <= 1 {
                    return Ok(self.finish(lobby, Some(reason)));
                }
                self.pass_on(lobby, &holder, reason)
            }
            Detonation::Pass => {
                let Some(next) = lobby.next_alive_after(&holder).map(|p| p.username.clone())
                else {
                    return Ok(self.finish(lobby, None));
                };
                self.arm(lobby, next, prompt, times + 1);
                Ok(Transition::Turn(TurnReason::Exploded {
                    username: holder,
                    eliminated: false,
                }))
            }
        }
    }

    /// Takes `username` out of the lobby. Mid-game this may hand the bomb
    /// on or end the game.
    pub(crate) fn leave(
        &mut self,
        lobby: &mut Lobby,
        username: &str,
    ) -> Result<Transition, LobbyError> {
        let outcome = lobby.leave(username)?;
        match outcome {
            LeaveOutcome::Removed { .. } | LeaveOutcome::AlreadyEliminated => Ok(Transition::Roster),
            LeaveOutcome::Eliminated { .. } => {
                let reason = TurnReason::PlayerLeft {
                    username: username.to_string(),
                };
                if lobby.alive_count() <= 1 {
                    return Ok(self.finish(lobby, Some(reason)));
                }
                if lobby.active_player() != Some(username) {
                    return Ok(Transition::Knockout(reason));
                }
                self.pass_on(lobby, username, reason)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Arms a fresh bomb with a new prompt for whoever comes after `from`.
    fn pass_on(
        &mut self,
        lobby: &mut Lobby,
        from: &str,
        reason: TurnReason,
    ) -> Result<Transition, LobbyError> {
        let Some(next) = lobby.next_alive_after(from).map(|p| p.username.clone()) else {
            return Ok(self.finish(lobby, Some(reason)));
        };
        let prompt = self.prompt_for(lobby)?;
        self.arm(lobby, next, prompt, 0);
        Ok(Transition::Turn(reason))
    }

    fn prompt_for(&self, lobby: &Lobby) -> Result<String, LobbyError> {
        self.oracle.random_prompt(&lobby.dictionary).ok_or_else(|| {
            LobbyError::InvalidTransition(format!(
                "dictionary {} has no words to draw a prompt from",
                lobby.dictionary
            ))
        })
    }

    fn arm(&mut self, lobby: &mut Lobby, player: String, prompt: String, times: u32) {
        let fuse = self.timer.arm();
        let fuse_millis = fuse.duration.as_millis() as u64;
        let deadline = self.now + chrono::Duration::milliseconds(fuse_millis as i64);
        tracing::debug!(
            lobby_id = %lobby.id,
            generation = fuse.generation,
            active_player = %player,
            %prompt,
            times,
            "turn armed"
        );
        lobby.current_turn = Some(GameTurn {
            active_player: player,
            prompt: prompt.clone(),
            bomb: Bomb {
                generation: fuse.generation,
                prompt,
                times,
                fuse_deadline: deadline,
                fuse_millis,
                is_exploded: false,
            },
        });
    }

    /// Ends the game: no bomb, status `Finished`, summary computed.
    fn finish(&mut self, lobby: &mut Lobby, cause: Option<TurnReason>) -> Transition {
        self.timer.disarm();
        lobby.status = LobbyStatus::Finished;
        lobby.current_turn = None;

        let duration_secs = lobby
            .game_started_at
            .map(|started| (self.now - started).num_seconds().max(0) as u64)
            .unwrap_or(0);
        let winner = lobby.alive_players().first().map(|p| (*p).clone());
        let summary = GameSummary {
            duration_secs,
            winner: winner.as_ref().map(|p| p.username.clone()),
            best_guesser: lobby.best_guesser().cloned(),
            standings: lobby.standings(),
        };

        tracing::info!(
            lobby_id = %lobby.id,
            duration_secs,
            winner = summary.winner.as_deref().unwrap_or("no one"),
            "game finished"
        );
        Transition::Finished {
            winner,
            summary,
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wordbomb_fuse::FuseConfig;
    use wordbomb_protocol::{LobbyId, PlayerProfile};

    use super::*;

    /// Accepts any word, always prompts "ar".
    struct AnyWord;

    impl WordOracle for AnyWord {
        fn is_word(&self, _dictionary: &str, word: &str) -> bool {
            word != "carx"
        }

        fn random_prompt(&self, _dictionary: &str) -> Option<String> {
            Some("ar".into())
        }
    }

    struct Fixture {
        config: LobbyConfig,
        timer: BombTimer,
        lobby: Lobby,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            let config = LobbyConfig {
                fuse: FuseConfig::fixed(Duration::from_secs(20)),
                ..LobbyConfig::default()
            };
            let mut lobby = Lobby::new(LobbyId::new("t"), "Test", 8, "english");
            for name in names {
                lobby
                    .join(PlayerProfile {
                        username: (*name).into(),
                        avatar: None,
                    })
                    .unwrap();
            }
            Self {
                timer: BombTimer::new(config.fuse),
                config,
                lobby,
            }
        }

        fn engine(&mut self) -> (TurnEngine<'_, AnyWord>, &mut Lobby) {
            (
                TurnEngine::new(&AnyWord, &mut self.timer, &self.config, Utc::now()),
                &mut self.lobby,
            )
        }

        fn start(&mut self) {
            let (mut engine, lobby) = self.engine();
            engine.start(lobby).unwrap();
        }

        fn answer(&mut self, username: &str, answer: &str) -> Transition {
            let (mut engine, lobby) = self.engine();
            engine.answer(lobby, username, answer).unwrap()
        }

        fn explode(&mut self) -> Transition {
            let generation = self.lobby.bomb_generation().unwrap();
            let (mut engine, lobby) = self.engine();
            engine.explode(lobby, generation).unwrap()
        }

        fn turn(&self) -> &GameTurn {
            self.lobby.current_turn.as_ref().unwrap()
        }
    }

    #[test]
    fn test_start_with_one_player_is_invalid() {
        let mut f = Fixture::new(&["ana"]);
        let (mut engine, lobby) = f.engine();
        let err = engine.start(lobby).unwrap_err();
        assert!(matches!(err, LobbyError::InvalidTransition(_)));
        assert!(f.lobby.current_turn.is_none());
        assert!(!f.timer.is_armed());
    }

    #[test]
    fn test_start_arms_bomb_for_first_player() {
        let mut f = Fixture::new(&["ana", "bo"]);
        f.start();
        assert_eq!(f.lobby.status, LobbyStatus::InProgress);
        assert_eq!(f.turn().active_player, "ana");
        assert_eq!(f.turn().bomb.times, 0);
        assert_eq!(f.turn().bomb.fuse_millis, 20_000);
        assert_eq!(f.turn().bomb.generation, f.timer.generation());
        assert!(f.timer.is_armed());
        assert_eq!(f.lobby.players_statistics.len(), 2);
    }

    #[test]
    fn test_start_twice_is_invalid() {
        let mut f = Fixture::new(&["ana", "bo"]);
        f.start();
        let (mut engine, lobby) = f.engine();
        assert!(engine.start(lobby).is_err());
    }

    #[test]
    fn test_answer_rules() {
        let mut f = Fixture::new(&["ana", "bo"]);
        f.start();
        assert_eq!(
            f.answer("bo", "cart"),
            Transition::Rejected(RejectReason::NotYourTurn)
        );
        assert_eq!(f.answer("ana", "   "), Transition::Rejected(RejectReason::Empty));
        assert_eq!(
            f.answer("ana", "dog"),
            Transition::Rejected(RejectReason::MissingPrompt)
        );
        assert_eq!(
            f.answer("ana", "carx"),
            Transition::Rejected(RejectReason::NotAWord)
        );
        assert_eq!(f.turn().active_player, "ana");

        assert!(matches!(f.answer("ana", " CART "), Transition::Turn(_)));
        assert_eq!(f.lobby.used_words, vec!["cart"]);
        assert_eq!(
            f.answer("bo", "cart"),
            Transition::Rejected(RejectReason::AlreadyUsed)
        );
    }

    #[test]
    fn test_explode_stale_generation_is_rejected() {
        let mut f = Fixture::new(&["ana", "bo"]);
        f.start();
        let old = f.lobby.bomb_generation().unwrap();
        f.answer("ana", "cart");

        let (mut engine, lobby) = f.engine();
        let err = engine.explode(lobby, old).unwrap_err();
        assert!(matches!(err, LobbyError::StaleTimer(g) if g == old));
        assert_eq!(f.turn().active_player, "bo");
    }

    #[test]
    fn test_explode_duel_first_passes_second_eliminates() {
        let mut f = Fixture::new(&["ana", "bo"]);
        f.start();

        let first = f.explode();
        assert_eq!(
            first,
            Transition::Turn(TurnReason::Exploded {
                username: "ana".into(),
                eliminated: false
            })
        );
        assert_eq!(f.lobby.alive_count(), 2);
        assert_eq!(f.turn().active_player, "bo");
        assert_eq!(f.turn().bomb.times, 1);

        let second = f.explode();
        match second {
            Transition::Finished {
                winner,
                summary,
                cause,
            } => {
                assert_eq!(winner.unwrap().username, "ana");
                assert_eq!(summary.standings, vec!["ana", "bo"]);
                assert_eq!(
                    cause,
                    Some(TurnReason::Exploded {
                        username: "bo".into(),
                        eliminated: true
                    })
                );
            }
            other => panic!("expected Finished, got {other:?}"),
        }
        assert_eq!(f.lobby.status, LobbyStatus::Finished);
        assert!(f.lobby.current_turn.is_none());
        assert!(!f.timer.is_armed());
    }

    #[test]
    fn test_leave_active_player_passes_bomb() {
        let mut f = Fixture::new(&["ana", "bo", "cy"]);
        f.start();
        let before = f.lobby.bomb_generation().unwrap();

        let (mut engine, lobby) = f.engine();
        let transition = engine.leave(lobby, "ana").unwrap();

        assert_eq!(
            transition,
            Transition::Turn(TurnReason::PlayerLeft {
                username: "ana".into()
            })
        );
        assert_eq!(f.turn().active_player, "bo");
        assert!(f.lobby.bomb_generation().unwrap() > before);
    }

    #[test]
    fn test_leave_bystander_keeps_turn() {
        let mut f = Fixture::new(&["ana", "bo", "cy"]);
        f.start();
        let before = f.lobby.bomb_generation();

        let (mut engine, lobby) = f.engine();
        assert_eq!(
            engine.leave(lobby, "cy").unwrap(),
            Transition::Knockout(TurnReason::PlayerLeft {
                username: "cy".into()
            })
        );
        assert_eq!(f.lobby.bomb_generation(), before);
    }

    #[test]
    fn test_leave_before_start_is_roster_change() {
        let mut f = Fixture::new(&["ana", "bo"]);
        let (mut engine, lobby) = f.engine();
        assert_eq!(engine.leave(lobby, "bo").unwrap(), Transition::Roster);
    }

    #[test]
    fn test_leave_second_to_last_finishes_with_cause() {
        let mut f = Fixture::new(&["ana", "bo"]);
        f.start();

        let (mut engine, lobby) = f.engine();
        match engine.leave(lobby, "bo").unwrap() {
            Transition::Finished { winner, cause, .. } => {
                assert_eq!(winner.unwrap().username, "ana");
                assert_eq!(
                    cause,
                    Some(TurnReason::PlayerLeft {
                        username: "bo".into()
                    })
                );
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }
}
