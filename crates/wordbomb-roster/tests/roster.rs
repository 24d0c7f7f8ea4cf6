//! Integration tests for roster rules.

use wordbomb_protocol::{Lobby, LobbyId, LobbyStatus, PlayerProfile, PlayerStatistics};
use wordbomb_roster::{LeaveOutcome, Roster, RosterError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn profile(name: &str) -> PlayerProfile {
    PlayerProfile {
        username: name.into(),
        avatar: Some(format!("{name}.png")),
    }
}

fn stats(name: &str, words: u32) -> PlayerStatistics {
    PlayerStatistics {
        username: name.into(),
        words_found: words,
        explosions: 0,
    }
}

// =========================================================================
// Capacity
// =========================================================================

#[test]
fn test_join_full_lobby_returns_capacity_exceeded() {
    let mut lobby = Lobby::new(LobbyId::new("small"), "Small", 2, "english");
    lobby.join(profile("ana")).unwrap();
    lobby.join(profile("bo")).unwrap();

    let before = lobby.players.clone();
    let result = lobby.join(profile("cy"));

    assert_eq!(result, Err(RosterError::CapacityExceeded { max: 2 }));
    assert_eq!(lobby.players, before, "roster must be unchanged");
}

#[test]
fn test_join_never_exceeds_max_players() {
    let mut lobby = Lobby::public("english");
    for i in 0..40 {
        let _ = lobby.join(profile(&format!("p{i}")));
        assert!(lobby.players.len() <= lobby.max_players);
    }
    assert_eq!(lobby.players.len(), Lobby::PUBLIC_MAX_PLAYERS);
}

#[test]
fn test_join_duplicate_username_is_rejected() {
    let mut lobby = Lobby::public("english");
    lobby.join(profile("ana")).unwrap();
    assert_eq!(
        lobby.join(profile("ana")),
        Err(RosterError::DuplicatePlayer("ana".into()))
    );
    assert_eq!(lobby.players.len(), 1);
}

// =========================================================================
// Leaving
// =========================================================================

#[test]
fn test_leave_waiting_lobby_removes_player() {
    let mut lobby = Lobby::public("english");
    lobby.join(profile("ana")).unwrap();
    lobby.join(profile("bo")).unwrap();

    let outcome = lobby.leave("bo").unwrap();

    assert_eq!(outcome, LeaveOutcome::Removed { new_host: None });
    assert!(lobby.player("bo").is_none());
}

#[test]
fn test_leave_in_progress_marks_eliminated() {
    let mut lobby = Lobby::public("english");
    lobby.join(profile("ana")).unwrap();
    lobby.join(profile("bo")).unwrap();
    lobby.status = LobbyStatus::InProgress;

    let outcome = lobby.leave("bo").unwrap();

    assert_eq!(outcome, LeaveOutcome::Eliminated { order: 1 });
    let bo = lobby.player("bo").expect("still seated");
    assert!(!bo.alive);
    assert_eq!(bo.eliminated_order, Some(1));
    assert_eq!(lobby.leave("bo").unwrap(), LeaveOutcome::AlreadyEliminated);
}

#[test]
fn test_leave_unknown_player_returns_error() {
    let mut lobby = Lobby::public("english");
    assert_eq!(
        lobby.leave("ghost"),
        Err(RosterError::UnknownPlayer("ghost".into()))
    );
}

// =========================================================================
// Statistics and standings
// =========================================================================

#[test]
fn test_best_guesser_picks_first_maximum() {
    let mut lobby = Lobby::public("english");
    lobby.players_statistics = vec![stats("a", 3), stats("b", 5), stats("c", 5)];
    assert_eq!(lobby.best_guesser().unwrap().username, "b");
}

#[test]
fn test_reset_statistics_zeroes_every_seated_player() {
    let mut lobby = Lobby::public("english");
    lobby.join(profile("ana")).unwrap();
    lobby.join(profile("bo")).unwrap();
    lobby.players_statistics = vec![stats("ana", 7), stats("gone", 2)];

    lobby.reset_statistics();

    assert_eq!(
        lobby.players_statistics,
        vec![PlayerStatistics::zeroed("ana"), PlayerStatistics::zeroed("bo")]
    );
}

#[test]
fn test_standings_winner_first_then_reverse_elimination() {
    let mut lobby = Lobby::public("english");
    for name in ["ana", "bo", "cy", "di"] {
        lobby.join(profile(name)).unwrap();
    }
    lobby.eliminate("cy").unwrap();
    lobby.eliminate("ana").unwrap();
    lobby.eliminate("di").unwrap();

    assert_eq!(lobby.standings(), vec!["bo", "di", "ana", "cy"]);
}

#[test]
fn test_revive_all_clears_elimination() {
    let mut lobby = Lobby::public("english");
    lobby.join(profile("ana")).unwrap();
    lobby.join(profile("bo")).unwrap();
    lobby.eliminate("ana").unwrap();

    lobby.revive_all();

    assert_eq!(lobby.alive_count(), 2);
    assert!(lobby.players.iter().all(|p| p.eliminated_order.is_none()));
}
