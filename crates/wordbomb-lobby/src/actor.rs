//! Lobby actor: an isolated Tokio task that owns one lobby's game.
//!
//! Each lobby runs in its own task and is the only writer of its stored
//! state. Commands arrive over a bounded mpsc channel and are handled one
//! at a time, and the bomb timer is awaited in the same `select!` loop,
//! so an answer and an explosion can never interleave.
//!
//! Every operation is a read-modify-write: load the lobby, change a
//! working copy, write it back only if the whole change succeeded, then
//! broadcast. Replies go out after the broadcast so a caller that also
//! subscribes sees its own change first.
//!
//! The stored bomb outlives the actor's timer. An actor started for a
//! game already underway re-arms the stored bomb's remaining fuse, and an
//! explosion that could not be resolved is retried on a short fuse.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use wordbomb_fuse::BombTimer;
use wordbomb_protocol::{
    ChatMessage, Lobby, LobbyId, LobbyStatus, PlayerProfile, RejectReason, ServerEvent,
    TurnReason,
};
use wordbomb_roster::Roster;

use crate::turn::{Transition, TurnEngine, TurnOp};
use crate::{LobbyConfig, LobbyError, LobbyStore, WordOracle};

/// Outcome of an answer that reached the turn engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerVerdict {
    Accepted,
    Rejected(RejectReason),
}

type Reply<T> = oneshot::Sender<Result<T, LobbyError>>;

/// Commands sent to a lobby actor through its channel.
pub(crate) enum LobbyCommand {
    Join {
        profile: PlayerProfile,
        reply: Reply<Lobby>,
    },
    Leave {
        username: String,
        reply: Reply<Lobby>,
    },
    Start {
        reply: Reply<Lobby>,
    },
    Answer {
        username: String,
        answer: String,
        reply: Reply<AnswerVerdict>,
    },
    /// Live typing from the active player (fire-and-forget).
    Draft { username: String, draft_text: String },
    /// A chat line (fire-and-forget).
    Chat {
        username: String,
        message: String,
        avatar: Option<String>,
    },
    Snapshot {
        reply: Reply<Lobby>,
    },
    History {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running lobby actor.
///
/// Cheap to clone: an `mpsc::Sender` for commands plus the lobby's
/// `broadcast::Sender` for subscribing. The manager holds one per lobby.
#[derive(Clone)]
pub struct LobbyHandle {
    lobby_id: LobbyId,
    sender: mpsc::Sender<LobbyCommand>,
    events: broadcast::Sender<ServerEvent>,
}

impl std::fmt::Debug for LobbyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHandle")
            .field("lobby_id", &self.lobby_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl LobbyHandle {
    pub fn lobby_id(&self) -> &LobbyId {
        &self.lobby_id
    }

    /// Joins this lobby's broadcast group. Events sent before this call
    /// are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn join(&self, profile: PlayerProfile) -> Result<Lobby, LobbyError> {
        self.request(|reply| LobbyCommand::Join { profile, reply })
            .await
    }

    pub async fn leave(&self, username: impl Into<String>) -> Result<Lobby, LobbyError> {
        let username = username.into();
        self.request(|reply| LobbyCommand::Leave { username, reply })
            .await
    }

    pub async fn start(&self) -> Result<Lobby, LobbyError> {
        self.request(|reply| LobbyCommand::Start { reply }).await
    }

    pub async fn answer(
        &self,
        username: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<AnswerVerdict, LobbyError> {
        let (username, answer) = (username.into(), answer.into());
        self.request(|reply| LobbyCommand::Answer {
            username,
            answer,
            reply,
        })
        .await
    }

    /// Relays typing to everyone watching (fire-and-forget).
    pub async fn draft(
        &self,
        username: impl Into<String>,
        draft_text: impl Into<String>,
    ) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Draft {
            username: username.into(),
            draft_text: draft_text.into(),
        })
        .await
    }

    /// Posts a chat line (fire-and-forget).
    pub async fn chat(
        &self,
        username: impl Into<String>,
        message: impl Into<String>,
        avatar: Option<String>,
    ) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Chat {
            username: username.into(),
            message: message.into(),
            avatar,
        })
        .await
    }

    /// The lobby as the actor currently sees it.
    pub async fn snapshot(&self) -> Result<Lobby, LobbyError> {
        self.request(|reply| LobbyCommand::Snapshot { reply }).await
    }

    /// Recent chat lines, oldest first.
    pub async fn history(&self) -> Result<Vec<ChatMessage>, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::History { reply: reply_tx }).await?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.lobby_id.clone()))
    }

    /// Tells the actor to stop. Any armed fuse is dropped with it.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Shutdown).await
    }

    async fn send(&self, cmd: LobbyCommand) -> Result<(), LobbyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| LobbyError::Unavailable(self.lobby_id.clone()))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> LobbyCommand,
    ) -> Result<T, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(build(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| LobbyError::Unavailable(self.lobby_id.clone()))?
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal lobby actor state. Runs inside a Tokio task.
struct LobbyActor<S, W> {
    lobby_id: LobbyId,
    store: Arc<S>,
    oracle: Arc<W>,
    config: LobbyConfig,
    timer: BombTimer,
    chat_log: VecDeque<ChatMessage>,
    events: broadcast::Sender<ServerEvent>,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl<S: LobbyStore, W: WordOracle> LobbyActor<S, W> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(lobby_id = %self.lobby_id, "lobby actor started");
        self.resume_turn().await;

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if matches!(cmd, LobbyCommand::Shutdown) {
                        tracing::info!(lobby_id = %self.lobby_id, "lobby shutting down");
                        break;
                    }
                    self.handle_command(cmd).await;
                }
                expired = self.timer.wait_for_explosion() => {
                    self.handle_expiry(expired.generation).await;
                }
            }
        }

        tracing::info!(
            lobby_id = %self.lobby_id,
            metrics = ?self.timer.metrics(),
            "lobby actor stopped"
        );
    }

    async fn handle_command(&mut self, cmd: LobbyCommand) {
        match cmd {
            LobbyCommand::Join { profile, reply } => {
                let result = self.join(profile).await;
                let _ = reply.send(result);
            }
            LobbyCommand::Leave { username, reply } => {
                let result = self
                    .transact(TurnOp::Leave { username })
                    .await
                    .map(|(lobby, _)| lobby);
                let _ = reply.send(result);
            }
            LobbyCommand::Start { reply } => {
                let result = self
                    .transact(TurnOp::Start)
                    .await
                    .map(|(lobby, _)| lobby);
                let _ = reply.send(result);
            }
            LobbyCommand::Answer {
                username,
                answer,
                reply,
            } => {
                let op = TurnOp::Answer {
                    username: username.clone(),
                    answer: answer.clone(),
                };
                let result = match self.transact(op).await {
                    Ok((_, Transition::Rejected(reason))) => {
                        self.broadcast(ServerEvent::AnswerRejected {
                            lobby_id: self.lobby_id.clone(),
                            username,
                            answer,
                            reason,
                        });
                        Ok(AnswerVerdict::Rejected(reason))
                    }
                    Ok(_) => Ok(AnswerVerdict::Accepted),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            LobbyCommand::Draft {
                username,
                draft_text,
            } => self.draft(username, draft_text).await,
            LobbyCommand::Chat {
                username,
                message,
                avatar,
            } => {
                let msg = ChatMessage::player(self.lobby_id.clone(), username, message, avatar);
                self.post(msg);
            }
            LobbyCommand::Snapshot { reply } => {
                let _ = reply.send(self.load().await);
            }
            LobbyCommand::History { reply } => {
                let _ = reply.send(self.chat_log.iter().cloned().collect());
            }
            // Handled by the run loop.
            LobbyCommand::Shutdown => {}
        }
    }

    async fn handle_expiry(&mut self, generation: u64) {
        if self.timer.claim(generation).is_err() {
            return;
        }
        match self.transact(TurnOp::Explode { generation }).await {
            Ok(_) => {}
            Err(LobbyError::StaleTimer(generation)) => {
                tracing::debug!(lobby_id = %self.lobby_id, generation, "stale explosion ignored");
            }
            Err(e @ LobbyError::NotFound(_)) => {
                tracing::error!(lobby_id = %self.lobby_id, generation, error = %e, "explosion failed");
            }
            Err(e) => {
                let retry = self.config.explosion_retry;
                tracing::error!(
                    lobby_id = %self.lobby_id,
                    generation,
                    error = %e,
                    retry_ms = retry.as_millis() as u64,
                    "explosion failed, retrying"
                );
                if let Err(stale) = self.timer.resume(generation, retry) {
                    tracing::debug!(lobby_id = %self.lobby_id, ?stale, "explosion retry superseded");
                }
            }
        }
    }

    /// Re-arms the stored bomb if this actor starts in the middle of a
    /// game. A fuse whose deadline has passed goes off right away.
    async fn resume_turn(&mut self) {
        let lobby = match self.load().await {
            Ok(lobby) => lobby,
            Err(e) => {
                tracing::warn!(lobby_id = %self.lobby_id, error = %e, "could not check for a running game");
                return;
            }
        };
        if !lobby.status.is_in_progress() {
            return;
        }
        let Some(bomb) = lobby
            .current_turn
            .as_ref()
            .map(|turn| &turn.bomb)
            .filter(|bomb| !bomb.is_exploded)
        else {
            return;
        };

        let remaining = (bomb.fuse_deadline - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        match self.timer.resume(bomb.generation, remaining) {
            Ok(fuse) => tracing::info!(
                lobby_id = %self.lobby_id,
                generation = fuse.generation,
                remaining_ms = remaining.as_millis() as u64,
                "resumed running game"
            ),
            Err(stale) => {
                tracing::debug!(lobby_id = %self.lobby_id, ?stale, "stored bomb already replaced");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    async fn join(&mut self, profile: PlayerProfile) -> Result<Lobby, LobbyError> {
        let mut lobby = self.load().await?;
        lobby.join(profile)?;
        self.commit(&lobby).await?;
        self.broadcast(ServerEvent::LobbyUpdated {
            lobby: lobby.clone(),
        });
        Ok(lobby)
    }

    async fn draft(&mut self, username: String, draft_text: String) {
        let lobby = match self.load().await {
            Ok(lobby) => lobby,
            Err(e) => {
                tracing::debug!(lobby_id = %self.lobby_id, error = %e, "draft dropped");
                return;
            }
        };
        if lobby.active_player() != Some(username.as_str()) {
            tracing::debug!(lobby_id = %self.lobby_id, %username, "draft from inactive player dropped");
            return;
        }
        self.broadcast(ServerEvent::AnswerFieldChanged {
            lobby_id: self.lobby_id.clone(),
            username,
            draft_text,
        });
    }

    /// Loads the lobby, runs one turn-engine operation on a copy, writes
    /// it back, and broadcasts the result.
    ///
    /// If the operation or the write fails, the stored lobby and the timer
    /// are left exactly as they were.
    ///
    /// A rejected answer changes nothing, so it is neither written nor
    /// broadcast here.
    async fn transact(&mut self, op: TurnOp) -> Result<(Lobby, Transition), LobbyError> {
        let mut lobby = self.load().await?;
        let saved_timer = self.timer.clone();

        let mut engine = TurnEngine::new(&*self.oracle, &mut self.timer, &self.config, Utc::now());
        let transition = match engine.apply(&mut lobby, &op) {
            Ok(transition) => transition,
            Err(e) => {
                self.timer = saved_timer;
                return Err(e);
            }
        };

        if matches!(transition, Transition::Rejected(_)) {
            return Ok((lobby, transition));
        }

        if let Err(e) = self.commit(&lobby).await {
            self.timer = saved_timer;
            return Err(e);
        }

        let lobby = self.publish(lobby, &transition).await;
        Ok((lobby, transition))
    }

    /// Broadcasts the events for a committed transition. Returns the lobby
    /// as it now stands, which after a finished game is the cleared one.
    async fn publish(&mut self, lobby: Lobby, transition: &Transition) -> Lobby {
        match transition {
            Transition::Roster | Transition::Rejected(_) => {
                self.broadcast(ServerEvent::LobbyUpdated {
                    lobby: lobby.clone(),
                });
                lobby
            }
            Transition::Knockout(reason) => {
                self.announce(reason);
                self.broadcast(ServerEvent::LobbyUpdated {
                    lobby: lobby.clone(),
                });
                lobby
            }
            Transition::Turn(reason) => {
                self.announce(reason);
                self.broadcast(ServerEvent::NextTurn {
                    lobby: lobby.clone(),
                    reason: reason.clone(),
                });
                lobby
            }
            Transition::Finished {
                winner,
                summary,
                cause,
            } => {
                if let Some(cause) = cause {
                    self.announce(cause);
                }
                self.post(ChatMessage::system(
                    self.lobby_id.clone(),
                    summary.announcement(),
                ));
                let cleared = match self.store.clear(&self.lobby_id).await {
                    Ok(Some(cleared)) => Some(cleared),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::error!(lobby_id = %self.lobby_id, error = %e, "failed to clear finished lobby");
                        None
                    }
                };
                self.broadcast(ServerEvent::GameFinished {
                    lobby: lobby.clone(),
                    winner: winner.clone(),
                    summary: summary.clone(),
                });
                match cleared {
                    Some(cleared) => {
                        self.broadcast(ServerEvent::LobbyUpdated {
                            lobby: cleared.clone(),
                        });
                        cleared
                    }
                    None => lobby,
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Store and broadcast helpers
    // -----------------------------------------------------------------------

    /// Reads the lobby. A lobby left `Finished` by an earlier failed clear
    /// is cleared now.
    async fn load(&self) -> Result<Lobby, LobbyError> {
        let lobby = self
            .store
            .get(&self.lobby_id)
            .await?
            .ok_or_else(|| LobbyError::NotFound(self.lobby_id.clone()))?;
        if lobby.status != LobbyStatus::Finished {
            return Ok(lobby);
        }
        self.store
            .clear(&self.lobby_id)
            .await?
            .ok_or_else(|| LobbyError::NotFound(self.lobby_id.clone()))
    }

    async fn commit(&self, lobby: &Lobby) -> Result<(), LobbyError> {
        self.store.put(lobby.clone()).await.map_err(|e| {
            tracing::error!(lobby_id = %self.lobby_id, error = %e, "failed to store lobby");
            LobbyError::from(e)
        })
    }

    /// Appends to the chat log and broadcasts the line.
    fn post(&mut self, msg: ChatMessage) {
        if self.chat_log.len() >= self.config.chat_log_size {
            self.chat_log.pop_front();
        }
        if self.config.chat_log_size > 0 {
            self.chat_log.push_back(msg.clone());
        }
        self.broadcast(ServerEvent::ReceiveMessage(msg));
    }

    /// Posts the system notice for a knockout. Other reasons have none.
    fn announce(&mut self, reason: &TurnReason) {
        if let Some(notice) = reason.announcement() {
            self.post(ChatMessage::system(self.lobby_id.clone(), notice));
        }
    }

    /// Fire-and-forget. Having no subscribers is not an error.
    fn broadcast(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }
}

/// Spawns a lobby actor task and returns a handle to it.
pub(crate) fn spawn_lobby<S: LobbyStore, W: WordOracle>(
    lobby_id: LobbyId,
    store: Arc<S>,
    oracle: Arc<W>,
    config: LobbyConfig,
) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(config.channel_size);
    let (events, _) = broadcast::channel(config.broadcast_capacity);

    let actor = LobbyActor {
        lobby_id: lobby_id.clone(),
        store,
        oracle,
        timer: BombTimer::new(config.fuse),
        chat_log: VecDeque::with_capacity(config.chat_log_size),
        events: events.clone(),
        receiver: rx,
        config,
    };

    tokio::spawn(actor.run());

    LobbyHandle {
        lobby_id,
        sender: tx,
        events,
    }
}
