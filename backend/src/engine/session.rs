// Session driver: owns one player's GameState, applies queued client commands,
// and runs the variable-interval tick timer. Holds no game rules of its own.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use crate::leaderboard::{validate_submission, Leaderboard, LeaderboardEntry, LeaderboardError};
use crate::metrics;
use crate::store::Store;

use super::config::GameSettings;
use super::game::{GameSnapshot, GameState, TickOutcome};
use super::types::{Direction, Phase};

pub type SharedLeaderboard = Arc<Leaderboard<Store>>;

const EVENT_BUFFER: usize = 64;
const COMMAND_BUFFER: usize = 32;

/// Intents from the player. Also the WebSocket wire format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionCommand {
    /// Start (or restart after game over).
    Start,
    Turn { direction: Direction },
    /// Put the last finished round's score on the leaderboard.
    Submit { name: String },
}

/// Messages sent from the session to its client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Sent once when the session opens.
    Settings(GameSettings),
    Snapshot(GameSnapshot),
    GameOver {
        round: u32,
        score: u32,
        high_score: u32,
        reason: String,
    },
    /// A submission for `round` was stored.
    Submitted { round: u32, entry: LeaderboardEntry },
    /// Fresh leaderboard after a submission for `round`. May arrive after a
    /// newer round has started.
    Leaderboard {
        round: u32,
        entries: Vec<LeaderboardEntry>,
    },
    Error { message: String },
}

/// Channels for talking to a running session task.
pub struct SessionHandle {
    pub id: Uuid,
    pub commands: mpsc::Sender<SessionCommand>,
    pub events: mpsc::Receiver<SessionEvent>,
    pub task: JoinHandle<()>,
}

impl SessionHandle {
    /// Shut the session down and wait for its task.
    ///
    /// Both channel ends are dropped first: a task parked on a full event
    /// queue only wakes when the receiver goes away.
    pub async fn close(self) {
        let SessionHandle {
            id,
            commands,
            events,
            task,
        } = self;
        drop(events);
        drop(commands);
        if let Err(e) = task.await {
            tracing::error!(session = %id, "Session task failed: {e}");
        }
    }
}

/// Start a session on its own task. It runs until `commands` is dropped.
pub fn spawn_session(settings: GameSettings, leaderboard: SharedLeaderboard) -> SessionHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
    let session = Session::new(settings, leaderboard, event_tx);
    let id = session.id;
    let task = tokio::spawn(session.run(cmd_rx));
    SessionHandle {
        id,
        commands: cmd_tx,
        events: event_rx,
        task,
    }
}

pub struct Session {
    id: Uuid,
    game: GameState,
    rng: StdRng,
    leaderboard: SharedLeaderboard,
    events: mpsc::Sender<SessionEvent>,
    submitted_round: Option<u32>,
}

impl Session {
    pub fn new(
        settings: GameSettings,
        leaderboard: SharedLeaderboard,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            game: GameState::new(settings),
            rng: StdRng::from_entropy(),
            leaderboard,
            events,
            submitted_round: None,
        }
    }

    /// Replace the random source, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Drive the session until the command channel closes.
    ///
    /// Commands never move the tick deadline; the timer only exists while a
    /// round is running and is re-armed from the current score after each tick.
    pub async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        metrics::ACTIVE_SESSIONS.inc();
        tracing::info!(session = %self.id, "Session opened");

        self.emit(SessionEvent::Settings(self.game.settings().clone()))
            .await;
        self.emit(SessionEvent::Snapshot(self.game.snapshot())).await;

        let mut next_tick: Option<Instant> = None;
        loop {
            let command = match next_tick {
                Some(deadline) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => {
                            self.on_tick().await;
                            next_tick = (self.game.phase() == Phase::Running)
                                .then(|| Instant::now() + self.game.tick_interval());
                            continue;
                        }
                        command = commands.recv() => command,
                    }
                }
                None => commands.recv().await,
            };

            let Some(command) = command else {
                break;
            };
            if self.apply(command).await {
                next_tick = Some(Instant::now() + self.game.tick_interval());
            }
        }

        metrics::ACTIVE_SESSIONS.dec();
        tracing::info!(
            session = %self.id,
            rounds = self.game.round(),
            high_score = self.game.high_score(),
            "Session closed"
        );
    }

    /// Apply one command. Returns true if it started a round.
    async fn apply(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::Start => {
                if !self.game.start(&mut self.rng) {
                    return false;
                }
                metrics::GAMES_STARTED_TOTAL.inc();
                tracing::debug!(session = %self.id, round = self.game.round(), "Round started");
                self.emit(SessionEvent::Snapshot(self.game.snapshot())).await;
                true
            }
            SessionCommand::Turn { direction } => {
                self.game.set_direction(direction);
                false
            }
            SessionCommand::Submit { name } => {
                self.submit(name).await;
                false
            }
        }
    }

    async fn on_tick(&mut self) {
        let outcome = self.game.tick(&mut self.rng);
        metrics::TICKS_TOTAL.inc();
        self.emit(SessionEvent::Snapshot(self.game.snapshot())).await;

        let reason = match outcome {
            TickOutcome::Ate => {
                metrics::FOOD_EATEN_TOTAL.inc();
                return;
            }
            TickOutcome::Moved | TickOutcome::Ignored => return,
            TickOutcome::Collided(collision) => collision.label(),
            TickOutcome::BoardFilled => "board_filled",
        };

        metrics::GAMES_OVER_TOTAL.with_label_values(&[reason]).inc();
        metrics::FINAL_SCORE.observe(f64::from(self.game.score()));
        tracing::info!(
            session = %self.id,
            round = self.game.round(),
            score = self.game.score(),
            reason,
            "Round over"
        );
        self.emit(SessionEvent::GameOver {
            round: self.game.round(),
            score: self.game.score(),
            high_score: self.game.high_score(),
            reason: reason.to_string(),
        })
        .await;
    }

    /// Hand the finished round's score to the leaderboard without blocking the
    /// tick loop. Each round can be submitted once.
    async fn submit(&mut self, name: String) {
        let round = self.game.round();
        let score = self.game.score();

        if self.game.phase() != Phase::GameOver || score == 0 {
            self.emit_error("no finished round with a positive score to submit")
                .await;
            return;
        }
        if self.submitted_round == Some(round) {
            self.emit_error("this round was already submitted").await;
            return;
        }
        if let Err(e) = validate_submission(&name, i64::from(score)) {
            self.emit_error(&e.to_string()).await;
            return;
        }
        self.submitted_round = Some(round);

        let leaderboard = self.leaderboard.clone();
        let events = self.events.clone();
        let session = self.id;
        tokio::spawn(async move {
            match leaderboard.submit(&name, i64::from(score)).await {
                Ok(entry) => {
                    let _ = events.send(SessionEvent::Submitted { round, entry }).await;
                    match leaderboard.list_top(None).await {
                        Ok(entries) => {
                            let _ = events
                                .send(SessionEvent::Leaderboard { round, entries })
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!(%session, "Leaderboard refresh failed: {e}");
                        }
                    }
                }
                Err(LeaderboardError::InvalidInput(message)) => {
                    let _ = events.send(SessionEvent::Error { message }).await;
                }
                Err(e) => {
                    tracing::warn!(%session, round, "Score submission failed: {e}");
                }
            }
        });
    }

    async fn emit_error(&self, message: &str) {
        self.emit(SessionEvent::Error {
            message: message.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: SessionEvent) {
        // The receiver only goes away when the client does; the closed command
        // channel ends the loop right after.
        let _ = self.events.send(event).await;
    }
}
