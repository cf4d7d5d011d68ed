// Snake simulation: owned game state and the per-tick state machine.

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use super::config::GameSettings;
use super::types::{Collision, Direction, Phase, Position};

/// What a call to [`GameState::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The game was not running; nothing changed.
    Ignored,
    /// The snake moved one cell.
    Moved,
    /// The snake moved onto the food and grew.
    Ate,
    /// The head would have hit a wall or the body. The round is over.
    Collided(Collision),
    /// The snake grew to cover every cell, so no food can be placed.
    BoardFilled,
}

/// Snapshot of a session for rendering / API consumers.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub round: u32,
    /// Head first.
    pub snake: Vec<Position>,
    pub food: Option<Position>,
    pub direction: Direction,
    pub score: u32,
    pub high_score: u32,
    pub tick_interval_ms: u64,
}

/// One player's game. Inputs go through [`GameState::set_direction`] and take
/// effect at the next [`GameState::tick`]; the caller owns the timer.
#[derive(Debug, Clone)]
pub struct GameState {
    settings: GameSettings,
    snake: VecDeque<Position>,
    food: Option<Position>,
    direction: Direction,
    pending_direction: Direction,
    score: u32,
    high_score: u32,
    phase: Phase,
    round: u32,
}

impl GameState {
    pub fn new(settings: GameSettings) -> Self {
        let origin = settings.origin;
        let direction = settings.initial_direction;
        Self {
            settings,
            snake: VecDeque::from([origin]),
            food: None,
            direction,
            pending_direction: direction,
            score: 0,
            high_score: 0,
            phase: Phase::NotStarted,
            round: 0,
        }
    }

    /// Begin a new round. Only valid before the first round or after a game
    /// over; returns false (and changes nothing) while a round is running.
    /// The high score carries over.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.phase == Phase::Running {
            return false;
        }
        self.snake.clear();
        self.snake.push_back(self.settings.origin);
        self.direction = self.settings.initial_direction;
        self.pending_direction = self.direction;
        self.score = 0;
        self.food = place_food(&self.settings, &self.snake, rng);
        self.phase = Phase::Running;
        self.round += 1;
        true
    }

    /// Queue a turn for the next tick. Ignored unless running, and ignored if
    /// it reverses the direction the snake is currently moving in.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if self.phase != Phase::Running || direction.is_opposite(self.direction) {
            return false;
        }
        self.pending_direction = direction;
        true
    }

    /// Advance the simulation by one cell.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Ignored;
        }

        self.direction = self.pending_direction;
        let next = self.head().step(self.direction);

        if !self.settings.contains(next) {
            self.finish_round();
            return TickOutcome::Collided(Collision::Wall);
        }
        if self.snake.contains(&next) {
            self.finish_round();
            return TickOutcome::Collided(Collision::SelfHit);
        }

        self.snake.push_front(next);

        if self.food == Some(next) {
            self.score += self.settings.food_reward;
            self.food = place_food(&self.settings, &self.snake, rng);
            if self.food.is_none() {
                self.finish_round();
                return TickOutcome::BoardFilled;
            }
            TickOutcome::Ate
        } else {
            self.snake.pop_back();
            TickOutcome::Moved
        }
    }

    /// Put the food on a specific free cell, for scripted setups.
    /// Returns false if the cell is off the grid or occupied by the snake.
    pub fn set_food(&mut self, pos: Position) -> bool {
        if !self.settings.contains(pos) || self.snake.contains(&pos) {
            return false;
        }
        self.food = Some(pos);
        true
    }

    fn finish_round(&mut self) {
        self.phase = Phase::GameOver;
        self.high_score = self.high_score.max(self.score);
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn snake(&self) -> &VecDeque<Position> {
        &self.snake
    }

    pub fn head(&self) -> Position {
        // start() and new() always leave at least one segment
        self.snake.front().copied().unwrap_or(self.settings.origin)
    }

    pub fn food(&self) -> Option<Position> {
        self.food
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_direction(&self) -> Direction {
        self.pending_direction
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of rounds started in this session.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Delay before the next tick at the current score.
    pub fn tick_interval(&self) -> Duration {
        self.settings.tick_interval(self.score)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            round: self.round,
            snake: self.snake.iter().copied().collect(),
            food: self.food,
            direction: self.direction,
            score: self.score,
            high_score: self.high_score,
            tick_interval_ms: self.tick_interval().as_millis() as u64,
        }
    }
}

/// Pick a uniformly random free cell by rejection sampling.
///
/// Returns `None` when the snake already covers the whole grid; otherwise the
/// loop terminates with probability 1.
pub fn place_food<R: Rng + ?Sized>(
    settings: &GameSettings,
    snake: &VecDeque<Position>,
    rng: &mut R,
) -> Option<Position> {
    if snake.len() >= settings.cell_count() {
        return None;
    }
    loop {
        let candidate = Position::new(
            rng.gen_range(0..settings.width),
            rng.gen_range(0..settings.height),
        );
        if !snake.contains(&candidate) {
            return Some(candidate);
        }
    }
}
