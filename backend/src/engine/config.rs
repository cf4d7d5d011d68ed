// Game constants and tunable settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{Direction, Position};

// Grid dimensions (cells)
pub const GRID_WIDTH: i32 = 30;
pub const GRID_HEIGHT: i32 = 20;
pub const MAX_GRID_SIDE: i32 = 1000;

// Where a fresh snake spawns
pub const ORIGIN_X: i32 = 15;
pub const ORIGIN_Y: i32 = 10;

// Points per food eaten
pub const FOOD_REWARD: u32 = 10;

// Tick timing (ms). Interval = max(MIN, BASE - min(score, CAP)).
pub const BASE_INTERVAL_MS: u64 = 150;
pub const MIN_INTERVAL_MS: u64 = 50;
pub const SPEED_CAP: u32 = 100;

/// Tunable parameters for a game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub width: i32,
    pub height: i32,
    pub origin: Position,
    pub initial_direction: Direction,
    pub food_reward: u32,
    pub base_interval_ms: u64,
    pub min_interval_ms: u64,
    pub speed_cap: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            origin: Position::new(ORIGIN_X, ORIGIN_Y),
            initial_direction: Direction::Right,
            food_reward: FOOD_REWARD,
            base_interval_ms: BASE_INTERVAL_MS,
            min_interval_ms: MIN_INTERVAL_MS,
            speed_cap: SPEED_CAP,
        }
    }
}

impl GameSettings {
    /// Settings for a custom grid size. The origin moves to the grid center.
    pub fn with_grid(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            origin: Position::new(width / 2, height / 2),
            ..Self::default()
        }
    }

    /// Check that the grid is usable. Returns a human-readable reason otherwise.
    pub fn validate(&self) -> Result<(), String> {
        if self.width <= 0 || self.height <= 0 {
            return Err(format!(
                "grid must be at least 1x1, got {}x{}",
                self.width, self.height
            ));
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(format!(
                "grid sides are capped at {MAX_GRID_SIDE}, got {}x{}",
                self.width, self.height
            ));
        }
        if i64::from(self.width) * i64::from(self.height) < 2 {
            return Err("grid needs room for the snake and one food".into());
        }
        if !self.contains(self.origin) {
            return Err(format!(
                "origin ({}, {}) lies outside the {}x{} grid",
                self.origin.x, self.origin.y, self.width, self.height
            ));
        }
        if self.min_interval_ms == 0 {
            return Err("min_interval_ms must be positive".into());
        }
        Ok(())
    }

    /// Whether a position lies inside [0, width) x [0, height).
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Total number of cells on the grid.
    pub fn cell_count(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    /// Delay before the next tick at the given score. The game speeds up as the
    /// score rises and saturates once it reaches `speed_cap`.
    pub fn tick_interval(&self, score: u32) -> Duration {
        let speedup = u64::from(score.min(self.speed_cap));
        let ms = self
            .base_interval_ms
            .saturating_sub(speedup)
            .max(self.min_interval_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_classic_board() {
        let s = GameSettings::default();
        assert_eq!((s.width, s.height), (30, 20));
        assert_eq!(s.origin, Position::new(15, 10));
        assert_eq!(s.initial_direction, Direction::Right);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_tick_interval_accelerates_and_saturates() {
        let s = GameSettings::default();
        assert_eq!(s.tick_interval(0), Duration::from_millis(150));
        assert_eq!(s.tick_interval(40), Duration::from_millis(110));
        assert_eq!(s.tick_interval(100), Duration::from_millis(50));
        assert_eq!(s.tick_interval(5000), Duration::from_millis(50));
    }

    #[test]
    fn test_tick_interval_respects_min() {
        let s = GameSettings {
            min_interval_ms: 80,
            ..GameSettings::default()
        };
        assert_eq!(s.tick_interval(100), Duration::from_millis(80));
        assert_eq!(s.tick_interval(60), Duration::from_millis(90));
    }

    #[test]
    fn test_validate_rejects_bad_grids() {
        assert!(GameSettings::with_grid(0, 10).validate().is_err());
        assert!(GameSettings::with_grid(1, 1).validate().is_err());
        let outside = GameSettings {
            origin: Position::new(30, 0),
            ..GameSettings::default()
        };
        assert!(outside.validate().is_err());
        assert!(GameSettings::with_grid(2, 1).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_grids() {
        assert!(GameSettings::with_grid(70_000, 70_000).validate().is_err());
        assert!(GameSettings::with_grid(i32::MAX, i32::MAX).validate().is_err());
        assert!(GameSettings::with_grid(MAX_GRID_SIDE, MAX_GRID_SIDE)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_contains_bounds() {
        let s = GameSettings::default();
        assert!(s.contains(Position::new(0, 0)));
        assert!(s.contains(Position::new(29, 19)));
        assert!(!s.contains(Position::new(-1, 5)));
        assert!(!s.contains(Position::new(30, 5)));
        assert!(!s.contains(Position::new(5, 20)));
    }
}
