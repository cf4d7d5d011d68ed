// Snake game engine: rules, state, and the per-session tick driver.

pub mod config;
pub mod game;
pub mod session;
pub mod types;

pub use config::GameSettings;
pub use game::{place_food, GameSnapshot, GameState, TickOutcome};
pub use session::{spawn_session, Session, SessionCommand, SessionEvent, SharedLeaderboard};
pub use types::{Collision, Direction, Phase, Position};
