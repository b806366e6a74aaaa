// Use cases layer: application workflows for the game server.

pub mod broadcast;
pub mod game;
pub mod lifecycle;
pub mod types;

pub use broadcast::{Router, Topic};
pub use game::{Game, GameSettings, world_task};
pub use lifecycle::ConnectionState;
pub use types::{GameEvent, JoinError, Joined, WorldSummary};
