// Domain layer: core simulation types and rules.

pub mod math;
pub mod state;
pub mod systems;
pub mod tuning;
pub mod world;

pub use math::Vec2;
pub use state::{Loot, LootId, MoveInput, Npc, NpcId, NpcState, Player, PlayerId, Projectile};
pub use systems::TickEvent;
pub use tuning::Tuning;
pub use world::World;
