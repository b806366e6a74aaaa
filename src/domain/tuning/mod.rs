// Gameplay tuning, kept apart from runtime/server configuration.

pub mod npc;
pub mod player;
pub mod projectile;
pub mod world;

pub use npc::NpcTuning;
pub use player::PlayerTuning;
pub use projectile::{ProjectileGc, ProjectileTuning};
pub use world::WorldBounds;

/// Every gameplay knob the simulation reads, bundled for the world task.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tuning {
    pub world: WorldBounds,
    pub player: PlayerTuning,
    pub projectile: ProjectileTuning,
    pub npc: NpcTuning,
}
