/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Distance travelled per tick.
    pub speed: f32,

    /// How out-of-bounds projectiles are collected each tick.
    pub gc: ProjectileGc,
}

/// Collection policy for projectiles that left the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectileGc {
    /// Drop projectiles from the front of the queue while the oldest one is
    /// out of bounds. Assumes roughly FIFO exit order: an out-of-bounds
    /// projectile behind an in-bounds one stays alive until it reaches the front.
    #[default]
    HeadOnly,
    /// Drop every out-of-bounds projectile each tick.
    FullSweep,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 20.0,
            gc: ProjectileGc::HeadOnly,
        }
    }
}
