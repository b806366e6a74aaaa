/// Gameplay tuning for NPC waves and loot drops.

#[derive(Debug, Clone, Copy)]
pub struct NpcTuning {
    /// Collision footprint; NPC positions are the top-left corner.
    pub width: u16,
    pub height: u16,

    /// Population created with the world.
    pub initial_count: u16,

    /// Exclusive upper bound for the size of a repopulation wave.
    pub max_wave: u16,

    /// Chance that a killed NPC drops loot.
    pub loot_drop_chance: f64,
}

impl Default for NpcTuning {
    fn default() -> Self {
        Self {
            width: 50,
            height: 50,
            initial_count: 40,
            max_wave: 50,
            loot_drop_chance: 0.1,
        }
    }
}
