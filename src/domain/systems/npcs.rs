use crate::domain::state::Npc;
use crate::domain::world::World;
use rand::Rng;
use tracing::debug;

/// Starts a new wave when the live population is empty.
///
/// The wave size is drawn from `[0, max_wave)`, so an empty wave is possible;
/// the next tick will simply try again.
pub fn repopulate_if_empty(world: &mut World, rng: &mut impl Rng) -> Option<Vec<Npc>> {
    if !world.npcs().is_empty() {
        return None;
    }

    let max_wave = world.tuning().npc.max_wave.max(1);
    let count = rng.gen_range(0..max_wave);
    let wave = world.repopulate_npcs(count, rng).to_vec();
    debug!(count, "npc wave spawned");
    Some(wave)
}
