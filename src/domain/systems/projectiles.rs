use super::TickEvent;
use crate::domain::world::{World, hits_npc};
use rand::Rng;
use tracing::debug;

/// Advances every projectile one tick and resolves hits against live NPCs.
///
/// A projectile is not consumed by a hit; it keeps flying and may kill
/// further NPCs on later ticks.
pub fn tick_projectiles(world: &mut World, rng: &mut impl Rng, events: &mut Vec<TickEvent>) {
    let tuning = *world.tuning();

    for p in 0..world.projectiles().len() {
        let (position, owner_id) = {
            let projectile = &mut world.projectiles_mut()[p];
            let velocity = projectile.velocity();
            projectile.position += velocity;
            (projectile.position, projectile.owner_id)
        };

        // Scan in reverse so removing by index never skips an entry.
        for i in (0..world.npcs().len()).rev() {
            if !hits_npc(position, &world.npcs()[i], &tuning) {
                continue;
            }

            let npc = world.kill_npc_at(i);
            debug!(npc_id = npc.id, owner_id, "npc killed");
            let (x, y) = (npc.x, npc.y);
            events.push(TickEvent::NpcKilled(npc));

            if rng.gen_bool(tuning.npc.loot_drop_chance) {
                match world.spawn_loot(x, y) {
                    Some(loot) => events.push(TickEvent::LootDropped(loot)),
                    None => debug!("loot id space exhausted; skipping drop"),
                }
            }
        }
    }
}
