// Per-tick simulation systems.

pub mod npcs;
pub mod projectiles;

use super::state::{Loot, Npc};
use super::world::World;
use rand::Rng;

/// Something a tick changed that clients need to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickEvent {
    NpcKilled(Npc),
    LootDropped(Loot),
    // Full batch for one repopulation wave.
    NpcsSpawned(Vec<Npc>),
}

/// Runs one fixed simulation step and returns the events in broadcast order.
pub fn step(world: &mut World, rng: &mut impl Rng) -> Vec<TickEvent> {
    let mut events = Vec::new();

    // Move and collide.
    projectiles::tick_projectiles(world, rng, &mut events);

    // Collect projectiles that left the world.
    let policy = world.tuning().projectile.gc;
    world.collect_projectiles(policy);

    // Refill the world once the last NPC is gone.
    if let Some(wave) = npcs::repopulate_if_empty(world, rng) {
        events.push(TickEvent::NpcsSpawned(wave));
    }

    events
}
