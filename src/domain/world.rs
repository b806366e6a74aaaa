// Authoritative world state and the mutators that guard its invariants.

use super::math::Vec2;
use super::state::{
    Loot, LootId, MoveInput, Npc, NpcId, NpcState, Player, PlayerId, Projectile,
};
use super::tuning::{ProjectileGc, Tuning, WorldBounds};
use rand::Rng;
use std::collections::{BTreeMap, VecDeque};

pub struct World {
    tuning: Tuning,
    // Ordered so snapshots and debug dumps are stable.
    players: BTreeMap<PlayerId, Player>,
    npcs: Vec<Npc>,
    // Oldest first; head-only GC relies on this ordering.
    projectiles: VecDeque<Projectile>,
    loot: Vec<Loot>,
    // Wider than the wire id so exhaustion is detectable instead of wrapping.
    next_loot_id: u32,
}

impl World {
    /// Creates an empty world (no players, no NPCs).
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            players: BTreeMap::new(),
            npcs: Vec::new(),
            projectiles: VecDeque::new(),
            loot: Vec::new(),
            next_loot_id: 0,
        }
    }

    /// Creates a world seeded with the initial NPC population.
    pub fn populated(tuning: Tuning, rng: &mut impl Rng) -> Self {
        let mut world = Self::new(tuning);
        world.repopulate_npcs(tuning.npc.initial_count, rng);
        world
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn bounds(&self) -> WorldBounds {
        self.tuning.world
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    pub fn projectiles(&self) -> &VecDeque<Projectile> {
        &self.projectiles
    }

    pub(crate) fn projectiles_mut(&mut self) -> &mut VecDeque<Projectile> {
        &mut self.projectiles
    }

    pub fn loot(&self) -> &[Loot] {
        &self.loot
    }

    /// Spawns a player at the configured spawn point. An existing player with
    /// the same id is left untouched.
    pub fn add_player(&mut self, id: PlayerId) -> &Player {
        let tuning = self.tuning.player;
        self.players.entry(id).or_insert_with(|| Player {
            id,
            x: tuning.spawn_x,
            y: tuning.spawn_y,
            width: tuning.width,
            height: tuning.height,
            mouse_x: 0,
            mouse_y: 0,
        })
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Moves a player one step per held direction, clamping each axis to
    /// `[0, width] x [0, height]` on its own.
    pub fn move_player(&mut self, id: PlayerId, input: MoveInput) -> Option<&Player> {
        let speed = self.tuning.player.speed;
        let bounds = self.tuning.world;
        let player = self.players.get_mut(&id)?;

        if input.up {
            player.y = player.y.saturating_sub(speed);
        }
        if input.left {
            player.x = player.x.saturating_sub(speed);
        }
        if input.down {
            player.y = player.y.saturating_add(speed).min(bounds.height);
        }
        if input.right {
            player.x = player.x.saturating_add(speed).min(bounds.width);
        }

        Some(&*player)
    }

    /// Grows both dimensions by one. Sizes are 8-bit on the wire and wrap past 255.
    pub fn grow_player(&mut self, id: PlayerId) -> Option<&Player> {
        let player = self.players.get_mut(&id)?;
        player.width = player.width.wrapping_add(1);
        player.height = player.height.wrapping_add(1);
        Some(&*player)
    }

    /// Shrinks both dimensions by one, wrapping below 0.
    pub fn shrink_player(&mut self, id: PlayerId) -> Option<&Player> {
        let player = self.players.get_mut(&id)?;
        player.width = player.width.wrapping_sub(1);
        player.height = player.height.wrapping_sub(1);
        Some(&*player)
    }

    pub fn set_aim(&mut self, id: PlayerId, x: u16, y: u16) -> Option<&Player> {
        let player = self.players.get_mut(&id)?;
        player.mouse_x = x;
        player.mouse_y = y;
        Some(&*player)
    }

    /// Fires a projectile from the player's position towards their aim point.
    ///
    /// Returns `None` when the owner is gone or is aiming at their own
    /// position (no direction to fire in).
    pub fn spawn_projectile(&mut self, owner_id: PlayerId) -> Option<&Projectile> {
        let owner = self.players.get(&owner_id)?;
        let spawn = owner.position();
        let direction = (owner.aim() - spawn).normalized()?;

        self.projectiles.push_back(Projectile {
            spawn,
            position: spawn,
            direction,
            speed: self.tuning.projectile.speed,
            owner_id,
        });
        self.projectiles.back()
    }

    /// Drops projectiles that left the world according to `policy`.
    /// Returns how many were removed.
    pub fn collect_projectiles(&mut self, policy: ProjectileGc) -> usize {
        let bounds = self.tuning.world;
        let before = self.projectiles.len();
        match policy {
            ProjectileGc::HeadOnly => {
                while self
                    .projectiles
                    .front()
                    .is_some_and(|p| !bounds.contains(p.position.x, p.position.y))
                {
                    self.projectiles.pop_front();
                }
            }
            ProjectileGc::FullSweep => {
                self.projectiles
                    .retain(|p| bounds.contains(p.position.x, p.position.y));
            }
        }
        before - self.projectiles.len()
    }

    /// Removes the NPC with `id` from the live population.
    pub fn kill_npc(&mut self, id: NpcId) -> Option<Npc> {
        let index = self.npcs.iter().position(|n| n.id == id)?;
        Some(self.kill_npc_at(index))
    }

    /// Removes the NPC stored at `index`. Used by the reverse collision scan.
    pub(crate) fn kill_npc_at(&mut self, index: usize) -> Npc {
        let mut npc = self.npcs.remove(index);
        npc.state = NpcState::Dead;
        npc
    }

    /// Replaces the live population with a fresh wave of `count` NPCs with
    /// ids `0..count` at random positions that keep the footprint in bounds.
    pub fn repopulate_npcs(&mut self, count: u16, rng: &mut impl Rng) -> &[Npc] {
        let bounds = self.tuning.world;
        let npc = self.tuning.npc;
        let max_x = bounds.width.saturating_sub(npc.width).max(1);
        let max_y = bounds.height.saturating_sub(npc.height).max(1);

        self.npcs.clear();
        self.npcs.extend((0..count).map(|id| Npc {
            id,
            x: rng.gen_range(0..max_x),
            y: rng.gen_range(0..max_y),
            state: NpcState::Alive,
        }));
        &self.npcs
    }

    /// Drops a loot item at the given position with the next unused id.
    ///
    /// Returns `None` once the 16-bit id space is exhausted, since ids are
    /// never reused.
    pub fn spawn_loot(&mut self, x: u16, y: u16) -> Option<Loot> {
        let id = LootId::try_from(self.next_loot_id).ok()?;
        self.next_loot_id += 1;
        let loot = Loot { id, x, y };
        self.loot.push(loot.clone());
        Some(loot)
    }

    pub fn remove_loot(&mut self, id: LootId) -> Option<Loot> {
        let index = self.loot.iter().position(|l| l.id == id)?;
        Some(self.loot.remove(index))
    }

    #[cfg(test)]
    pub(crate) fn with_npcs(mut self, npcs: Vec<Npc>) -> Self {
        self.npcs = npcs;
        self
    }
}

/// Point-in-rectangle test for a projectile against an NPC footprint.
///
/// Both the footprint and the world use half-open intervals, so a point on
/// the far edge of either is a miss.
pub fn hits_npc(point: Vec2, npc: &Npc, tuning: &Tuning) -> bool {
    if !tuning.world.contains(point.x, point.y) {
        return false;
    }
    let left = f32::from(npc.x);
    let top = f32::from(npc.y);
    point.x >= left
        && point.x < left + f32::from(tuning.npc.width)
        && point.y >= top
        && point.y < top + f32::from(tuning.npc.height)
}
