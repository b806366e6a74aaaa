// Domain-level simulation entities and input types.

use super::math::Vec2;

pub type PlayerId = u16;
pub type NpcId = u16;
pub type LootId = u16;

/// Held keys decoded from a Move packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveInput {
    pub up: bool,
    pub left: bool,
    pub down: bool,
    pub right: bool,
    pub grow: bool,
    pub shrink: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub x: u16,
    pub y: u16,
    pub width: u8,
    pub height: u8,
    // Aim point in world coordinates; not clamped to the world.
    pub mouse_x: u16,
    pub mouse_y: u16,
}

impl Player {
    pub fn position(&self) -> Vec2 {
        Vec2::new(f32::from(self.x), f32::from(self.y))
    }

    pub fn aim(&self) -> Vec2 {
        Vec2::new(f32::from(self.mouse_x), f32::from(self.mouse_y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npc {
    // Wave-local: ids restart at 0 on every repopulation.
    pub id: NpcId,
    pub x: u16,
    pub y: u16,
    pub state: NpcState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub spawn: Vec2,
    pub position: Vec2,
    // Unit length.
    pub direction: Vec2,
    pub speed: f32,
    // Attribution only; the owner may already have left.
    pub owner_id: PlayerId,
}

impl Projectile {
    pub fn velocity(&self) -> Vec2 {
        self.direction.scaled(self.speed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loot {
    pub id: LootId,
    pub x: u16,
    pub y: u16,
}
