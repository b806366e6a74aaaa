// Binary wire protocol for the game socket.
//
// Every message is one WebSocket binary frame. Byte 0 selects the packet type
// and each type has a fixed size; multi-byte integers are big-endian.

use crate::domain::{Loot, LootId, MoveInput, Npc, NpcId, Player, PlayerId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

const MOVE_UP: u8 = 1 << 5;
const MOVE_LEFT: u8 = 1 << 4;
const MOVE_DOWN: u8 = 1 << 3;
const MOVE_RIGHT: u8 = 1 << 2;
const MOVE_GROW: u8 = 1 << 1;
const MOVE_SHRINK: u8 = 1;
// Bits 6 and 7 carry no input but are echoed back by `encode`.
const MOVE_RESERVED: u8 = 0b1100_0000;

/// Packets a client sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPacket {
    Move {
        seq: u8,
        input: MoveInput,
        reserved: u8,
    },
    Mouse { seq: u8, x: u16, y: u16 },
    SpawnProjectile { seq: u8 },
    PickupLoot { seq: u8, loot_id: LootId },
}

/// Packets the server sends to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPacket {
    Player {
        seq: u8,
        player_id: PlayerId,
        width: u8,
        height: u8,
        x: u16,
        y: u16,
        mouse_x: u16,
        mouse_y: u16,
    },
    Disconnect { player_id: PlayerId },
    Npc { npc_id: NpcId, x: u16, y: u16 },
    SpawnProjectile { owner_id: PlayerId },
    KillNpc { npc_id: NpcId },
    SpawnLoot { loot_id: LootId, x: u16, y: u16 },
    RemoveLoot { loot_id: LootId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    UnknownPacketType(u8),
    Truncated {
        packet: &'static str,
        expected: usize,
        actual: usize,
    },
    TrailingBytes {
        packet: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty packet"),
            DecodeError::UnknownPacketType(ty) => write!(f, "unknown packet type {ty}"),
            DecodeError::Truncated {
                packet,
                expected,
                actual,
            } => write!(f, "truncated {packet} packet: {actual} of {expected} bytes"),
            DecodeError::TrailingBytes {
                packet,
                expected,
                actual,
            } => write!(f, "oversized {packet} packet: {actual} bytes, expected {expected}"),
        }
    }
}

impl std::error::Error for DecodeError {}

// Splits off the type byte and checks the exact frame size.
//
// Oversized frames are rejected rather than truncated, so a client that pads
// packets or appends fields is incompatible with this server.
fn body<'a>(buf: &'a [u8], packet: &'static str, expected: usize) -> Result<&'a [u8], DecodeError> {
    let actual = buf.len();
    if actual < expected {
        return Err(DecodeError::Truncated {
            packet,
            expected,
            actual,
        });
    }
    if actual > expected {
        return Err(DecodeError::TrailingBytes {
            packet,
            expected,
            actual,
        });
    }
    Ok(&buf[1..])
}

fn type_byte(buf: &[u8]) -> Result<u8, DecodeError> {
    buf.first().copied().ok_or(DecodeError::Empty)
}

impl ClientPacket {
    pub const MOVE: u8 = 0;
    pub const MOUSE: u8 = 1;
    pub const SPAWN_PROJECTILE: u8 = 2;
    pub const PICKUP_LOOT: u8 = 3;

    pub fn seq(&self) -> u8 {
        match *self {
            ClientPacket::Move { seq, .. }
            | ClientPacket::Mouse { seq, .. }
            | ClientPacket::SpawnProjectile { seq }
            | ClientPacket::PickupLoot { seq, .. } => seq,
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        match type_byte(buf)? {
            Self::MOVE => {
                let mut b = body(buf, "move", 3)?;
                let seq = b.get_u8();
                let bits = b.get_u8();
                Ok(ClientPacket::Move {
                    seq,
                    input: MoveInput {
                        up: bits & MOVE_UP != 0,
                        left: bits & MOVE_LEFT != 0,
                        down: bits & MOVE_DOWN != 0,
                        right: bits & MOVE_RIGHT != 0,
                        grow: bits & MOVE_GROW != 0,
                        shrink: bits & MOVE_SHRINK != 0,
                    },
                    reserved: bits & MOVE_RESERVED,
                })
            }
            Self::MOUSE => {
                let mut b = body(buf, "mouse", 6)?;
                Ok(ClientPacket::Mouse {
                    seq: b.get_u8(),
                    x: b.get_u16(),
                    y: b.get_u16(),
                })
            }
            Self::SPAWN_PROJECTILE => {
                let mut b = body(buf, "spawn projectile", 2)?;
                Ok(ClientPacket::SpawnProjectile { seq: b.get_u8() })
            }
            Self::PICKUP_LOOT => {
                let mut b = body(buf, "pickup loot", 4)?;
                Ok(ClientPacket::PickupLoot {
                    seq: b.get_u8(),
                    loot_id: b.get_u16(),
                })
            }
            other => Err(DecodeError::UnknownPacketType(other)),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(6);
        match *self {
            ClientPacket::Move {
                seq,
                input,
                reserved,
            } => {
                let mut bits = reserved & MOVE_RESERVED;
                for (held, bit) in [
                    (input.up, MOVE_UP),
                    (input.left, MOVE_LEFT),
                    (input.down, MOVE_DOWN),
                    (input.right, MOVE_RIGHT),
                    (input.grow, MOVE_GROW),
                    (input.shrink, MOVE_SHRINK),
                ] {
                    if held {
                        bits |= bit;
                    }
                }
                buf.put_u8(Self::MOVE);
                buf.put_u8(seq);
                buf.put_u8(bits);
            }
            ClientPacket::Mouse { seq, x, y } => {
                buf.put_u8(Self::MOUSE);
                buf.put_u8(seq);
                buf.put_u16(x);
                buf.put_u16(y);
            }
            ClientPacket::SpawnProjectile { seq } => {
                buf.put_u8(Self::SPAWN_PROJECTILE);
                buf.put_u8(seq);
            }
            ClientPacket::PickupLoot { seq, loot_id } => {
                buf.put_u8(Self::PICKUP_LOOT);
                buf.put_u8(seq);
                buf.put_u16(loot_id);
            }
        }
        buf.freeze()
    }
}

impl ServerPacket {
    pub const PLAYER: u8 = 0;
    pub const DISCONNECT: u8 = 1;
    pub const NPC: u8 = 2;
    pub const SPAWN_PROJECTILE: u8 = 3;
    pub const KILL_NPC: u8 = 4;
    pub const SPAWN_LOOT: u8 = 5;
    pub const REMOVE_LOOT: u8 = 6;

    pub fn player(seq: u8, player: &Player) -> Self {
        ServerPacket::Player {
            seq,
            player_id: player.id,
            width: player.width,
            height: player.height,
            x: player.x,
            y: player.y,
            mouse_x: player.mouse_x,
            mouse_y: player.mouse_y,
        }
    }

    pub fn npc(npc: &Npc) -> Self {
        ServerPacket::Npc {
            npc_id: npc.id,
            x: npc.x,
            y: npc.y,
        }
    }

    pub fn spawn_loot(loot: &Loot) -> Self {
        ServerPacket::SpawnLoot {
            loot_id: loot.id,
            x: loot.x,
            y: loot.y,
        }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        match type_byte(buf)? {
            Self::PLAYER => {
                let mut b = body(buf, "player", 14)?;
                Ok(ServerPacket::Player {
                    seq: b.get_u8(),
                    player_id: b.get_u16(),
                    width: b.get_u8(),
                    height: b.get_u8(),
                    x: b.get_u16(),
                    y: b.get_u16(),
                    mouse_x: b.get_u16(),
                    mouse_y: b.get_u16(),
                })
            }
            Self::DISCONNECT => {
                let mut b = body(buf, "disconnect", 3)?;
                Ok(ServerPacket::Disconnect {
                    player_id: b.get_u16(),
                })
            }
            Self::NPC => {
                let mut b = body(buf, "npc", 7)?;
                Ok(ServerPacket::Npc {
                    npc_id: b.get_u16(),
                    x: b.get_u16(),
                    y: b.get_u16(),
                })
            }
            Self::SPAWN_PROJECTILE => {
                let mut b = body(buf, "spawn projectile", 3)?;
                Ok(ServerPacket::SpawnProjectile {
                    owner_id: b.get_u16(),
                })
            }
            Self::KILL_NPC => {
                let mut b = body(buf, "kill npc", 3)?;
                Ok(ServerPacket::KillNpc {
                    npc_id: b.get_u16(),
                })
            }
            Self::SPAWN_LOOT => {
                let mut b = body(buf, "spawn loot", 7)?;
                Ok(ServerPacket::SpawnLoot {
                    loot_id: b.get_u16(),
                    x: b.get_u16(),
                    y: b.get_u16(),
                })
            }
            Self::REMOVE_LOOT => {
                let mut b = body(buf, "remove loot", 3)?;
                Ok(ServerPacket::RemoveLoot {
                    loot_id: b.get_u16(),
                })
            }
            other => Err(DecodeError::UnknownPacketType(other)),
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(14);
        match *self {
            ServerPacket::Player {
                seq,
                player_id,
                width,
                height,
                x,
                y,
                mouse_x,
                mouse_y,
            } => {
                buf.put_u8(Self::PLAYER);
                buf.put_u8(seq);
                buf.put_u16(player_id);
                buf.put_u8(width);
                buf.put_u8(height);
                buf.put_u16(x);
                buf.put_u16(y);
                buf.put_u16(mouse_x);
                buf.put_u16(mouse_y);
            }
            ServerPacket::Disconnect { player_id } => {
                buf.put_u8(Self::DISCONNECT);
                buf.put_u16(player_id);
            }
            ServerPacket::Npc { npc_id, x, y } => {
                buf.put_u8(Self::NPC);
                buf.put_u16(npc_id);
                buf.put_u16(x);
                buf.put_u16(y);
            }
            ServerPacket::SpawnProjectile { owner_id } => {
                buf.put_u8(Self::SPAWN_PROJECTILE);
                buf.put_u16(owner_id);
            }
            ServerPacket::KillNpc { npc_id } => {
                buf.put_u8(Self::KILL_NPC);
                buf.put_u16(npc_id);
            }
            ServerPacket::SpawnLoot { loot_id, x, y } => {
                buf.put_u8(Self::SPAWN_LOOT);
                buf.put_u16(loot_id);
                buf.put_u16(x);
                buf.put_u16(y);
            }
            ServerPacket::RemoveLoot { loot_id } => {
                buf.put_u8(Self::REMOVE_LOOT);
                buf.put_u16(loot_id);
            }
        }
        buf.freeze()
    }
}
