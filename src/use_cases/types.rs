// Use-case level inputs/outputs for the world task.

use crate::domain::{Player, PlayerId};
use crate::interface_adapters::protocol::ClientPacket;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum GameEvent {
    // A socket finished its upgrade and wants a player.
    Join {
        requested_id: Option<PlayerId>,
        outbound: mpsc::Sender<Bytes>,
        reply: oneshot::Sender<Result<Joined, JoinError>>,
    },
    // The socket closed, gracefully or not.
    Leave { player_id: PlayerId },
    // A decoded packet from an open connection.
    Packet {
        player_id: PlayerId,
        packet: ClientPacket,
    },
    // Deferred second phase of a leave.
    Teardown { player_id: PlayerId },
    // Read-only view for the debug endpoint.
    Inspect { reply: oneshot::Sender<WorldSummary> },
}

/// Result of a successful join.
#[derive(Debug)]
pub struct Joined {
    pub player_id: PlayerId,
    /// Encoded packets describing the world at join time. They must reach the
    /// client before anything published afterwards.
    pub snapshot: Vec<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    // The id belongs to a live or still-departing player.
    IdInUse(PlayerId),
    IdsExhausted,
}

#[derive(Debug, Clone)]
pub struct WorldSummary {
    pub players: Vec<Player>,
    pub npcs: usize,
    pub projectiles: usize,
    pub loot: usize,
    pub open_connections: usize,
    pub closing_connections: usize,
}
