// Join/leave orchestration: player creation, topic mesh and two-phase teardown.

use super::broadcast::Topic;
use super::game::Game;
use super::types::{JoinError, Joined};
use crate::domain::PlayerId;
use crate::interface_adapters::protocol::ServerPacket;
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Where a connection is after it has been handed a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    // Disconnect published; waiting for the delayed topic teardown.
    Closing,
}

impl Game {
    /// Creates a player for a new connection, wires it into the topic mesh
    /// and returns the snapshot the client needs to catch up.
    pub fn join(
        &mut self,
        requested_id: Option<PlayerId>,
        outbound: mpsc::Sender<Bytes>,
    ) -> Result<Joined, JoinError> {
        let player_id = match requested_id {
            Some(id) if self.connections.contains_key(&id) => {
                return Err(JoinError::IdInUse(id));
            }
            Some(id) => id,
            None => self.allocate_player_id().ok_or(JoinError::IdsExhausted)?,
        };

        let peers: Vec<PlayerId> = self
            .connections
            .iter()
            .filter(|(_, state)| **state == ConnectionState::Open)
            .map(|(id, _)| *id)
            .collect();

        self.router.attach(player_id, outbound);
        self.router.subscribe(player_id, Topic::Global);
        for &peer in &peers {
            self.router.subscribe(player_id, Topic::Player(peer));
            self.router.subscribe(peer, Topic::Player(player_id));
        }

        let mut snapshot = Vec::new();
        for &peer in &peers {
            if let Some(player) = self.world.player(peer) {
                snapshot.push(ServerPacket::player(0, player).encode());
            }
        }
        for npc in self.world.npcs() {
            snapshot.push(ServerPacket::npc(npc).encode());
        }
        for loot in self.world.loot() {
            snapshot.push(ServerPacket::spawn_loot(loot).encode());
        }

        let player = ServerPacket::player(0, self.world.add_player(player_id));
        self.connections.insert(player_id, ConnectionState::Open);

        // Let existing clients see the newcomer before it first moves.
        self.router.publish(Topic::Player(player_id), &player);

        info!(player_id, peers = peers.len(), "player joined");
        Ok(Joined {
            player_id,
            snapshot,
        })
    }

    /// First phase of a leave: tell everyone and stop sending to the player.
    ///
    /// Returns `true` when the caller must schedule [`Game::teardown`].
    pub fn leave(&mut self, player_id: PlayerId) -> bool {
        match self.connections.get_mut(&player_id) {
            Some(state @ ConnectionState::Open) => {
                *state = ConnectionState::Closing;
            }
            _ => return false,
        }

        self.router.detach(player_id);
        let delivered = self
            .router
            .publish(Topic::Player(player_id), &ServerPacket::Disconnect { player_id });
        info!(player_id, delivered, "player left");
        true
    }

    /// Second phase of a leave: drop the departed topic, then the player.
    pub fn teardown(&mut self, player_id: PlayerId) -> bool {
        if self.connections.get(&player_id) != Some(&ConnectionState::Closing) {
            return false;
        }

        let unsubscribed = self.router.close_topic(Topic::Player(player_id));
        self.world.remove_player(player_id);
        self.connections.remove(&player_id);
        debug!(player_id, unsubscribed, "player torn down");
        true
    }

    // Next id not held by a live or departing player.
    fn allocate_player_id(&mut self) -> Option<PlayerId> {
        let mut candidate = self.next_player_id;
        for _ in 0..=u32::from(PlayerId::MAX) {
            if !self.connections.contains_key(&candidate) {
                self.next_player_id = candidate.wrapping_add(1);
                return Some(candidate);
            }
            candidate = candidate.wrapping_add(1);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tuning;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn game() -> Game {
        Game::new(Tuning::default(), StdRng::seed_from_u64(5))
    }

    fn outbound() -> (mpsc::Sender<Bytes>, mpsc::Receiver<Bytes>) {
        mpsc::channel(128)
    }

    fn decode_all(frames: &[Bytes]) -> Vec<ServerPacket> {
        frames
            .iter()
            .map(|b| ServerPacket::decode(b).expect("server packet decodes"))
            .collect()
    }

    fn drain(rx: &mut mpsc::Receiver<Bytes>) -> Vec<ServerPacket> {
        let mut frames = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            frames.push(bytes);
        }
        decode_all(&frames)
    }

    #[test]
    fn when_players_join_then_topics_form_a_full_mesh() {
        let mut game = game();
        let ids = [1, 2, 3];
        let mut receivers = Vec::new();
        for id in ids {
            let (tx, rx) = outbound();
            game.join(Some(id), tx).expect("join accepted");
            receivers.push(rx);
        }

        for id in ids {
            assert!(game.router().is_subscribed(id, Topic::Global));
            assert!(!game.router().is_subscribed(id, Topic::Player(id)));
            for other in ids.iter().filter(|o| **o != id) {
                assert!(game.router().is_subscribed(id, Topic::Player(*other)));
            }
        }
    }

    #[test]
    fn when_player_joins_then_snapshot_holds_peers_npcs_and_loot() {
        let mut game = game();
        let (a_tx, mut a_rx) = outbound();
        game.join(Some(1), a_tx).expect("join accepted");
        game.handle_packet(
            1,
            crate::interface_adapters::protocol::ClientPacket::Mouse { seq: 9, x: 3, y: 4 },
        );
        let loot = game.world.spawn_loot(7, 8).expect("loot id available");

        let (b_tx, _b_rx) = outbound();
        let joined = game.join(Some(2), b_tx).expect("join accepted");
        let snapshot = decode_all(&joined.snapshot);

        assert_eq!(joined.player_id, 2);
        assert_eq!(snapshot.len(), 1 + 40 + 1);
        assert!(snapshot.contains(&ServerPacket::Player {
            seq: 0,
            player_id: 1,
            width: 20,
            height: 20,
            x: 50,
            y: 50,
            mouse_x: 3,
            mouse_y: 4,
        }));
        assert!(snapshot.contains(&ServerPacket::spawn_loot(&loot)));
        let npcs = snapshot
            .iter()
            .filter(|p| matches!(p, ServerPacket::Npc { .. }))
            .count();
        assert_eq!(npcs, 40);

        // The existing client is told about the newcomer.
        assert!(matches!(
            drain(&mut a_rx).as_slice(),
            [ServerPacket::Player { player_id: 2, seq: 0, .. }]
        ));
    }

    #[test]
    fn when_no_id_is_requested_then_free_ids_are_allocated() {
        let mut game = game();
        let (tx, _rx) = outbound();
        game.join(Some(0), tx).expect("join accepted");

        let (tx, _rx2) = outbound();
        let joined = game.join(None, tx).expect("join accepted");
        assert_eq!(joined.player_id, 1);

        let (tx, _rx3) = outbound();
        assert_eq!(game.join(Some(1), tx).err(), Some(JoinError::IdInUse(1)));
    }

    #[test]
    fn when_player_leaves_then_teardown_waits_for_second_phase() {
        let mut game = game();
        let (a_tx, _a_rx) = outbound();
        let (b_tx, mut b_rx) = outbound();
        game.join(Some(1), a_tx).expect("join accepted");
        game.join(Some(2), b_tx).expect("join accepted");
        drain(&mut b_rx);

        assert!(game.leave(1));
        assert!(!game.leave(1));

        // Phase one: B hears about it, A's topic and player survive.
        assert_eq!(drain(&mut b_rx), vec![ServerPacket::Disconnect { player_id: 1 }]);
        assert!(game.router().is_subscribed(2, Topic::Player(1)));
        assert!(!game.router().is_attached(1));
        assert!(game.world().player(1).is_some());

        // The id is still reserved while departing.
        let (c_tx, _c_rx) = outbound();
        assert_eq!(game.join(Some(1), c_tx).err(), Some(JoinError::IdInUse(1)));

        // A newcomer during the window is not meshed with the departing player.
        let (d_tx, _d_rx) = outbound();
        let joined = game.join(Some(3), d_tx).expect("join accepted");
        assert!(!game.router().is_subscribed(3, Topic::Player(1)));
        assert!(!decode_all(&joined.snapshot)
            .iter()
            .any(|p| matches!(p, ServerPacket::Player { player_id: 1, .. })));

        // Phase two.
        assert!(game.teardown(1));
        assert!(!game.router().is_subscribed(2, Topic::Player(1)));
        assert!(game.world().player(1).is_none());
        assert!(!game.teardown(1));

        let (e_tx, _e_rx) = outbound();
        assert!(game.join(Some(1), e_tx).is_ok());
    }

    #[test]
    fn when_teardown_targets_open_player_then_it_is_ignored() {
        let mut game = game();
        let (tx, _rx) = outbound();
        game.join(Some(4), tx).expect("join accepted");

        assert!(!game.teardown(4));
        assert!(game.world().player(4).is_some());
    }
}
