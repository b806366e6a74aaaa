use super::broadcast::{Router, Topic};
use super::lifecycle::ConnectionState;
use super::types::{GameEvent, WorldSummary};
use crate::domain::systems::{self, TickEvent};
use crate::domain::{PlayerId, Tuning, World};
use crate::interface_adapters::protocol::{ClientPacket, ServerPacket};
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Shared configuration for spawning the world task.
#[derive(Debug, Clone)]
pub struct GameSettings {
    /// Capacity for inbound game events.
    pub input_channel_capacity: usize,
    /// Capacity of each connection's outbound packet queue.
    pub outbound_channel_capacity: usize,
    /// Fixed tick interval for the simulation.
    pub tick_interval: Duration,
    /// Delay between publishing a disconnect and tearing down its topic.
    pub teardown_delay: Duration,
    /// Gameplay tuning.
    pub tuning: Tuning,
}

/// The single owner of world state, subscriptions and connection bookkeeping.
pub struct Game {
    pub(crate) world: World,
    pub(crate) router: Router,
    pub(crate) connections: BTreeMap<PlayerId, ConnectionState>,
    pub(crate) next_player_id: PlayerId,
    pub(crate) rng: StdRng,
}

impl Game {
    pub fn new(tuning: Tuning, mut rng: StdRng) -> Self {
        Self {
            world: World::populated(tuning, &mut rng),
            router: Router::new(),
            connections: BTreeMap::new(),
            next_player_id: 0,
            rng,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Applies one client packet and publishes the resulting state.
    ///
    /// Packets from unknown or departing players are ignored.
    pub fn handle_packet(&mut self, player_id: PlayerId, packet: ClientPacket) {
        if self.connections.get(&player_id) != Some(&ConnectionState::Open) {
            debug!(player_id, ?packet, "packet from inactive player ignored");
            return;
        }

        let seq = packet.seq();
        match packet {
            ClientPacket::Move { input, .. } => {
                if self.world.move_player(player_id, input).is_none() {
                    return;
                }
                if input.grow {
                    self.world.grow_player(player_id);
                }
                if input.shrink {
                    self.world.shrink_player(player_id);
                }
                self.publish_player(player_id, seq);
            }
            ClientPacket::Mouse { x, y, .. } => {
                if self.world.set_aim(player_id, x, y).is_some() {
                    self.publish_player(player_id, seq);
                }
            }
            ClientPacket::SpawnProjectile { .. } => {
                if self.world.spawn_projectile(player_id).is_some() {
                    self.router.publish(
                        Topic::Player(player_id),
                        &ServerPacket::SpawnProjectile {
                            owner_id: player_id,
                        },
                    );
                } else {
                    debug!(player_id, "aim has no direction; projectile not spawned");
                }
            }
            ClientPacket::PickupLoot { loot_id, .. } => {
                // Someone else picking it up first is expected; stay quiet.
                if let Some(loot) = self.world.remove_loot(loot_id) {
                    debug!(player_id, loot_id = loot.id, "loot picked up");
                    self.router
                        .publish(Topic::Global, &ServerPacket::RemoveLoot { loot_id: loot.id });
                }
            }
        }
    }

    fn publish_player(&mut self, player_id: PlayerId, seq: u8) {
        if let Some(player) = self.world.player(player_id) {
            let packet = ServerPacket::player(seq, player);
            self.router.publish(Topic::Player(player_id), &packet);
        }
    }

    /// Advances the simulation one step and broadcasts what changed.
    pub fn tick(&mut self) {
        for event in systems::step(&mut self.world, &mut self.rng) {
            match event {
                TickEvent::NpcKilled(npc) => {
                    self.router
                        .publish(Topic::Global, &ServerPacket::KillNpc { npc_id: npc.id });
                }
                TickEvent::LootDropped(loot) => {
                    self.router
                        .publish(Topic::Global, &ServerPacket::spawn_loot(&loot));
                }
                TickEvent::NpcsSpawned(wave) => {
                    debug!(count = wave.len(), "broadcasting npc wave");
                    for npc in &wave {
                        self.router.publish(Topic::Global, &ServerPacket::npc(npc));
                    }
                }
            }
        }
    }

    pub fn summary(&self) -> WorldSummary {
        let closing = self
            .connections
            .values()
            .filter(|s| **s == ConnectionState::Closing)
            .count();
        WorldSummary {
            players: self.world.players().cloned().collect(),
            npcs: self.world.npcs().len(),
            projectiles: self.world.projectiles().len(),
            loot: self.world.loot().len(),
            open_connections: self.connections.len() - closing,
            closing_connections: closing,
        }
    }
}

pub async fn world_task(
    mut game: Game,
    mut input_rx: mpsc::Receiver<GameEvent>,
    input_tx: mpsc::Sender<GameEvent>,
    tick_interval: Duration,
    teardown_delay: Duration,
    shutdown: Arc<Notify>,
) {
    // Drive the fixed-step game loop at the configured tick rate. A slow tick
    // pushes the next one back instead of bursting to catch up.
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Ticks and events are handled one at a time in this loop, which is what
    // serializes every world mutation.
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("world task shutting down");
                break;
            }
            _ = interval.tick() => {
                game.tick();
            }
            event = input_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                handle_event(&mut game, event, &input_tx, teardown_delay);
            }
        }
    }
}

fn handle_event(
    game: &mut Game,
    event: GameEvent,
    input_tx: &mpsc::Sender<GameEvent>,
    teardown_delay: Duration,
) {
    match event {
        GameEvent::Join {
            requested_id,
            outbound,
            reply,
        } => {
            let result = game.join(requested_id, outbound);
            if let Err(Ok(joined)) = reply.send(result) {
                // The socket gave up while we were joining; undo it.
                info!(player_id = joined.player_id, "join abandoned");
                if game.leave(joined.player_id) {
                    schedule_teardown(input_tx.clone(), joined.player_id, teardown_delay);
                }
            }
        }
        GameEvent::Leave { player_id } => {
            if game.leave(player_id) {
                schedule_teardown(input_tx.clone(), player_id, teardown_delay);
            }
        }
        GameEvent::Packet { player_id, packet } => game.handle_packet(player_id, packet),
        GameEvent::Teardown { player_id } => {
            game.teardown(player_id);
        }
        GameEvent::Inspect { reply } => {
            let _ = reply.send(game.summary());
        }
    }
}

// The teardown comes back through the event channel so it runs in the world
// task like every other mutation.
fn schedule_teardown(input_tx: mpsc::Sender<GameEvent>, player_id: PlayerId, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if input_tx
            .send(GameEvent::Teardown { player_id })
            .await
            .is_err()
        {
            debug!(player_id, "world task gone before teardown");
        }
    });
}
