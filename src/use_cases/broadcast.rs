// Topic-based fan-out of encoded packets to connections.
//
// Every connection owns a topic keyed by its player id and every other open
// connection subscribes to it, so publishing on "my topic" currently reaches
// everyone else. Interest management can later narrow those subscriptions
// without touching publishers.

use crate::domain::PlayerId;
use crate::interface_adapters::protocol::ServerPacket;
use crate::interface_adapters::utils::throttle::{log_epoch, should_log};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Global,
    Player(PlayerId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Global => f.write_str("global"),
            Topic::Player(id) => write!(f, "{id}"),
        }
    }
}

pub struct Router {
    // Outbound queue per attached connection.
    sinks: HashMap<PlayerId, mpsc::Sender<Bytes>>,
    topics: HashMap<Topic, HashSet<PlayerId>>,
    last_full_log: Instant,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            sinks: HashMap::new(),
            topics: HashMap::new(),
            last_full_log: log_epoch(),
        }
    }

    /// Registers the outbound queue for a connection.
    pub fn attach(&mut self, id: PlayerId, sink: mpsc::Sender<Bytes>) {
        self.sinks.insert(id, sink);
    }

    /// Drops a connection's queue and all of its subscriptions. Other
    /// connections stay subscribed to its topic until `close_topic`.
    pub fn detach(&mut self, id: PlayerId) -> bool {
        let subscribed: Vec<Topic> = self
            .topics
            .iter()
            .filter(|(_, subscribers)| subscribers.contains(&id))
            .map(|(topic, _)| *topic)
            .collect();
        for topic in subscribed {
            self.unsubscribe(id, topic);
        }
        self.sinks.remove(&id).is_some()
    }

    pub fn subscribe(&mut self, id: PlayerId, topic: Topic) {
        self.topics.entry(topic).or_default().insert(id);
    }

    pub fn unsubscribe(&mut self, id: PlayerId, topic: Topic) -> bool {
        let Some(subscribers) = self.topics.get_mut(&topic) else {
            return false;
        };
        let removed = subscribers.remove(&id);
        if subscribers.is_empty() {
            self.topics.remove(&topic);
        }
        removed
    }

    /// Unsubscribes everyone from `topic`. Returns how many were subscribed.
    pub fn close_topic(&mut self, topic: Topic) -> usize {
        self.topics.remove(&topic).map_or(0, |s| s.len())
    }

    pub fn is_subscribed(&self, id: PlayerId, topic: Topic) -> bool {
        self.topics.get(&topic).is_some_and(|s| s.contains(&id))
    }

    #[cfg(test)]
    pub fn subscribers(&self, topic: Topic) -> impl Iterator<Item = PlayerId> + '_ {
        self.topics.get(&topic).into_iter().flatten().copied()
    }

    pub fn is_attached(&self, id: PlayerId) -> bool {
        self.sinks.contains_key(&id)
    }

    /// Encodes `packet` once and queues it for every subscriber of `topic`.
    ///
    /// Never waits: a subscriber with a full queue loses this packet.
    /// Returns the number of subscribers it was queued for.
    pub fn publish(&mut self, topic: Topic, packet: &ServerPacket) -> usize {
        let Some(subscribers) = self.topics.get(&topic) else {
            return 0;
        };

        let bytes = packet.encode();
        let mut delivered = 0;
        for id in subscribers {
            let Some(sink) = self.sinks.get(id) else {
                continue;
            };
            match sink.try_send(bytes.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    if should_log(&mut self.last_full_log) {
                        warn!(player_id = id, %topic, "outbound queue full; dropping packet");
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    // The leave event for this connection is already on its way.
                    debug!(player_id = id, %topic, "outbound queue closed");
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> (mpsc::Sender<Bytes>, mpsc::Receiver<Bytes>) {
        mpsc::channel(4)
    }

    #[test]
    fn when_publishing_then_only_subscribers_receive_one_whole_frame() {
        let mut router = Router::new();
        let (a_tx, mut a_rx) = sink();
        let (b_tx, mut b_rx) = sink();
        router.attach(1, a_tx);
        router.attach(2, b_tx);
        router.subscribe(2, Topic::Player(1));

        let delivered = router.publish(Topic::Player(1), &ServerPacket::Disconnect { player_id: 1 });

        assert_eq!(delivered, 1);
        assert_eq!(b_rx.try_recv().expect("frame queued").as_ref(), &[1, 0, 1]);
        assert!(a_rx.try_recv().is_err());
    }

    #[test]
    fn when_detached_then_connection_keeps_no_subscriptions_but_its_topic_survives() {
        let mut router = Router::new();
        let (a_tx, _a_rx) = sink();
        let (b_tx, _b_rx) = sink();
        router.attach(1, a_tx);
        router.attach(2, b_tx);
        for (id, other) in [(1, 2), (2, 1)] {
            router.subscribe(id, Topic::Global);
            router.subscribe(id, Topic::Player(other));
        }

        assert!(router.detach(1));

        assert!(!router.is_attached(1));
        assert!(!router.is_subscribed(1, Topic::Global));
        assert!(!router.is_subscribed(1, Topic::Player(2)));
        assert!(router.is_subscribed(2, Topic::Player(1)));
        assert_eq!(router.close_topic(Topic::Player(1)), 1);
        assert_eq!(router.subscribers(Topic::Player(1)).count(), 0);
    }

    #[test]
    fn when_sole_subscriber_detaches_then_its_topics_are_dropped() {
        let mut router = Router::new();
        let (tx, _rx) = sink();
        router.attach(7, tx);
        router.subscribe(7, Topic::Global);

        assert!(router.detach(7));

        assert_eq!(router.subscribers(Topic::Global).count(), 0);
        assert!(!router.topics.contains_key(&Topic::Global));
    }

    #[test]
    fn when_queue_is_full_then_publish_drops_without_blocking() {
        let mut router = Router::new();
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        router.attach(1, slow_tx);
        router.attach(2, fast_tx);
        router.subscribe(1, Topic::Global);
        router.subscribe(2, Topic::Global);

        let packet = ServerPacket::KillNpc { npc_id: 3 };
        assert_eq!(router.publish(Topic::Global, &packet), 2);
        assert_eq!(router.publish(Topic::Global, &packet), 1);

        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_ok());
    }

    #[test]
    fn when_last_subscriber_leaves_then_topic_is_dropped() {
        let mut router = Router::new();
        router.subscribe(5, Topic::Global);

        assert!(router.unsubscribe(5, Topic::Global));
        assert!(!router.unsubscribe(5, Topic::Global));
        assert_eq!(router.publish(Topic::Global, &ServerPacket::RemoveLoot { loot_id: 0 }), 0);
    }
}
