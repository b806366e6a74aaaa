use crate::use_cases::GameEvent;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    // Events flowing from connections into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Per-connection outbound queue size.
    pub outbound_channel_capacity: usize,
}
