use crate::domain::Player;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameEvent, WorldSummary};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Operator view of the live world.
#[derive(Debug, serde::Serialize)]
pub struct WorldSummaryDto {
    pub players: Vec<PlayerStateDto>,
    pub npcs: usize,
    pub projectiles: usize,
    pub loot: usize,
    pub open_connections: usize,
    pub closing_connections: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct PlayerStateDto {
    pub id: u16,
    pub x: u16,
    pub y: u16,
    pub width: u8,
    pub height: u8,
    pub mouse_x: u16,
    pub mouse_y: u16,
}

impl From<&Player> for PlayerStateDto {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
            mouse_x: p.mouse_x,
            mouse_y: p.mouse_y,
        }
    }
}

impl From<WorldSummary> for WorldSummaryDto {
    fn from(summary: WorldSummary) -> Self {
        Self {
            players: summary.players.iter().map(PlayerStateDto::from).collect(),
            npcs: summary.npcs,
            projectiles: summary.projectiles,
            loot: summary.loot,
            open_connections: summary.open_connections,
            closing_connections: summary.closing_connections,
        }
    }
}

pub async fn debug_state_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (reply, rx) = oneshot::channel();
    let sent = state.input_tx.send(GameEvent::Inspect { reply }).await;

    match (sent, rx.await) {
        (Ok(()), Ok(summary)) => {
            (StatusCode::OK, Json(WorldSummaryDto::from(summary))).into_response()
        }
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "world task unavailable".to_string(),
            }),
        )
            .into_response(),
    }
}
