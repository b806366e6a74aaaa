mod support;

use arena_server::domain::MoveInput;
use arena_server::interface_adapters::protocol::{ClientPacket, ServerPacket};
use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::{self, Message};

async fn send(client: &mut support::Client, packet: ClientPacket) {
    client
        .send(Message::Binary(packet.encode()))
        .await
        .expect("send client packet");
}

#[tokio::test]
async fn test_snapshot_lists_every_npc() {
    let mut client = support::connect(1001).await;

    let mut npcs = 0;
    while npcs < 40 {
        support::wait_for(&mut client, |p| matches!(p, ServerPacket::Npc { .. })).await;
        npcs += 1;
    }
    assert_eq!(npcs, 40);
}

#[tokio::test]
async fn test_peers_see_join_move_and_disconnect() {
    let mut a = support::connect(1101).await;
    let mut b = support::connect(1102).await;

    let joined = support::wait_for(&mut a, |p| {
        matches!(p, ServerPacket::Player { player_id: 1102, .. })
    })
    .await;
    assert!(matches!(
        joined,
        ServerPacket::Player { seq: 0, x: 50, y: 50, width: 20, height: 20, .. }
    ));

    send(
        &mut b,
        ClientPacket::Move {
            seq: 7,
            input: MoveInput {
                right: true,
                ..MoveInput::default()
            },
            reserved: 0,
        },
    )
    .await;
    let moved = support::wait_for(&mut a, |p| {
        matches!(p, ServerPacket::Player { player_id: 1102, seq: 7, .. })
    })
    .await;
    assert!(matches!(moved, ServerPacket::Player { x: 55, y: 50, .. }));

    b.close(None).await.expect("close websocket");
    let left = support::wait_for(&mut a, |p| {
        matches!(p, ServerPacket::Disconnect { player_id: 1102 })
    })
    .await;
    assert_eq!(left, ServerPacket::Disconnect { player_id: 1102 });
}

#[tokio::test]
async fn test_malformed_packet_keeps_connection_open() {
    let mut a = support::connect(1201).await;
    let mut b = support::connect(1202).await;
    support::wait_for(&mut a, |p| matches!(p, ServerPacket::Player { player_id: 1202, .. })).await;

    b.send(Message::Binary(vec![9, 1, 2].into()))
        .await
        .expect("send garbage");
    send(&mut b, ClientPacket::Mouse { seq: 3, x: 400, y: 10 }).await;

    let aimed = support::wait_for(&mut a, |p| {
        matches!(p, ServerPacket::Player { player_id: 1202, seq: 3, .. })
    })
    .await;
    assert!(matches!(
        aimed,
        ServerPacket::Player { mouse_x: 400, mouse_y: 10, .. }
    ));
}

#[tokio::test]
async fn test_invalid_player_id_is_rejected() {
    let base_url = support::ensure_server();
    let ws_url = format!(
        "{}/ws?player_id=not-a-number",
        base_url.replacen("http://", "ws://", 1)
    );

    match tokio_tungstenite::connect_async(ws_url).await {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), tungstenite::http::StatusCode::BAD_REQUEST);
        }
        Err(other) => panic!("unexpected handshake error: {other:?}"),
        Ok(_) => panic!("handshake should be refused"),
    }
}

#[tokio::test]
async fn test_debug_state_reports_connected_players() {
    let base_url = support::ensure_server();
    let mut client = support::connect(1301).await;
    // The snapshot arrives after the join is applied.
    support::next_packet(&mut client).await;

    let body: serde_json::Value = reqwest::get(format!("{base_url}/debug/state"))
        .await
        .expect("request should succeed")
        .json()
        .await
        .expect("json body");

    let players = body["players"].as_array().expect("players array");
    assert!(players.iter().any(|p| p["id"] == 1301));
    assert!(body["open_connections"].as_u64().expect("count") >= 1);
}

#[tokio::test]
async fn test_dropped_connection_takes_the_disconnect_path() {
    let base_url = support::ensure_server();
    let mut a = support::connect(1401).await;
    let b = support::connect(1402).await;
    support::wait_for(&mut a, |p| matches!(p, ServerPacket::Player { player_id: 1402, .. })).await;

    // No close frame: the TCP stream just goes away.
    drop(b);

    let left = support::wait_for(&mut a, |p| {
        matches!(p, ServerPacket::Disconnect { player_id: 1402 })
    })
    .await;
    assert_eq!(left, ServerPacket::Disconnect { player_id: 1402 });

    // The player is removed once the teardown delay has passed.
    tokio::time::sleep(std::time::Duration::from_millis(1300)).await;
    let body: serde_json::Value = reqwest::get(format!("{base_url}/debug/state"))
        .await
        .expect("request should succeed")
        .json()
        .await
        .expect("json body");
    let players = body["players"].as_array().expect("players array");
    assert!(players.iter().all(|p| p["id"] != 1402));
    assert!(players.iter().any(|p| p["id"] == 1401));
}
