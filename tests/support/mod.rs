// Shared primitives for one-time server bootstrapping across integration tests.
use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use arena_server::interface_adapters::protocol::ServerPacket;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Global base URL used by all tests after the server publishes its bound address.
static SERVER_URL: OnceLock<String> = OnceLock::new();
// One-time guard that ensures the server bootstrap path runs only once.
static SERVER_READY: OnceLock<()> = OnceLock::new();

// Ensure the test server is running and return the shared base URL.
pub fn ensure_server() -> &'static str {
    SERVER_READY.get_or_init(|| {
        let published_url = Arc::new(OnceLock::<String>::new());
        let published_url_thread = Arc::clone(&published_url);
        // An OS thread keeps the server alive across individual `#[tokio::test]` runtimes.
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                // Ephemeral port to avoid collisions with local services.
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = published_url_thread.set(format!("http://{}", addr));
                arena_server::run(listener).await.expect("server failed");
            });
        });
        wait_for_server_url_and_readiness(published_url);
    });

    SERVER_URL
        .get()
        .expect("server url should be initialized")
        .as_str()
}

// Wait for URL publication and then wait for the server socket to accept TCP connections.
fn wait_for_server_url_and_readiness(published_url: Arc<OnceLock<String>>) {
    let base_url = loop {
        if let Some(url) = published_url.get() {
            break url.clone();
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    let _ = SERVER_URL.set(base_url.clone());

    let addr = base_url
        .strip_prefix("http://")
        .expect("base url should use http://");

    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    panic!("server did not become ready in time");
}

pub async fn connect(player_id: u16) -> Client {
    let base_url = ensure_server();
    let ws_url = format!(
        "{}/ws?player_id={player_id}",
        base_url.replacen("http://", "ws://", 1)
    );
    let (client, _response) = tokio_tungstenite::connect_async(ws_url)
        .await
        .expect("websocket handshake");
    client
}

// Next binary frame decoded as a server packet; fails the test after a quiet second.
pub async fn next_packet(client: &mut Client) -> ServerPacket {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(1), client.next())
            .await
            .expect("server packet before timeout")
            .expect("socket still open")
            .expect("websocket frame");
        match message {
            Message::Binary(bytes) => {
                return ServerPacket::decode(&bytes).expect("server packet decodes");
            }
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

// Skips packets until one matches. Other tests share the server, so
// unrelated traffic can interleave.
pub async fn wait_for(
    client: &mut Client,
    mut matches: impl FnMut(&ServerPacket) -> bool,
) -> ServerPacket {
    loop {
        let packet = next_packet(client).await;
        if matches(&packet) {
            return packet;
        }
    }
}
