use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::message::{CursorPosition, ServerMessage};
use crate::routes::app;
use crate::state::{AppState, test_helpers};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve(state: AppState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.expect("ws connect");
    ws
}

async fn next_msg(ws: &mut Client) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame timed out")
            .expect("stream ended")
            .expect("ws error");
        match frame {
            WsMessage::Text(text) => return serde_json::from_str(text.as_str()).expect("frame should decode"),
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn handshake(ws: &mut Client) -> String {
    assert!(matches!(next_msg(ws).await, ServerMessage::Init { .. }));
    let ServerMessage::Id { id } = next_msg(ws).await else {
        panic!("expected id");
    };
    id
}

async fn wait_for_viewers(state: &AppState, expected: usize) {
    timeout(Duration::from_secs(2), async {
        while state.hub.viewer_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("viewer count never settled");
}

#[tokio::test]
async fn upgrade_delivers_init_id_and_join() {
    let state = test_helpers::test_app_state();
    let addr = serve(state.clone()).await;

    let mut a = connect(addr).await;
    let a_id = handshake(&mut a).await;
    assert_eq!(a_id.len(), 16);

    let mut b = connect(addr).await;
    let b_id = handshake(&mut b).await;
    assert_eq!(next_msg(&mut a).await, ServerMessage::Join { id: b_id, user_count: 2 });
    assert_eq!(state.hub.viewer_count().await, 2);
}

#[tokio::test]
async fn move_travels_between_real_sockets() {
    let state = test_helpers::test_app_state();
    let addr = serve(state).await;

    let mut a = connect(addr).await;
    let a_id = handshake(&mut a).await;
    let mut b = connect(addr).await;
    let _ = handshake(&mut b).await;
    let _ = next_msg(&mut a).await; // join

    a.send(WsMessage::Text(r#"{"type":"move","position":{"x":0.5,"y":0.5,"location":"Lima"}}"#.into()))
        .await
        .unwrap();

    let expected = ServerMessage::Move {
        id: a_id,
        position: CursorPosition { x: 0.5, y: 0.5, location: Some("Lima".into()) },
    };
    assert_eq!(next_msg(&mut b).await, expected);
}

#[tokio::test]
async fn disconnect_broadcasts_leave() {
    let state = test_helpers::test_app_state();
    let addr = serve(state.clone()).await;

    let mut a = connect(addr).await;
    let _ = handshake(&mut a).await;
    let mut b = connect(addr).await;
    let b_id = handshake(&mut b).await;
    let _ = next_msg(&mut a).await;

    b.close(None).await.unwrap();
    assert_eq!(next_msg(&mut a).await, ServerMessage::Leave { id: b_id, user_count: 1 });
    wait_for_viewers(&state, 1).await;
}

#[tokio::test]
async fn oversized_message_ends_the_session() {
    let state = test_helpers::test_app_state();
    let addr = serve(state.clone()).await;

    let mut a = connect(addr).await;
    let _ = handshake(&mut a).await;
    wait_for_viewers(&state, 1).await;

    let huge = format!(r#"{{"type":"move","position":{{"x":0,"y":0,"location":"{}"}}}}"#, "x".repeat(4096));
    let _ = a.send(WsMessage::Text(huge.into())).await;

    wait_for_viewers(&state, 0).await;
}

#[tokio::test]
async fn shutdown_closes_live_sockets() {
    let state = test_helpers::test_app_state();
    let addr = serve(state.clone()).await;

    let mut a = connect(addr).await;
    let _ = handshake(&mut a).await;
    wait_for_viewers(&state, 1).await;

    state.hub.shutdown().await;
    let closed = timeout(Duration::from_secs(2), async {
        loop {
            match a.next().await {
                Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => return,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client never saw the socket close");
}
