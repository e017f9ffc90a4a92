//! ChatSocket against an in-process websocket server

use futures_util::{SinkExt, StreamExt};
use opshub_agents::{ChatSocket, ServerEvent};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

/// Accept one client, report its first text frame, push `frames` and close.
async fn serve(frames: Vec<String>) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (first_tx, first_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut writer, mut reader) = ws.split();

        if let Some(Ok(Message::Text(text))) = reader.next().await {
            let _ = first_tx.send(text.as_str().to_owned());
        }
        for frame in frames {
            writer.send(Message::Text(frame.into())).await.unwrap();
        }
        writer.send(Message::Close(None)).await.unwrap();
        while let Some(Ok(_)) = reader.next().await {}
    });

    (format!("ws://{}/ws/chat/cli-test", addr), first_rx)
}

#[tokio::test]
async fn test_turn_events_arrive_in_order_until_close() {
    let frames = vec![
        json!({"type": "message", "agent": "Supervisor", "content": "Routing to the Intune agent"}),
        json!({"type": "token", "value": "Device D001 "}),
        json!({"type": "ping"}),
        json!({"type": "token", "value": "is compliant"}),
        json!({"type": "message", "agent": "Supervisor", "content": "Device D001 is compliant"}),
        json!({"type": "error", "message": "Graph API throttled"}),
    ];
    let (url, first) = serve(frames.iter().map(|f| f.to_string()).collect()).await;

    let mut socket = ChatSocket::connect(&url).await.unwrap();
    assert_eq!(socket.url(), url);
    socket
        .send("Is D001 compliant?", Some("INTUNE_COPILOT"))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = socket.next_event().await {
        events.push(event.unwrap());
    }

    let request: serde_json::Value = serde_json::from_str(&first.await.unwrap()).unwrap();
    assert_eq!(
        request,
        json!({"message": "Is D001 compliant?", "workflow": "INTUNE_COPILOT"})
    );

    assert_eq!(
        events,
        vec![
            ServerEvent::Message {
                agent: Some("Supervisor".to_string()),
                content: "Routing to the Intune agent".to_string()
            },
            ServerEvent::Token {
                value: "Device D001 ".to_string()
            },
            ServerEvent::Token {
                value: "is compliant".to_string()
            },
            ServerEvent::Message {
                agent: Some("Supervisor".to_string()),
                content: "Device D001 is compliant".to_string()
            },
            ServerEvent::Error {
                message: "Graph API throttled".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn test_close_sends_close_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(message)) = ws.next().await {
            if let Message::Close(_) = message {
                let _ = closed_tx.send(true);
                return;
            }
        }
        let _ = closed_tx.send(false);
    });

    let socket = ChatSocket::connect(&format!("ws://{}/ws/chat/cli-test", addr))
        .await
        .unwrap();
    socket.close().await.unwrap();

    assert!(closed_rx.await.unwrap());
}

#[tokio::test]
async fn test_split_halves_send_and_receive() {
    let reply = json!({"type": "message", "agent": "Supervisor", "content": "Hi"});
    let (url, first) = serve(vec![reply.to_string()]).await;

    let (mut sender, mut receiver) = ChatSocket::connect(&url).await.unwrap().split();
    let reading = tokio::spawn(async move { receiver.next_event().await });
    sender.send("hello", None).await.unwrap();

    assert_eq!(first.await.unwrap(), r#"{"message":"hello"}"#);
    let event = reading.await.unwrap().unwrap().unwrap();
    assert_eq!(
        event,
        ServerEvent::Message {
            agent: Some("Supervisor".to_string()),
            content: "Hi".to_string()
        }
    );
}

#[tokio::test]
async fn test_connect_refused_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(ChatSocket::connect(&format!("ws://{}/ws/chat/cli-test", addr))
        .await
        .is_err());
}
