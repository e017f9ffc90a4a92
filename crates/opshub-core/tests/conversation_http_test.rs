//! Conversations against a real HTTP agent endpoint served in-process

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use opshub_agents::HttpAgentClient;
use opshub_core::transcript::CONNECTION_FAILED_TEXT;
use opshub_core::ui_writer::RecordingUiWriter;
use opshub_core::{Applied, Conversation, Role, Workflow};
use tokio_stream::StreamExt;

#[derive(Clone)]
struct Agent {
    posts: Arc<Mutex<Vec<(String, String)>>>,
    status: StatusCode,
    body: &'static str,
}

async fn handle(State(agent): State<Agent>, uri: Uri, body: String) -> Response {
    agent
        .posts
        .lock()
        .unwrap()
        .push((uri.path().to_string(), body));
    (
        agent.status,
        [(header::CONTENT_TYPE, "text/event-stream")],
        agent.body,
    )
        .into_response()
}

async fn serve(status: StatusCode, body: &'static str) -> (String, Agent) {
    let agent = Agent {
        posts: Arc::new(Mutex::new(Vec::new())),
        status,
        body,
    };
    let app = Router::new().fallback(handle).with_state(agent.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/agents", addr), agent)
}

/// Flags its body as dropped, which the server does once the client hangs up.
struct BodyDropped(Arc<AtomicBool>);

impl Drop for BodyDropped {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Agent that streams one chunk and then goes quiet without closing.
#[derive(Clone, Default)]
struct IdleAgent {
    bodies: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
}

impl IdleAgent {
    fn body_dropped(&self, index: usize) -> Arc<AtomicBool> {
        self.bodies.lock().unwrap()[index].clone()
    }
}

async fn chunk_then_idle(State(agent): State<IdleAgent>) -> Response {
    let dropped = Arc::new(AtomicBool::new(false));
    agent.bodies.lock().unwrap().push(dropped.clone());
    let guard = BodyDropped(dropped);

    let first = Bytes::from_static(b"data: {\"delta\":{\"text\":\"partial\"}}\n\n");
    let frames = tokio_stream::iter(vec![Ok::<_, std::io::Error>(first)])
        .chain(tokio_stream::pending())
        .map(move |frame| {
            let _guard = &guard;
            frame
        });

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(frames),
    )
        .into_response()
}

async fn serve_idle() -> (String, IdleAgent) {
    let agent = IdleAgent::default();
    let app = Router::new().fallback(chunk_then_idle).with_state(agent.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/agents", addr), agent)
}

async fn eventually(flag: &AtomicBool) -> bool {
    for _ in 0..100 {
        if flag.load(Ordering::SeqCst) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

fn conversation(
    base_url: &str,
    workflow: Option<Workflow>,
) -> Conversation<Arc<RecordingUiWriter>> {
    let client = HttpAgentClient::new(base_url, Duration::from_secs(2)).unwrap();
    Conversation::new(Arc::new(client), Arc::new(RecordingUiWriter::new()), workflow)
}

#[tokio::test]
async fn test_access_workflow_posts_once_to_access_agent() {
    let (base_url, agent) = serve(
        StatusCode::OK,
        "data: {\"delta\":{\"text\":\"You are compliant.\"}}\n\n",
    )
    .await;
    let mut chat = conversation(&base_url, Some(Workflow::AccessWorkflow));

    chat.send("Check compliance").await.unwrap();

    let posts = agent.posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "/agents/access/v1/message:stream");
    assert!(posts[0].1.contains("Check compliance"));
}

#[tokio::test]
async fn test_status_text_becomes_message_content() {
    let (base_url, _agent) = serve(
        StatusCode::OK,
        "data: {\"status\":{\"state\":\"TASK_STATE_WORKING\",\"message\":{\"parts\":[{\"text\":\"Hello\"}]}}}\n\n",
    )
    .await;
    let mut chat = conversation(&base_url, None);

    let answer = chat.send("hi").await.unwrap();

    assert_eq!(answer.as_deref(), Some("Hello"));
    let last = chat.transcript().messages().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(!last.is_streaming);
}

#[tokio::test]
async fn test_tool_calls_stay_ahead_of_streaming_answer() {
    let body = concat!(
        "data: {\"delta\":{\"text\":\"Looking up \"}}\n\n",
        "data: {\"type\":\"tool_call\",\"tool_name\":\"get_user\",\"parameters\":{\"email\":\"jane@contoso.com\"},\"result\":{\"found\":true},\"duration\":0.4}\n\n",
        "data: {\"delta\":{\"text\":\"Jane.\"}}\n\n",
        "data: {\"type\":\"tool_call\",\"tool_name\":\"assign_license\",\"parameters\":{\"sku\":\"E5\"}}\n\n",
        "data: {\"delta\":{\"text\":\" Done.\"}}\n\n",
    );
    let (base_url, _agent) = serve(StatusCode::OK, body).await;
    let mut chat = conversation(&base_url, Some(Workflow::ResourceProvisioning));

    chat.send("give jane an E5").await.unwrap();

    let messages = chat.transcript().messages();
    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Tool, Role::Tool, Role::Assistant]);
    assert_eq!(messages[1].content, "get_user");
    assert!(!messages[1].tool_call.as_ref().unwrap().is_executing);
    assert_eq!(messages[2].content, "assign_license");
    assert!(messages[2].tool_call.as_ref().unwrap().is_executing);
    assert_eq!(messages[3].content, "Looking up Jane. Done.");
}

#[tokio::test]
async fn test_failed_task_shows_error() {
    let (base_url, _agent) = serve(
        StatusCode::OK,
        "data: {\"statusUpdate\":{\"status\":{\"state\":\"TASK_STATE_FAILED\",\"message\":{\"parts\":[{\"text\":\"Intune unreachable\"}]}}}}\n\n",
    )
    .await;
    let mut chat = conversation(&base_url, None);

    chat.send("sync").await.unwrap();

    let last = chat.transcript().messages().last().unwrap();
    assert_eq!(last.content, "❌ Error: Intune unreachable");
    assert!(!last.is_streaming);
    assert!(chat
        .ui()
        .lines()
        .contains(&"error:❌ Error: Intune unreachable".to_string()));
}

#[tokio::test]
async fn test_rejected_request_shows_agent_error() {
    let (base_url, _agent) = serve(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let mut chat = conversation(&base_url, None);

    assert!(chat.send("hi").await.is_err());

    let last = chat.transcript().messages().last().unwrap();
    assert!(last.content.starts_with("❌ Error: Agent API error 500"));
    assert!(last.content.contains("boom"));
    assert!(!last.is_streaming);
    assert!(!chat.is_streaming());
}

#[tokio::test]
async fn test_unreachable_agent_is_connection_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let mut chat = conversation(&format!("http://{}/agents", addr), None);

    assert!(chat.send("hi").await.is_err());

    let last = chat.transcript().messages().last().unwrap();
    assert_eq!(last.content, CONNECTION_FAILED_TEXT);
}

#[tokio::test]
async fn test_cancel_closes_idle_upstream() {
    let (base_url, agent) = serve_idle().await;
    let mut chat = conversation(&base_url, None);

    chat.begin("one").await.unwrap();
    assert!(matches!(chat.next().await, Some(Applied::Appended(_))));
    chat.cancel();

    assert!(eventually(&agent.body_dropped(0)).await);
    assert_eq!(chat.transcript().messages().last().unwrap().content, "partial");
}

#[tokio::test]
async fn test_dropping_conversation_closes_idle_upstream() {
    let (base_url, agent) = serve_idle().await;
    let mut chat = conversation(&base_url, None);

    chat.begin("one").await.unwrap();
    assert!(matches!(chat.next().await, Some(Applied::Appended(_))));
    drop(chat);

    assert!(eventually(&agent.body_dropped(0)).await);
}

#[tokio::test]
async fn test_new_send_closes_previous_upstream() {
    let (base_url, agent) = serve_idle().await;
    let mut chat = conversation(&base_url, None);

    chat.begin("one").await.unwrap();
    chat.next().await;
    chat.begin("two").await.unwrap();
    chat.next().await;

    assert!(eventually(&agent.body_dropped(0)).await);
    assert!(!agent.body_dropped(1).load(Ordering::SeqCst));
    assert!(chat.is_streaming());
}
