use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Map;
use tokio::sync::mpsc;

use super::QueryDispatcher;
use crate::domain::models::Action;
use crate::domain::models::DocumentIdentity;
use crate::domain::models::Event;
use crate::domain::models::Gateway;
use crate::domain::models::GatewayError;
use crate::domain::models::Notification;
use crate::domain::models::QueryAnswer;
use crate::domain::models::Role;
use crate::domain::models::UploadCandidate;
use crate::domain::models::UploadReceipt;
use crate::domain::services::ConversationSession;
use crate::domain::services::SessionState;

/// Answers queries from a script, echoing the question once the script runs
/// out, and records how many calls overlapped.
#[derive(Default)]
struct StubGateway {
    script: Mutex<VecDeque<Result<QueryAnswer, GatewayError>>>,
    calls: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Duration,
}

impl StubGateway {
    fn with_delay(delay: Duration) -> StubGateway {
        return StubGateway {
            delay,
            ..StubGateway::default()
        };
    }

    fn push(&self, res: Result<QueryAnswer, GatewayError>) {
        self.script.lock().unwrap().push_back(res);
    }

    fn calls(&self) -> Vec<(String, String)> {
        return self.calls.lock().unwrap().clone();
    }
}

#[async_trait]
impl Gateway for StubGateway {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<(), GatewayError> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn upload(
        &self,
        _candidate: &UploadCandidate,
        _bytes: Vec<u8>,
    ) -> Result<UploadReceipt, GatewayError> {
        return Ok(UploadReceipt {
            file_id: "doc_abc123".to_string(),
            extra: Map::new(),
        });
    }

    #[allow(clippy::implicit_return)]
    async fn query(&self, file_id: &str, user_query: &str) -> Result<QueryAnswer, GatewayError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((file_id.to_string(), user_query.to_string()));

        tokio::time::sleep(self.delay).await;

        let scripted = self.script.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        return scripted.unwrap_or_else(|| {
            return Ok(QueryAnswer {
                answer: format!("Answer to: {user_query}"),
            });
        });
    }
}

fn spawn_dispatcher(
    gateway: Arc<StubGateway>,
) -> (mpsc::UnboundedSender<Action>, mpsc::UnboundedReceiver<Event>) {
    let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let dispatcher = QueryDispatcher::new(gateway);
    tokio::spawn(async move {
        return dispatcher.start(event_tx, action_rx).await;
    });

    return (action_tx, event_rx);
}

#[tokio::test]
async fn it_dispatches_with_document_id() -> Result<()> {
    let gateway = Arc::new(StubGateway::default());
    gateway.push(Ok(QueryAnswer {
        answer: "42".to_string(),
    }));

    let dispatcher = QueryDispatcher::new(gateway.clone());
    let identity = DocumentIdentity::new("doc_abc123", "Report (final).pdf");
    let answer = dispatcher.dispatch(&identity, "What is the total?").await?;

    assert_eq!(answer, "42");
    assert_eq!(
        gateway.calls(),
        vec![("doc_abc123".to_string(), "What is the total?".to_string())]
    );

    return Ok(());
}

#[tokio::test]
async fn it_refuses_unscoped_dispatch_without_calling_gateway() {
    let gateway = Arc::new(StubGateway::default());
    let dispatcher = QueryDispatcher::new(gateway.clone());

    let res = dispatcher
        .dispatch(&DocumentIdentity::unscoped("notes.pdf"), "Hello?")
        .await;

    assert_eq!(res, Err(GatewayError::Unscoped));
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn it_propagates_gateway_errors() {
    let gateway = Arc::new(StubGateway::default());
    gateway.push(Err(GatewayError::Upstream {
        status: 404,
        detail: "File not found".to_string(),
    }));

    let dispatcher = QueryDispatcher::new(gateway);
    let res = dispatcher
        .dispatch(&DocumentIdentity::new("missing", "gone.pdf"), "Hello?")
        .await;

    assert_eq!(
        res,
        Err(GatewayError::Upstream {
            status: 404,
            detail: "File not found".to_string(),
        })
    );
}

#[tokio::test]
async fn it_keeps_a_single_query_in_flight() -> Result<()> {
    let gateway = Arc::new(StubGateway::with_delay(Duration::from_millis(50)));
    let (action_tx, mut event_rx) = spawn_dispatcher(gateway.clone());

    let mut session = ConversationSession::new(DocumentIdentity::new("doc_abc123", "a.pdf"));
    session.set_input("First question");
    assert!(session.submit(&action_tx)?);

    for text in ["Second", "Third", "Fourth", "Fifth"] {
        session.set_input(text);
        assert!(!session.submit(&action_tx)?);
    }

    let event = event_rx.recv().await.unwrap();
    assert!(session.handle_event(event));
    assert_eq!(session.state(), SessionState::Idle);

    assert_eq!(gateway.calls().len(), 1);
    assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);

    return Ok(());
}

#[tokio::test]
async fn it_serializes_queued_actions() -> Result<()> {
    let gateway = Arc::new(StubGateway::with_delay(Duration::from_millis(20)));
    let (action_tx, mut event_rx) = spawn_dispatcher(gateway.clone());

    // Bypass the session guard to check the dispatcher serializes on its own.
    for text in ["one", "two", "three"] {
        let mut session = ConversationSession::new(DocumentIdentity::new("doc", "a.pdf"));
        session.set_input(text);
        session.submit(&action_tx)?;
    }

    for _ in 0..3 {
        assert!(event_rx.recv().await.is_some());
    }
    assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);

    return Ok(());
}

#[tokio::test]
async fn it_interleaves_questions_and_answers() -> Result<()> {
    let gateway = Arc::new(StubGateway::default());
    let (action_tx, mut event_rx) = spawn_dispatcher(gateway);

    let mut session = ConversationSession::new(DocumentIdentity::new("doc_abc123", "a.pdf"));
    let questions = ["What is the total?", "Who signed it?", "When is it due?"];
    for question in questions {
        session.set_input(question);
        assert!(session.submit(&action_tx)?);
        let event = event_rx.recv().await.unwrap();
        assert!(session.handle_event(event));
    }

    let transcript = session
        .messages()
        .iter()
        .map(|message| return format!("{}: {}", message.role(), message.content()))
        .collect::<Vec<String>>()
        .join("\n");

    insta::assert_snapshot!(transcript, @r###"
    user: What is the total?
    assistant: Answer to: What is the total?
    user: Who signed it?
    assistant: Answer to: Who signed it?
    user: When is it due?
    assistant: Answer to: When is it due?
    "###);

    let roles = session
        .messages()
        .iter()
        .map(|message| return message.role())
        .collect::<Vec<Role>>();
    assert_eq!(roles.len(), questions.len() * 2);

    return Ok(());
}

#[tokio::test]
async fn it_surfaces_failures_as_notifications() -> Result<()> {
    let gateway = Arc::new(StubGateway::default());
    gateway.push(Err(GatewayError::from_response(
        500,
        r#"{"detail":"backend unavailable"}"#,
        "Failed to get response from backend",
    )));
    let (action_tx, mut event_rx) = spawn_dispatcher(gateway);

    let mut session = ConversationSession::new(DocumentIdentity::new("doc_abc123", "a.pdf"));
    session.set_input("What is the total?");
    session.submit(&action_tx)?;

    let event = event_rx.recv().await.unwrap();
    assert!(session.handle_event(event));

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role(), Role::User);
    assert_eq!(
        session.take_notifications(),
        vec![Notification::error("backend unavailable")]
    );

    return Ok(());
}

#[tokio::test]
async fn it_discards_answers_after_session_is_gone() -> Result<()> {
    let gateway = Arc::new(StubGateway::with_delay(Duration::from_millis(20)));
    let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    let mut session = ConversationSession::new(DocumentIdentity::new("doc_abc123", "a.pdf"));
    session.set_input("Are you there?");
    session.submit(&action_tx)?;
    drop(event_rx);

    let res = QueryDispatcher::new(gateway.clone())
        .start(event_tx, action_rx)
        .await;

    assert!(res.is_ok());
    assert_eq!(gateway.calls().len(), 1);

    return Ok(());
}
