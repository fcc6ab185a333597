#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::models::Action;
use crate::domain::models::DocumentIdentity;
use crate::domain::models::Event;
use crate::domain::models::GatewayError;
use crate::domain::models::Message;
use crate::domain::models::Notification;
use crate::domain::models::QueryRequest;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingAnswer,
}

/// Conversation bound to a single document. At most one query is outstanding
/// at any time; the log is only touched by `submit` and `handle_event`.
pub struct ConversationSession {
    id: String,
    identity: DocumentIdentity,
    input: String,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    state: SessionState,
}

impl ConversationSession {
    pub fn new(identity: DocumentIdentity) -> ConversationSession {
        return ConversationSession {
            id: ConversationSession::create_id(),
            identity,
            input: "".to_string(),
            messages: vec![],
            notifications: vec![],
            state: SessionState::Idle,
        };
    }

    pub fn create_id() -> String {
        return Uuid::new_v4()
            .to_string()
            .split('-')
            .take(2)
            .collect::<Vec<&str>>()
            .join("-");
    }

    pub fn id(&self) -> &str {
        return &self.id;
    }

    pub fn identity(&self) -> &DocumentIdentity {
        return &self.identity;
    }

    pub fn messages(&self) -> &[Message] {
        return &self.messages;
    }

    pub fn state(&self) -> SessionState {
        return self.state;
    }

    pub fn is_pending(&self) -> bool {
        return self.state == SessionState::AwaitingAnswer;
    }

    pub fn input(&self) -> &str {
        return &self.input;
    }

    pub fn set_input(&mut self, text: &str) {
        self.input = text.to_string();
    }

    /// Whether the submit affordance should be enabled.
    pub fn can_submit(&self) -> bool {
        return self.state == SessionState::Idle
            && self.identity.is_scoped()
            && !self.input.trim().is_empty();
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        return std::mem::take(&mut self.notifications);
    }

    /// Sends the current input as a query. Returns `false` without changing
    /// anything when submission is disabled. The session is only touched once
    /// the query was handed to the dispatcher, a failed send leaves it `Idle`
    /// with the input intact.
    pub fn submit(&mut self, tx: &mpsc::UnboundedSender<Action>) -> Result<bool> {
        if !self.can_submit() {
            return Ok(false);
        }

        let text = self.input.trim().to_string();
        tx.send(Action::Query(QueryRequest {
            session_id: self.id.to_string(),
            identity: self.identity.clone(),
            text: text.to_string(),
        }))?;

        self.messages.push(Message::user(&text));
        self.input = "".to_string();
        self.state = SessionState::AwaitingAnswer;

        return Ok(true);
    }

    /// Applies a dispatcher result. Returns `false` when the event was
    /// discarded because it does not belong to the outstanding query.
    pub fn handle_event(&mut self, event: Event) -> bool {
        if event.session_id() != self.id || self.state != SessionState::AwaitingAnswer {
            tracing::debug!(
                session_id = self.id.as_str(),
                event_session_id = event.session_id(),
                "Discarding stale query result"
            );
            return false;
        }

        match event {
            Event::QueryResolved { answer, .. } => {
                self.messages.push(Message::assistant(&answer));
            }
            Event::QueryFailed { error, .. } => {
                self.fail(error);
            }
        }

        self.state = SessionState::Idle;
        return true;
    }

    fn fail(&mut self, error: GatewayError) {
        tracing::warn!(
            session_id = self.id.as_str(),
            status = error.status(),
            error = %error,
            "Query failed"
        );
        self.notify(Notification::error(&error.display_message()));
    }
}
