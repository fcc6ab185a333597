use super::GatewayError;

#[derive(Debug)]
pub enum Event {
    QueryResolved {
        session_id: String,
        answer: String,
    },
    QueryFailed {
        session_id: String,
        error: GatewayError,
    },
}

impl Event {
    pub fn session_id(&self) -> &str {
        match self {
            Event::QueryResolved { session_id, .. } => return session_id,
            Event::QueryFailed { session_id, .. } => return session_id,
        }
    }
}
