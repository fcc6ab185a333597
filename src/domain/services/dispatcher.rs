#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::domain::models::Action;
use crate::domain::models::DocumentIdentity;
use crate::domain::models::Event;
use crate::domain::models::GatewayError;
use crate::domain::models::GatewayRef;
use crate::domain::models::QueryRequest;

/// Forwards conversation queries to the gateway. This is the only caller of
/// `Gateway::query`.
pub struct QueryDispatcher {
    gateway: GatewayRef,
}

impl QueryDispatcher {
    pub fn new(gateway: GatewayRef) -> QueryDispatcher {
        return QueryDispatcher { gateway };
    }

    pub async fn dispatch(
        &self,
        identity: &DocumentIdentity,
        text: &str,
    ) -> Result<String, GatewayError> {
        let document_id = identity.document_id().ok_or(GatewayError::Unscoped)?;
        let res = self.gateway.query(document_id, text).await?;

        return Ok(res.answer);
    }

    async fn handle_query(&self, request: QueryRequest) -> Event {
        tracing::debug!(session_id = request.session_id.as_str(), "Dispatching query");

        match self.dispatch(&request.identity, &request.text).await {
            Ok(answer) => {
                return Event::QueryResolved {
                    session_id: request.session_id,
                    answer,
                };
            }
            Err(error) => {
                return Event::QueryFailed {
                    session_id: request.session_id,
                    error,
                };
            }
        }
    }

    /// Serves actions until the session hangs up. Each query is awaited before
    /// the next action is read, so there is never more than one request in
    /// flight.
    pub async fn start(
        self,
        tx: mpsc::UnboundedSender<Event>,
        mut rx: mpsc::UnboundedReceiver<Action>,
    ) -> Result<()> {
        while let Some(action) = rx.recv().await {
            match action {
                Action::Query(request) => {
                    let event = self.handle_query(request).await;
                    if tx.send(event).is_err() {
                        tracing::debug!("Session closed before the answer arrived, discarding it");
                        break;
                    }
                }
            }
        }

        return Ok(());
    }
}
