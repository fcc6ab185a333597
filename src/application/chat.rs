#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use std::io;
use std::io::Write;

use anyhow::Result;
use owo_colors::OwoColorize;
use owo_colors::Stream;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::sync::mpsc;

use crate::domain::models::Action;
use crate::domain::models::DocumentIdentity;
use crate::domain::models::Event;
use crate::domain::models::GatewayError;
use crate::domain::models::GatewayRef;
use crate::domain::models::Notification;
use crate::domain::models::NotificationLevel;
use crate::domain::models::Role;
use crate::domain::models::SlashCommand;
use crate::domain::services::ConversationSession;
use crate::domain::services::QueryDispatcher;

const PENDING_MESSAGE: &str = "Still waiting for an answer to your previous question.";

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /link (/l) - Prints the chat link for this document, to reopen the conversation later.
- /quit /exit (/q) - Exit docchat.
- /help (/h) - Provides this help menu.

Anything else is sent as a question about the document. One question is answered at a time.
    "#;

    return text.trim().to_string();
}

/// Terminal presentation of a `ConversationSession`. Only new log entries and
/// pending notifications are printed.
struct ChatView<'a, W: Write> {
    out: &'a mut W,
    rendered: usize,
}

impl<'a, W: Write> ChatView<'a, W> {
    fn new(out: &'a mut W) -> ChatView<'a, W> {
        return ChatView { out, rendered: 0 };
    }

    fn header(&mut self, identity: &DocumentIdentity) -> Result<()> {
        let name = if identity.display_name().is_empty() {
            "your document"
        } else {
            identity.display_name()
        };

        writeln!(
            self.out,
            "Chatting about {}. Type a question and press enter, /help for commands.",
            name.if_supports_color(Stream::Stdout, |text| return text.bold())
        )?;

        return Ok(());
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{text}")?;
        return Ok(());
    }

    fn render(&mut self, session: &mut ConversationSession) -> Result<()> {
        for message in session.messages().iter().skip(self.rendered) {
            if message.role() == Role::Assistant {
                writeln!(
                    self.out,
                    "{} {}",
                    "Assistant:".if_supports_color(Stream::Stdout, |text| return text.cyan()),
                    message.content()
                )?;
            }
        }
        self.rendered = session.messages().len();

        for notification in session.take_notifications() {
            match notification.level {
                NotificationLevel::Warning => {
                    writeln!(
                        self.out,
                        "{}",
                        notification
                            .message
                            .if_supports_color(Stream::Stdout, |text| return text.yellow())
                    )?;
                }
                NotificationLevel::Error => {
                    writeln!(
                        self.out,
                        "{}",
                        notification
                            .message
                            .if_supports_color(Stream::Stdout, |text| return text.red())
                    )?;
                }
            }
        }

        self.out.flush()?;
        return Ok(());
    }
}

/// Returns `false` once the user asked to leave.
fn handle_line<W: Write>(
    text: &str,
    session: &mut ConversationSession,
    tx: &mpsc::UnboundedSender<Action>,
    view: &mut ChatView<W>,
) -> Result<bool> {
    if let Some(cmd) = SlashCommand::parse(text) {
        if cmd.is_quit() {
            return Ok(false);
        }
        if cmd.is_help() {
            view.line(&help_text())?;
        }
        if cmd.is_link() {
            if session.identity().is_scoped() {
                view.line(&session.identity().navigation_target())?;
            } else {
                session.notify(Notification::warning(
                    &GatewayError::Unscoped.display_message(),
                ));
            }
        }

        view.render(session)?;
        return Ok(true);
    }

    if text.trim().is_empty() {
        return Ok(true);
    }

    if session.is_pending() {
        session.notify(Notification::warning(PENDING_MESSAGE));
        view.render(session)?;
        return Ok(true);
    }

    session.set_input(text);
    if session.submit(tx)? {
        view.line(&format!(
            "{}",
            "Thinking...".if_supports_color(Stream::Stdout, |text| return text.dimmed())
        ))?;
    } else if !session.identity().is_scoped() {
        session.set_input("");
        session.notify(Notification::warning(
            &GatewayError::Unscoped.display_message(),
        ));
    }

    view.render(session)?;
    return Ok(true);
}

async fn chat_loop<R, W>(
    input: R,
    session: &mut ConversationSession,
    tx: mpsc::UnboundedSender<Action>,
    mut rx: mpsc::UnboundedReceiver<Event>,
    view: &mut ChatView<'_, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut input_closed = false;

    loop {
        tokio::select! {
            line = lines.next_line(), if !input_closed => {
                match line? {
                    Some(text) => {
                        if !handle_line(&text, session, &tx, view)? {
                            break;
                        }
                    }
                    None => {
                        // Piped input: wait for the last answer before leaving.
                        input_closed = true;
                        if !session.is_pending() {
                            break;
                        }
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        session.handle_event(event);
                        view.render(session)?;
                        if input_closed && !session.is_pending() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    return Ok(());
}

/// Runs a conversation over `input`, writing the transcript to `out`. Answers
/// still in flight when the conversation ends are discarded.
pub async fn run<R, W>(
    identity: DocumentIdentity,
    gateway: GatewayRef,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = ConversationSession::new(identity);
    let mut view = ChatView::new(out);
    view.header(session.identity())?;

    if !session.identity().is_scoped() {
        session.notify(Notification::warning(
            &GatewayError::Unscoped.display_message(),
        ));
    } else if let Err(err) = gateway.health_check().await {
        tracing::warn!(error = %err, "Gateway health check failed");
        session.notify(Notification::warning(&err.display_message()));
    }
    view.render(&mut session)?;

    let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let dispatcher = tokio::spawn(QueryDispatcher::new(gateway).start(event_tx, action_rx));

    tracing::debug!(session_id = session.id(), "Chat session started");
    let res = chat_loop(input, &mut session, action_tx, event_rx, &mut view).await;
    dispatcher.abort();
    tracing::debug!(
        session_id = session.id(),
        messages = session.messages().len(),
        "Chat session ended"
    );

    return res;
}

pub async fn start(identity: DocumentIdentity, gateway: GatewayRef) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    return run(identity, gateway, stdin, &mut io::stdout()).await;
}
