use pantry_client::ChatReply;

use crate::message::Message;
use crate::session::SessionController;

pub const UPLOAD_PROMPT_TEXT: &str = "Please upload an image for verification.";
pub const CONNECTIVITY_FAILURE_TEXT: &str =
    "Sorry, I'm having trouble connecting to the server. Please make sure the backend is running.";
pub const ERROR_PREFIX: &str = "Error: ";
pub const EMPTY_REPLY_TEXT: &str = "I couldn't generate a response.";

/// Why a send left the transcript untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    Empty,
    Busy,
}

/// How a send ended. Every variant except `Rejected` appended exactly one assistant entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(SendRejection),
    UploadPrompted,
    Replied,
    ServerError,
    Unreachable,
}

/// Holds the busy flag for one accepted send.
///
/// `finish` appends the terminal entry and clears the flag in one mutation. If the send is
/// dropped first, the connectivity failure text is appended instead, so every accepted user
/// entry still gets exactly one assistant reply.
struct BusyGuard<'a> {
    session: &'a SessionController,
    armed: bool,
}

impl<'a> BusyGuard<'a> {
    fn new(session: &'a SessionController) -> Self {
        Self {
            session,
            armed: true,
        }
    }

    fn finish(mut self, reply: Message) {
        self.armed = false;
        self.session.mutate(|state| {
            state.transcript.append(reply);
            state.busy = false;
        });
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(
            session_id = %self.session.id(),
            "chat send abandoned before its reply, answering with connectivity failure"
        );
        self.session.mutate(|state| {
            state
                .transcript
                .append(Message::assistant_text(CONNECTIVITY_FAILURE_TEXT));
            state.busy = false;
        });
    }
}

pub(crate) async fn run(session: &SessionController, text: &str) -> SendOutcome {
    let text = text.trim();
    if text.is_empty() {
        tracing::debug!(session_id = %session.id(), "ignoring blank chat message");
        return SendOutcome::Rejected(SendRejection::Empty);
    }

    let accepted = session.try_mutate(|state| {
        if state.busy {
            return None;
        }
        state.busy = true;
        state.transcript.append(Message::user_text(text));
        Some(())
    });
    if accepted.is_none() {
        tracing::debug!(session_id = %session.id(), "chat send rejected while busy");
        return SendOutcome::Rejected(SendRejection::Busy);
    }
    let guard = BusyGuard::new(session);

    if session.settings().is_trigger_phrase(text) {
        tracing::info!(session_id = %session.id(), "trigger phrase matched, asking for a photo");
        guard.finish(Message::assistant_text(UPLOAD_PROMPT_TEXT));
        return SendOutcome::UploadPrompted;
    }

    tracing::debug!(
        session_id = %session.id(),
        message_len = text.len(),
        "sending chat message"
    );
    let (reply, outcome) = match session.backend().chat(text).await {
        Ok(reply) => interpret_reply(reply),
        Err(error) => {
            tracing::warn!(
                session_id = %session.id(),
                stage = error.stage(),
                status = ?error.status(),
                "chat request failed: {error}"
            );
            (
                CONNECTIVITY_FAILURE_TEXT.to_string(),
                SendOutcome::Unreachable,
            )
        }
    };

    guard.finish(Message::assistant_text(reply));
    outcome
}

fn interpret_reply(reply: ChatReply) -> (String, SendOutcome) {
    if let Some(error) = reply.error.filter(|error| !error.trim().is_empty()) {
        return (format!("{ERROR_PREFIX}{error}"), SendOutcome::ServerError);
    }

    let text = reply
        .response
        .filter(|response| !response.trim().is_empty())
        .unwrap_or_else(|| EMPTY_REPLY_TEXT.to_string());
    (text, SendOutcome::Replied)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pantry_client::{BackendError, ChatReply};

    use super::*;
    use crate::message::Sender;
    use crate::settings::SessionSettings;
    use crate::testing::{Script, ScriptedBackend, texts, wait_until};

    fn session_with(backend: &Arc<ScriptedBackend>) -> SessionController {
        SessionController::new(backend.clone(), SessionSettings::default())
    }

    #[tokio::test]
    async fn trigger_phrase_prompts_for_upload_without_request() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session_with(&backend);

        let outcome = session.send_text("My Apple Are Rotten").await;

        assert_eq!(outcome, SendOutcome::UploadPrompted);
        let snapshot = session.snapshot();
        assert_eq!(
            texts(&snapshot)[1..],
            ["My Apple Are Rotten", UPLOAD_PROMPT_TEXT]
        );
        assert_eq!(snapshot[1].sender, Sender::User);
        assert_eq!(snapshot[2].sender, Sender::Assistant);
        assert!(backend.chat_calls().is_empty());
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn trigger_phrase_matches_after_trimming() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session_with(&backend);

        let outcome = session.send_text("  food is spoiled\n").await;

        assert_eq!(outcome, SendOutcome::UploadPrompted);
        assert_eq!(texts(&session.snapshot())[1], "food is spoiled");
        assert!(backend.chat_calls().is_empty());
    }

    #[tokio::test]
    async fn near_miss_phrase_reaches_the_chat_endpoint() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Script::ready(Ok(ChatReply::response("tell me more"))));
        let session = session_with(&backend);

        let outcome = session.send_text("my apple are rotten!").await;

        assert_eq!(outcome, SendOutcome::Replied);
        assert_eq!(backend.chat_calls(), ["my apple are rotten!"]);
    }

    #[tokio::test]
    async fn reply_is_appended_after_user_entry() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Script::ready(Ok(ChatReply::response("hi there"))));
        let session = session_with(&backend);

        let outcome = session.send_text("  hello ").await;

        assert_eq!(outcome, SendOutcome::Replied);
        assert_eq!(texts(&session.snapshot())[1..], ["hello", "hi there"]);
        assert_eq!(backend.chat_calls(), ["hello"]);
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn server_failure_appends_connectivity_text() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Script::ready(Err(BackendError::Status {
            stage: "read-chat-response",
            url: "http://localhost:5000/api/chat".to_string(),
            status: 500,
            body: "Internal Server Error".to_string(),
        })));
        let session = session_with(&backend);

        let outcome = session.send_text("hello").await;

        assert_eq!(outcome, SendOutcome::Unreachable);
        assert_eq!(
            texts(&session.snapshot())[1..],
            ["hello", CONNECTIVITY_FAILURE_TEXT]
        );
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn error_field_is_surfaced_with_prefix() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Script::ready(Ok(ChatReply::error("model not loaded"))));
        let session = session_with(&backend);

        let outcome = session.send_text("hello").await;

        assert_eq!(outcome, SendOutcome::ServerError);
        assert_eq!(
            texts(&session.snapshot()).last(),
            Some(&"Error: model not loaded")
        );
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn error_field_wins_over_reply_text() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Script::ready(Ok(ChatReply {
            response: Some("hi there".to_string()),
            error: Some("rate limited".to_string()),
        })));
        let session = session_with(&backend);

        let outcome = session.send_text("hello").await;

        assert_eq!(outcome, SendOutcome::ServerError);
        assert_eq!(
            texts(&session.snapshot())[1..],
            ["hello", "Error: rate limited"]
        );
    }

    #[tokio::test]
    async fn empty_reply_uses_fallback_text() {
        let backend = Arc::new(ScriptedBackend::default());
        backend.push_chat(Script::ready(Ok(ChatReply::default())));
        backend.push_chat(Script::ready(Ok(ChatReply {
            response: Some("   ".to_string()),
            error: Some(String::new()),
        })));
        let session = session_with(&backend);

        assert_eq!(session.send_text("hello").await, SendOutcome::Replied);
        assert_eq!(session.send_text("again").await, SendOutcome::Replied);

        assert_eq!(
            texts(&session.snapshot())[1..],
            ["hello", EMPTY_REPLY_TEXT, "again", EMPTY_REPLY_TEXT]
        );
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_mutation() {
        let backend = Arc::new(ScriptedBackend::default());
        let session = session_with(&backend);
        let views = session.subscribe();
        let before = session.snapshot();

        for text in ["", "   ", "\n\t"] {
            assert_eq!(
                session.send_text(text).await,
                SendOutcome::Rejected(SendRejection::Empty)
            );
        }

        assert_eq!(session.snapshot(), before);
        assert!(!views.has_changed().unwrap());
        assert!(backend.chat_calls().is_empty());
    }

    #[tokio::test]
    async fn busy_holds_until_reply_arrives() {
        let backend = Arc::new(ScriptedBackend::default());
        let (script, release) = Script::gated();
        backend.push_chat(script);
        let session = session_with(&backend);

        let sending = tokio::spawn({
            let session = session.clone();
            async move { session.send_text("hello").await }
        });
        wait_until(|| backend.chat_calls().len() == 1).await;

        let view = session.view();
        assert!(view.busy);
        assert_eq!(texts(&view.messages).last(), Some(&"hello"));

        release.send(Ok(ChatReply::response("hi there"))).unwrap();
        assert_eq!(sending.await.unwrap(), SendOutcome::Replied);
        assert!(!session.busy());
    }

    #[tokio::test]
    async fn dropped_send_replies_with_failure_and_clears_busy_flag() {
        let backend = Arc::new(ScriptedBackend::default());
        let (script, _release) = Script::gated();
        backend.push_chat(script);
        backend.push_chat(Script::ready(Ok(ChatReply::response("hi again"))));
        let session = session_with(&backend);

        let sending = tokio::spawn({
            let session = session.clone();
            async move { session.send_text("hello").await }
        });
        wait_until(|| backend.chat_calls().len() == 1).await;
        assert!(session.busy());

        sending.abort();
        assert!(sending.await.unwrap_err().is_cancelled());

        assert!(!session.busy());
        assert_eq!(
            texts(&session.snapshot())[1..],
            ["hello", CONNECTIVITY_FAILURE_TEXT]
        );

        assert_eq!(session.send_text("retry").await, SendOutcome::Replied);
        assert_eq!(
            texts(&session.snapshot())[1..],
            ["hello", CONNECTIVITY_FAILURE_TEXT, "retry", "hi again"]
        );
    }
}
