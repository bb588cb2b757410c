use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pantry_client::{AssistantBackend, ImageFile};
use tokio::sync::watch;

use crate::ids::SessionId;
use crate::message::Message;
use crate::send_text::{self, SendOutcome};
use crate::settings::SessionSettings;
use crate::transcript::Transcript;
use crate::upload_image::{self, UploadOutcome};

/// What a transcript view renders: the ordered entries plus the input gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub messages: Arc<[Message]>,
    pub busy: bool,
}

/// Everything the flows mutate. Only ever touched under the session lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) transcript: Transcript,
    pub(crate) busy: bool,
}

impl SessionState {
    fn view(&self) -> SessionView {
        SessionView {
            messages: self.transcript.snapshot(),
            busy: self.busy,
        }
    }
}

struct SessionInner {
    id: SessionId,
    backend: Arc<dyn AssistantBackend>,
    settings: SessionSettings,
    state: Mutex<SessionState>,
    view_tx: watch::Sender<SessionView>,
}

/// Owns one transcript and its busy flag, and runs both flows over them.
///
/// Cloning yields another handle to the same session, so flows can be spawned as
/// independent tasks. All mutation goes through one lock that is never held across
/// an await, which keeps append order equal to mutation order.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn new(backend: Arc<dyn AssistantBackend>, settings: SessionSettings) -> Self {
        let settings = settings.normalized();
        let state = SessionState {
            transcript: Transcript::seeded(settings.greeting.as_deref()),
            busy: false,
        };
        let (view_tx, _) = watch::channel(state.view());
        let id = SessionId::new_v7();

        tracing::info!(
            session_id = %id,
            base_url = %settings.base_url,
            trigger_phrase_count = settings.trigger_phrases.len(),
            "chat session started"
        );

        Self {
            inner: Arc::new(SessionInner {
                id,
                backend,
                settings,
                state: Mutex::new(state),
                view_tx,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    pub fn busy(&self) -> bool {
        self.lock().busy
    }

    pub fn snapshot(&self) -> Arc<[Message]> {
        self.lock().transcript.snapshot()
    }

    pub fn view(&self) -> SessionView {
        self.lock().view()
    }

    /// Receives a fresh [`SessionView`] after every transcript or busy change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view_tx.subscribe()
    }

    pub async fn send_text(&self, text: &str) -> SendOutcome {
        send_text::run(self, text).await
    }

    pub async fn upload_image(&self, file: ImageFile) -> UploadOutcome {
        upload_image::run(self, file).await
    }

    pub(crate) fn backend(&self) -> &dyn AssistantBackend {
        self.inner.backend.as_ref()
    }

    /// Applies one mutation and publishes the resulting view before releasing the lock.
    pub(crate) fn mutate<R>(&self, apply: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.lock();
        let result = apply(&mut state);
        self.inner.view_tx.send_replace(state.view());
        result
    }

    /// Like [`Self::mutate`], but publishes only when `apply` returns `Some`.
    pub(crate) fn try_mutate<R>(
        &self,
        apply: impl FnOnce(&mut SessionState) -> Option<R>,
    ) -> Option<R> {
        let mut state = self.lock();
        let result = apply(&mut state)?;
        self.inner.view_tx.send_replace(state.view());
        Some(result)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
