use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use futures::future::BoxFuture;
use pantry_client::{
    AssistantBackend, BackendError, BackendResult, ChatReply, Classification, HealthReport,
    ImageFile,
};
use tokio::sync::oneshot;

use crate::message::Message;

/// One scripted answer: available immediately, or held until the test releases it.
pub(crate) enum Script<T> {
    Ready(BackendResult<T>),
    Gated(oneshot::Receiver<BackendResult<T>>),
}

impl<T> Script<T> {
    pub(crate) fn ready(result: BackendResult<T>) -> Self {
        Self::Ready(result)
    }

    pub(crate) fn gated() -> (Self, oneshot::Sender<BackendResult<T>>) {
        let (release_tx, release_rx) = oneshot::channel();
        (Self::Gated(release_rx), release_tx)
    }

    async fn resolve(self) -> BackendResult<T> {
        match self {
            Self::Ready(result) => result,
            Self::Gated(release_rx) => release_rx
                .await
                .unwrap_or_else(|_| Err(ScriptedBackend::unavailable())),
        }
    }
}

/// Backend double that answers from queues and records every call it receives.
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    chat_scripts: Mutex<VecDeque<Script<ChatReply>>>,
    classify_scripts: Mutex<VecDeque<Script<Classification>>>,
    chat_calls: Mutex<Vec<String>>,
    classify_calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub(crate) fn unavailable() -> BackendError {
        BackendError::Status {
            stage: "scripted-backend",
            url: "http://scripted.test/api".to_string(),
            status: 503,
            body: String::new(),
        }
    }

    pub(crate) fn push_chat(&self, script: Script<ChatReply>) {
        lock(&self.chat_scripts).push_back(script);
    }

    pub(crate) fn push_classify(&self, script: Script<Classification>) {
        lock(&self.classify_scripts).push_back(script);
    }

    pub(crate) fn chat_calls(&self) -> Vec<String> {
        lock(&self.chat_calls).clone()
    }

    /// File names of every classification request, in call order.
    pub(crate) fn classify_calls(&self) -> Vec<String> {
        lock(&self.classify_calls).clone()
    }
}

impl AssistantBackend for ScriptedBackend {
    fn chat<'a>(&'a self, message: &'a str) -> BoxFuture<'a, BackendResult<ChatReply>> {
        lock(&self.chat_calls).push(message.to_string());
        let script = lock(&self.chat_scripts).pop_front();
        Box::pin(async move {
            match script {
                Some(script) => script.resolve().await,
                None => Err(Self::unavailable()),
            }
        })
    }

    fn classify<'a>(&'a self, file: &'a ImageFile) -> BoxFuture<'a, BackendResult<Classification>> {
        lock(&self.classify_calls).push(file.file_name.clone());
        let script = lock(&self.classify_scripts).pop_front();
        Box::pin(async move {
            match script {
                Some(script) => script.resolve().await,
                None => Err(Self::unavailable()),
            }
        })
    }

    fn health(&self) -> BoxFuture<'_, BackendResult<HealthReport>> {
        Box::pin(async { Ok(HealthReport::default()) })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

pub(crate) fn texts(messages: &[Message]) -> Vec<&str> {
    messages.iter().filter_map(Message::text).collect()
}

/// Yields to spawned tasks until `condition` holds.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was not reached after yielding to spawned tasks");
}
