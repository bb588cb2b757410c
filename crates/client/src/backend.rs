use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::error::BackendResult;
use super::image::ImageFile;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const CHAT_PATH: &str = "/api/chat";
pub const CLASSIFY_PATH: &str = "/api/classify";
pub const HEALTH_PATH: &str = "/api/health";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim().trim_end_matches('/');
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
}

/// Body of a successful chat call.
///
/// The service answers with either `response` or `error`; both missing is a
/// degenerate but valid reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn response(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            response: None,
            error: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub result: Option<String>,
}

impl Classification {
    pub fn result(text: impl Into<String>) -> Self {
        Self {
            result: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    #[serde(default)]
    pub cnn_loaded: bool,
    #[serde(default)]
    pub nlp_loaded: bool,
    #[serde(default)]
    pub tokenizers_loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub models: ModelStatus,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Remote assistant service as seen by a chat session.
///
/// Every call is a single attempt: implementations must not retry, and a returned
/// error is final for the user action that triggered it.
pub trait AssistantBackend: Send + Sync {
    fn chat<'a>(&'a self, message: &'a str) -> BoxFuture<'a, BackendResult<ChatReply>>;
    fn classify<'a>(&'a self, file: &'a ImageFile) -> BoxFuture<'a, BackendResult<Classification>>;
    fn health(&self) -> BoxFuture<'_, BackendResult<HealthReport>>;
}
