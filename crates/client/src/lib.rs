#![deny(unsafe_code)]

//! HTTP boundary for the assistant service.
//!
//! The chat session only talks to the service through [`AssistantBackend`], so the
//! flows can be driven by the real [`HttpBackend`] or by an in-memory double.
mod backend;
mod error;
mod http;
mod image;

pub use backend::{
    AssistantBackend, BackendConfig, CHAT_PATH, CLASSIFY_PATH, ChatReply, Classification,
    DEFAULT_BASE_URL, HEALTH_PATH, HealthReport, ModelStatus,
};
pub use error::{BackendError, BackendResult};
pub use http::HttpBackend;
pub use image::ImageFile;
