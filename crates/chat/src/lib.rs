#![deny(unsafe_code)]

//! Message-session core for the pantry assistant.
//!
//! A [`SessionController`] owns one transcript and the busy flag, and runs the
//! send-text and upload-image flows against an [`AssistantBackend`]. Presentation
//! layers only read [`SessionView`]s and call the two flow entry points.
pub mod ids;
/// Transcript entries and their content.
pub mod message;
pub mod send_text;
pub mod session;
/// Configuration passed into a session at construction.
pub mod settings;
pub mod transcript;
pub mod upload;
pub mod upload_image;

#[cfg(test)]
mod testing;

pub use ids::{MessageId, SessionId};
pub use message::{Content, ImageRef, Message, MessageStatus, Sender};
pub use pantry_client::{AssistantBackend, ImageFile};
pub use send_text::{SendOutcome, SendRejection};
pub use session::{SessionController, SessionView};
pub use settings::{SessionSettings, SettingsError, SettingsStore};
pub use transcript::{Resolution, Transcript};
pub use upload::{DEFAULT_MAX_UPLOAD_BYTES, UploadRejection, validate_upload};
pub use upload_image::UploadOutcome;
