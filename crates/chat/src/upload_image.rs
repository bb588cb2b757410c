use pantry_client::{Classification, ImageFile};

use crate::ids::MessageId;
use crate::message::{ImageRef, Message};
use crate::session::SessionController;
use crate::upload::{UploadRejection, validate_upload};

pub const PLACEHOLDER_TEXT: &str = "Analyzing your image...";
pub const UNABLE_TO_ANALYZE_TEXT: &str = "Unable to analyze the image.";
pub const UPLOAD_FAILURE_TEXT: &str =
    "Image upload failed. Please make sure the backend server is running and try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Rejected(UploadRejection),
    Classified,
    Failed,
}

/// Owns one placeholder until it is resolved.
///
/// Dropping an unresolved guard replaces the placeholder with the failure text, so a
/// placeholder never outlives its upload.
struct PlaceholderGuard<'a> {
    session: &'a SessionController,
    pending_id: MessageId,
    armed: bool,
}

impl<'a> PlaceholderGuard<'a> {
    fn new(session: &'a SessionController, pending_id: MessageId) -> Self {
        Self {
            session,
            pending_id,
            armed: true,
        }
    }

    fn resolve(mut self, replacement: Message) {
        self.armed = false;
        self.settle(replacement);
    }

    fn settle(&self, replacement: Message) {
        let resolution = self
            .session
            .mutate(|state| state.transcript.resolve(self.pending_id, replacement));
        tracing::debug!(
            session_id = %self.session.id(),
            pending_id = %self.pending_id,
            placeholder_removed = resolution.placeholder_removed,
            "image placeholder resolved"
        );
    }
}

impl Drop for PlaceholderGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(
            session_id = %self.session.id(),
            pending_id = %self.pending_id,
            "image upload abandoned before classification"
        );
        self.settle(Message::assistant_text(UPLOAD_FAILURE_TEXT));
    }
}

pub(crate) async fn run(session: &SessionController, file: ImageFile) -> UploadOutcome {
    if let Err(rejection) = validate_upload(&file, session.settings().max_upload_bytes) {
        tracing::info!(
            session_id = %session.id(),
            file_name = %file.file_name,
            "image upload rejected: {rejection}"
        );
        session.mutate(|state| {
            state
                .transcript
                .append(Message::assistant_text(rejection.user_message()));
        });
        return UploadOutcome::Rejected(rejection);
    }

    let placeholder = Message::assistant_pending(PLACEHOLDER_TEXT);
    let guard = PlaceholderGuard::new(session, placeholder.id);
    session.mutate(|state| {
        state
            .transcript
            .append(Message::user_image(ImageRef::from(&file)));
        state.transcript.append(placeholder);
    });

    tracing::debug!(
        session_id = %session.id(),
        file_name = %file.file_name,
        media_type = %file.media_type,
        size = file.size(),
        "uploading image for classification"
    );
    let (text, outcome) = match session.backend().classify(&file).await {
        Ok(classification) => (result_text(classification), UploadOutcome::Classified),
        Err(error) => {
            tracing::warn!(
                session_id = %session.id(),
                file_name = %file.file_name,
                stage = error.stage(),
                status = ?error.status(),
                "image classification failed: {error}"
            );
            (UPLOAD_FAILURE_TEXT.to_string(), UploadOutcome::Failed)
        }
    };

    guard.resolve(Message::assistant_text(text));
    outcome
}

fn result_text(classification: Classification) -> String {
    classification
        .result
        .filter(|result| !result.trim().is_empty())
        .unwrap_or_else(|| UNABLE_TO_ANALYZE_TEXT.to_string())
}
