use std::sync::Arc;

use pantry_client::ImageFile;

use crate::ids::MessageId;

/// Who a transcript entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Assistant,
}

/// Display-only image payload.
///
/// The session never inspects the bytes; it only carries them to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl ImageRef {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl From<&ImageFile> for ImageRef {
    fn from(file: &ImageFile) -> Self {
        Self {
            file_name: file.file_name.clone(),
            media_type: file.media_type.clone(),
            bytes: Arc::clone(&file.bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Image(ImageRef),
}

impl Content {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageRef> {
        match self {
            Self::Image(image) => Some(image),
            Self::Text(_) => None,
        }
    }
}

/// Lifecycle of an entry.
///
/// `Pending` marks a placeholder that is waiting to be resolved into a `Final` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    Final,
    Pending,
}

/// One immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub content: Content,
    pub status: MessageStatus,
}

impl Message {
    pub fn new(sender: Sender, content: Content, status: MessageStatus) -> Self {
        Self {
            id: MessageId::new_v7(),
            sender,
            content,
            status,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Sender::User, Content::Text(text.into()), MessageStatus::Final)
    }

    pub fn user_image(image: ImageRef) -> Self {
        Self::new(Sender::User, Content::Image(image), MessageStatus::Final)
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(
            Sender::Assistant,
            Content::Text(text.into()),
            MessageStatus::Final,
        )
    }

    /// Creates an assistant placeholder; its id is the handle used to resolve it.
    pub fn assistant_pending(text: impl Into<String>) -> Self {
        Self::new(
            Sender::Assistant,
            Content::Text(text.into()),
            MessageStatus::Pending,
        )
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }
}
