use std::sync::Arc;

use crate::ids::MessageId;
use crate::message::Message;

/// Outcome of resolving a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// False when the placeholder was already gone; the replacement is appended anyway.
    pub placeholder_removed: bool,
}

/// Ordered message log rendered by the view.
///
/// Entries only ever leave through [`Transcript::remove_by_id`] or
/// [`Transcript::resolve`], and neither reorders the survivors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript that opens with an assistant greeting, if one is given.
    pub fn seeded(greeting: Option<&str>) -> Self {
        let mut transcript = Self::new();
        if let Some(greeting) = greeting.map(str::trim).filter(|text| !text.is_empty()) {
            transcript.append(Message::assistant_text(greeting));
        }
        transcript
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes the entry with `id`. Absent ids are a no-op.
    pub fn remove_by_id(&mut self, id: MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|message| message.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Replaces the pending entry `pending_id` with `replacement` in one step.
    ///
    /// Only a pending entry is removed; a final entry that happens to share the id is
    /// left alone. The replacement is always appended so every placeholder yields
    /// exactly one terminal entry.
    pub fn resolve(&mut self, pending_id: MessageId, replacement: Message) -> Resolution {
        let index = self
            .messages
            .iter()
            .position(|message| message.id == pending_id && message.is_pending());
        if let Some(index) = index {
            self.messages.remove(index);
        }
        self.messages.push(replacement);

        Resolution {
            placeholder_removed: index.is_some(),
        }
    }

    pub fn snapshot(&self) -> Arc<[Message]> {
        Arc::from(self.messages.as_slice())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.get(id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.is_pending())
            .count()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
