use std::collections::HashSet;

use pantry_chat::{Content, Message, MessageId, Sender, SessionView};
use tokio::sync::watch;

const BYTES_PER_KB: u64 = 1024;

/// Prints every entry exactly once, in transcript order, as views arrive.
///
/// A resolved placeholder disappears from the view and its replacement shows up as a
/// new entry, so following the tail is enough to mirror the transcript.
pub async fn follow(mut views: watch::Receiver<SessionView>) {
    let mut shown = HashSet::new();

    loop {
        let view = views.borrow_and_update().clone();
        for line in unseen_lines(&view, &mut shown) {
            println!("{line}");
        }

        if views.changed().await.is_err() {
            tracing::debug!("session closed, transcript renderer stopping");
            return;
        }
    }
}

/// Formats the entries of `view` not yet in `shown`, then forgets ids that left the view.
pub fn unseen_lines(view: &SessionView, shown: &mut HashSet<MessageId>) -> Vec<String> {
    let lines = view
        .messages
        .iter()
        .filter(|message| shown.insert(message.id))
        .map(format_entry)
        .collect();

    shown.retain(|id| view.messages.iter().any(|message| message.id == *id));
    lines
}

pub fn format_entry(message: &Message) -> String {
    let label = match message.sender {
        Sender::User => "you >",
        Sender::Assistant => "bot >",
    };

    match &message.content {
        Content::Text(text) => format!("{label} {text}"),
        Content::Image(image) => format!(
            "{label} [image: {}, {} KB]",
            image.file_name,
            image.size().div_ceil(BYTES_PER_KB)
        ),
    }
}
