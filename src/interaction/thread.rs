//! Conversation thread assembly.

use crate::rooms::{compare_timestamps, Message};

/// Build the context thread for `selected`.
///
/// Takes up to `max_len - 1` earlier messages from the same room (never the
/// selected message itself, never anything newer) and returns them oldest
/// first with `selected` appended last. `max_len` below 1 is treated as 1.
pub fn build_conversation_thread(
    selected: &Message,
    history: &[Message],
    max_len: usize,
) -> Vec<Message> {
    let max_len = max_len.max(1);

    let mut earlier: Vec<&Message> = history
        .iter()
        .filter(|m| m.id != selected.id)
        .filter(|m| same_room(m, selected))
        .filter(|m| compare_timestamps(&m.timestamp, &selected.timestamp).is_le())
        .collect();

    // Newest first, then flipped to chronological.
    earlier.sort_by(|a, b| compare_timestamps(&b.timestamp, &a.timestamp));
    earlier.truncate(max_len - 1);
    earlier.reverse();

    let mut thread: Vec<Message> = earlier.into_iter().cloned().collect();
    thread.push(selected.clone());
    thread
}

/// Messages without a room id are assumed to belong to the fetched room.
fn same_room(a: &Message, b: &Message) -> bool {
    a.room_id.is_empty() || b.room_id.is_empty() || a.room_id == b.room_id
}
