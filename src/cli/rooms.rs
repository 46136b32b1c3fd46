//! Room gateway commands: `rooms`, `history`, `send`, `join`.

use anyhow::{Context, Result};

use super::common::{build_connection, load_config, preview};

pub(crate) async fn cmd_rooms(tags: Vec<String>) -> Result<()> {
    let config = load_config()?;
    let connection = build_connection(&config)?;

    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let rooms = connection
        .list_rooms(&tags)
        .await
        .context("Failed to list rooms")?;

    if rooms.is_empty() {
        println!("No rooms found.");
        return Ok(());
    }

    println!("{:<20} {:<24} {:>8}  TOPIC", "ID", "NAME", "MESSAGES");
    for room in &rooms {
        println!(
            "{:<20} {:<24} {:>8}  {}",
            room.id,
            preview(room.name_or_id(), 24),
            room.message_count,
            room.topic
        );
        if !room.tags.is_empty() {
            let tags: Vec<&str> = room.tags.iter().map(String::as_str).collect();
            println!("{:<20} tags: {}", "", tags.join(", "));
        }
    }
    Ok(())
}

pub(crate) async fn cmd_history(room_id: &str, limit: usize) -> Result<()> {
    let config = load_config()?;
    let connection = build_connection(&config)?;

    let messages = connection
        .get_room_history(room_id)
        .await
        .with_context(|| format!("Failed to fetch history for room '{}'", room_id))?;

    if messages.is_empty() {
        println!("No messages in '{}'.", room_id);
        return Ok(());
    }

    // History arrives newest first; print oldest first.
    for message in messages.iter().take(limit).rev() {
        println!(
            "[{}] {}: {}",
            message.timestamp,
            message.sender.username,
            preview(&message.content, 160)
        );
    }
    Ok(())
}

pub(crate) async fn cmd_send(room_id: &str, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Message text must not be empty");
    }

    let config = load_config()?;
    let connection = build_connection(&config)?;

    let message = connection
        .send_message(room_id, text)
        .await
        .with_context(|| format!("Failed to send message to '{}'", room_id))?;
    println!("Sent {} at {}", message.id, message.timestamp);
    Ok(())
}

pub(crate) async fn cmd_join(room_id: &str) -> Result<()> {
    let config = load_config()?;
    let connection = build_connection(&config)?;

    let room = connection
        .join_room(room_id)
        .await
        .with_context(|| format!("Failed to join room '{}'", room_id))?;
    println!(
        "Joined {} ({} participant(s))",
        room.name_or_id(),
        room.participants.len()
    );
    Ok(())
}
