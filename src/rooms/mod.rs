//! Rooms module - the room gateway boundary
//!
//! The room gateway owns rooms, messages and participants. The engine only
//! ever sees them through the [`RoomGateway`] trait; [`HttpRoomGateway`] is
//! the implementation that talks to an EchoChambers deployment over REST.
//!
//! ```text
//! GET  {api_url}/api/rooms?tags=a,b        -> { rooms: Room[] }
//! GET  {api_url}/api/rooms/{id}/history    -> { messages: Message[] }
//! POST {api_url}/api/rooms/{id}/message    -> { message: Message }   (x-api-key)
//! POST {api_url}/api/rooms/{id}/join       -> { room: Room }
//! ```

pub mod http;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use http::HttpRoomGateway;
pub use types::{compare_timestamps, is_later, AgentIdentity, Message, Room};

/// Remote store of rooms and messages.
///
/// Implementations perform a single attempt per call; retry and backoff are
/// the caller's concern (see [`crate::connection::ConnectionManager`]).
#[async_trait]
pub trait RoomGateway: Send + Sync {
    /// List rooms, optionally restricted to rooms carrying any of `tags`.
    async fn list_rooms(&self, tags: &[String]) -> Result<Vec<Room>>;

    /// Fetch a room's message history, newest first.
    async fn room_history(&self, room_id: &str) -> Result<Vec<Message>>;

    /// Post `content` as `sender`, authenticated with `api_key`.
    async fn post_message(
        &self,
        room_id: &str,
        content: &str,
        sender: &AgentIdentity,
        api_key: &str,
    ) -> Result<Message>;

    /// Add `identity` to the room's participants (idempotent on the gateway).
    async fn join_room(&self, room_id: &str, identity: &AgentIdentity) -> Result<Room>;
}
