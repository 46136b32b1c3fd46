//! Connection module - resilient access to the room gateway
//!
//! [`ConnectionManager`] wraps a [`RoomGateway`] with per-call retry
//! ([`RetryPolicy`]), tracks which room the agent is watching, and owns the
//! reconnection counter the scheduler consults after a failed poll cycle.

pub mod retry;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{EchoError, Result};
use crate::log_component;
use crate::rooms::{AgentIdentity, HttpRoomGateway, Message, Room, RoomGateway};

pub use retry::RetryPolicy;

/// How many consecutive failed cycles are tolerated and how long to pause
/// after each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(5_000),
        }
    }
}

/// Retry-wrapped gateway access plus watched-room and reconnection state.
pub struct ConnectionManager {
    gateway: Arc<dyn RoomGateway>,
    identity: AgentIdentity,
    api_key: String,
    default_room: Option<String>,
    join_watched_room: bool,
    retry: RetryPolicy,
    reconnect: ReconnectPolicy,
    watched_room: RwLock<Option<String>>,
    reconnect_attempts: AtomicU32,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("identity", &self.identity)
            .field("default_room", &self.default_room)
            .field("watched_room", &self.watched_room())
            .field("retry", &self.retry)
            .field("reconnect", &self.reconnect)
            .field("reconnect_attempts", &self.reconnect_attempts())
            .finish()
    }
}

impl ConnectionManager {
    /// Create a manager over `gateway` with default retry and reconnection
    /// settings and no default room.
    pub fn new(
        gateway: Arc<dyn RoomGateway>,
        identity: AgentIdentity,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            identity,
            api_key: api_key.into(),
            default_room: None,
            join_watched_room: false,
            retry: RetryPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            watched_room: RwLock::new(None),
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    /// Build a manager with an HTTP gateway from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let gateway = HttpRoomGateway::new(&config.gateway.api_url, config.request_timeout())?;
        Ok(Self::with_gateway_from_config(Arc::new(gateway), config))
    }

    /// Build a manager over an arbitrary gateway using configured settings.
    pub fn with_gateway_from_config(gateway: Arc<dyn RoomGateway>, config: &Config) -> Self {
        let api_key = config.gateway.api_key.clone().unwrap_or_default();
        Self::new(gateway, config.identity(), api_key)
            .with_default_room(config.agent.default_room.clone())
            .with_join_watched_room(config.agent.join_watched_room)
            .with_retry(RetryPolicy::from_config(&config.retry))
            .with_reconnect(ReconnectPolicy {
                max_attempts: config.retry.max_reconnect_attempts,
                delay: Duration::from_millis(config.retry.reconnect_delay_ms),
            })
    }

    pub fn with_default_room(mut self, room: Option<String>) -> Self {
        self.default_room = room.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn with_join_watched_room(mut self, join: bool) -> Self {
        self.join_watched_room = join;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    // ------------------------------------------------------------------
    // Gateway operations (retried)
    // ------------------------------------------------------------------

    /// List rooms, optionally filtered by tags.
    pub async fn list_rooms(&self, tags: &[String]) -> Result<Vec<Room>> {
        self.retry
            .run("list_rooms", || self.gateway.list_rooms(tags))
            .await
    }

    /// Fetch a room's history, newest first as delivered.
    pub async fn get_room_history(&self, room_id: &str) -> Result<Vec<Message>> {
        self.retry
            .run("get_room_history", || self.gateway.room_history(room_id))
            .await
    }

    /// Post `content` to `room_id` as this agent.
    pub async fn send_message(&self, room_id: &str, content: &str) -> Result<Message> {
        let message = self
            .retry
            .run("send_message", || {
                self.gateway
                    .post_message(room_id, content, &self.identity, &self.api_key)
            })
            .await?;
        debug!(room_id, message_id = %message.id, "Message sent");
        Ok(message)
    }

    /// Add this agent to a room's participants.
    pub async fn join_room(&self, room_id: &str) -> Result<Room> {
        let room = self
            .retry
            .run("join_room", || self.gateway.join_room(room_id, &self.identity))
            .await?;
        info!(room_id, participants = room.participants.len(), "Joined room");
        Ok(room)
    }

    // ------------------------------------------------------------------
    // Watched room and lifecycle
    // ------------------------------------------------------------------

    /// Validate that `room_id` exists and make it the watched room.
    pub async fn watch_room(&self, room_id: &str) -> Result<Room> {
        let rooms = self.list_rooms(&[]).await?;
        self.watch_from_listing(room_id, rooms).await
    }

    async fn watch_from_listing(&self, room_id: &str, rooms: Vec<Room>) -> Result<Room> {
        let room = rooms
            .into_iter()
            .find(|r| r.id == room_id)
            .ok_or_else(|| EchoError::RoomNotFound(room_id.to_string()))?;

        let room = if self.join_watched_room && !room.has_participant(&self.identity.username) {
            self.join_room(room_id).await?
        } else {
            room
        };

        *self
            .watched_room
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(room.id.clone());
        info!(room_id = %room.id, topic = %room.topic, "Watching room");
        Ok(room)
    }

    /// Check connectivity and watch the default room if one is configured.
    pub async fn start(&self) -> Result<()> {
        let rooms = self.list_rooms(&[]).await?;
        info!(
            username = %self.identity.username,
            rooms = rooms.len(),
            "Connected to room gateway"
        );

        if let Some(default_room) = &self.default_room {
            if self.watched_room().is_none() {
                self.watch_from_listing(default_room, rooms).await?;
            }
        }
        Ok(())
    }

    /// Forget the watched room. Safe to call repeatedly.
    pub fn stop(&self) {
        let previous = self
            .watched_room
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(room_id) = previous {
            info!(room_id, "Stopped watching room");
        }
    }

    pub fn watched_room(&self) -> Option<String> {
        self.watched_room
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn default_room(&self) -> Option<&str> {
        self.default_room.as_deref()
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    // ------------------------------------------------------------------
    // Reconnection
    // ------------------------------------------------------------------

    /// Record a failed poll cycle.
    ///
    /// Pauses for the reconnection delay and returns `Ok` while the count of
    /// consecutive failures is within the ceiling. Past the ceiling the
    /// manager stops itself and returns [`EchoError::ReconnectExhausted`].
    pub async fn handle_reconnection(&self) -> Result<()> {
        let attempts = self.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if attempts > self.reconnect.max_attempts {
            error!(
                attempts,
                max_attempts = self.reconnect.max_attempts,
                "Reconnection attempts exhausted, stopping"
            );
            self.stop();
            return Err(EchoError::ReconnectExhausted { attempts });
        }

        log_component!(
            warn,
            "connection",
            "Poll cycle failed, reconnecting",
            attempts = attempts,
            max_attempts = self.reconnect.max_attempts,
            delay_ms = self.reconnect.delay.as_millis() as u64,
        );
        tokio::time::sleep(self.reconnect.delay).await;
        Ok(())
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::SeqCst)
    }

    /// Clear the failure count after a successful cycle.
    pub fn reset_reconnect_attempts(&self) {
        let previous = self.reconnect_attempts.swap(0, Ordering::SeqCst);
        if previous > 0 {
            info!(previous, "Gateway recovered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Gateway serving a fixed room list, failing the first `fail_first` calls.
    struct StubGateway {
        rooms: Vec<Room>,
        fail_first: Mutex<u32>,
        calls: Mutex<Vec<String>>,
    }

    impl StubGateway {
        fn new(rooms: Vec<Room>) -> Self {
            Self {
                rooms,
                fail_first: Mutex::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(rooms: Vec<Room>, n: u32) -> Self {
            let stub = Self::new(rooms);
            *stub.fail_first.lock().unwrap() = n;
            stub
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn tick(&self, call: &str) -> Result<()> {
            self.calls.lock().unwrap().push(call.to_string());
            let mut remaining = self.fail_first.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GatewayError::Network("connection refused".into()).into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RoomGateway for StubGateway {
        async fn list_rooms(&self, _tags: &[String]) -> Result<Vec<Room>> {
            self.tick("list_rooms")?;
            Ok(self.rooms.clone())
        }

        async fn room_history(&self, _room_id: &str) -> Result<Vec<Message>> {
            self.tick("room_history")?;
            Ok(Vec::new())
        }

        async fn post_message(
            &self,
            room_id: &str,
            content: &str,
            sender: &AgentIdentity,
            _api_key: &str,
        ) -> Result<Message> {
            self.tick("post_message")?;
            Ok(Message {
                id: "reply-1".to_string(),
                content: content.to_string(),
                sender: sender.clone(),
                timestamp: "2024-05-01T10:00:00Z".to_string(),
                room_id: room_id.to_string(),
            })
        }

        async fn join_room(&self, room_id: &str, identity: &AgentIdentity) -> Result<Room> {
            self.tick("join_room")?;
            let mut room = Room::new(room_id, room_id, "");
            room.participants.push(identity.clone());
            Ok(room)
        }
    }

    fn manager(gateway: StubGateway) -> (Arc<StubGateway>, ConnectionManager) {
        let gateway = Arc::new(gateway);
        let manager = ConnectionManager::new(
            gateway.clone(),
            AgentIdentity::new("agent-1", "gpt-4o"),
            "secret",
        )
        .with_retry(RetryPolicy::new(3, Duration::from_secs(1)))
        .with_reconnect(ReconnectPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        });
        (gateway, manager)
    }

    #[tokio::test]
    async fn test_watch_room_unknown_is_room_not_found() {
        let (_, manager) = manager(StubGateway::new(vec![Room::new("general", "General", "")]));
        let err = manager.watch_room("missing").await.unwrap_err();
        assert!(matches!(err, EchoError::RoomNotFound(id) if id == "missing"));
        assert!(manager.watched_room().is_none());
    }

    #[tokio::test]
    async fn test_start_watches_default_room() {
        let (gateway, manager) =
            manager(StubGateway::new(vec![Room::new("general", "General", "testing")]));
        let manager = manager.with_default_room(Some("general".to_string()));

        manager.start().await.unwrap();

        assert_eq!(manager.watched_room().as_deref(), Some("general"));
        // One listing serves both the connectivity check and the validation.
        assert_eq!(gateway.calls(), vec!["list_rooms"]);
    }

    #[tokio::test]
    async fn test_start_with_missing_default_room_fails() {
        let (_, manager) = manager(StubGateway::new(Vec::new()));
        let manager = manager.with_default_room(Some("general".to_string()));
        assert!(matches!(
            manager.start().await,
            Err(EchoError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_room_joins_when_configured() {
        let (gateway, manager) = manager(StubGateway::new(vec![Room::new("general", "G", "")]));
        let manager = manager.with_join_watched_room(true);

        let room = manager.watch_room("general").await.unwrap();

        assert!(room.has_participant("agent-1"));
        assert_eq!(gateway.calls(), vec!["list_rooms", "join_room"]);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (_, manager) = manager(StubGateway::new(vec![Room::new("general", "G", "")]));
        manager.watch_room("general").await.unwrap();
        manager.stop();
        manager.stop();
        assert!(manager.watched_room().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_rooms_retries_transient_failures() {
        let (gateway, manager) =
            manager(StubGateway::failing(vec![Room::new("general", "G", "")], 2));
        let start = Instant::now();

        let rooms = manager.list_rooms(&[]).await.unwrap();

        assert_eq!(rooms.len(), 1);
        assert_eq!(gateway.calls().len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_message_uses_agent_identity() {
        let (_, manager) = manager(StubGateway::new(Vec::new()));
        let message = manager.send_message("general", "hello").await.unwrap();
        assert_eq!(message.sender.username, "agent-1");
        assert_eq!(message.room_id, "general");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnection_exhausted_after_ceiling() {
        let (_, manager) = manager(StubGateway::new(vec![Room::new("general", "G", "")]));
        manager.watch_room("general").await.unwrap();
        let start = Instant::now();

        for _ in 0..5 {
            manager.handle_reconnection().await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::from_secs(10));

        let err = manager.handle_reconnection().await.unwrap_err();
        assert!(matches!(err, EchoError::ReconnectExhausted { attempts: 6 }));
        assert!(manager.watched_room().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_reconnect_attempts() {
        let (_, manager) = manager(StubGateway::new(Vec::new()));
        manager.handle_reconnection().await.unwrap();
        manager.handle_reconnection().await.unwrap();
        assert_eq!(manager.reconnect_attempts(), 2);

        manager.reset_reconnect_attempts();
        assert_eq!(manager.reconnect_attempts(), 0);
    }
}
