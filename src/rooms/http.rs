//! REST implementation of [`RoomGateway`] backed by reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{EchoError, GatewayError, Result};
use crate::log_component;

use super::types::{
    HistoryEnvelope, JoinRoomBody, MessageEnvelope, RoomEnvelope, RoomsEnvelope, SendMessageBody,
};
use super::{AgentIdentity, Message, Room, RoomGateway};

/// Header carrying the gateway API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Talks to an EchoChambers deployment at `{api_url}/api/rooms`.
#[derive(Debug, Clone)]
pub struct HttpRoomGateway {
    rooms_url: Url,
    client: Client,
}

impl HttpRoomGateway {
    /// Create a gateway client for `api_url` with a per-request timeout.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EchoError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Self::with_client(api_url, client)
    }

    /// Create a gateway client reusing an existing reqwest client.
    pub fn with_client(api_url: &str, client: Client) -> Result<Self> {
        let raw = format!("{}/api/rooms", api_url.trim().trim_end_matches('/'));
        let rooms_url = Url::parse(&raw)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| EchoError::Config(format!("Invalid gateway URL: {}", api_url)))?;
        Ok(Self { rooms_url, client })
    }

    /// The rooms collection URL all requests are built from.
    pub fn rooms_url(&self) -> &str {
        self.rooms_url.as_str()
    }

    /// `{rooms_url}/{room_id}/{action}` with the room id percent-encoded as
    /// a single path segment.
    fn room_url(&self, room_id: &str, action: &str) -> Url {
        let mut url = self.rooms_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(room_id).push(action);
        }
        url
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(GatewayError::from_reqwest)?;

        if !status.is_success() {
            return Err(GatewayError::status(status.as_u16(), &body).into());
        }

        serde_json::from_str(&body)
            .map_err(|e| GatewayError::Decode(format!("{}: {}", what, e)).into())
    }
}

#[async_trait]
impl RoomGateway for HttpRoomGateway {
    async fn list_rooms(&self, tags: &[String]) -> Result<Vec<Room>> {
        let mut request = self.client.get(self.rooms_url.clone());
        if !tags.is_empty() {
            request = request.query(&[("tags", tags.join(","))]);
        }

        let response = request.send().await.map_err(GatewayError::from_reqwest)?;
        let envelope: RoomsEnvelope = Self::decode(response, "list rooms").await?;
        log_component!(debug, "gateway", "Listed rooms", count = envelope.rooms.len());
        Ok(envelope.rooms)
    }

    async fn room_history(&self, room_id: &str) -> Result<Vec<Message>> {
        let response = self
            .client
            .get(self.room_url(room_id, "history"))
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;
        let envelope: HistoryEnvelope = Self::decode(response, "room history").await?;
        debug!(room_id, count = envelope.messages.len(), "Fetched room history");
        Ok(envelope.messages)
    }

    async fn post_message(
        &self,
        room_id: &str,
        content: &str,
        sender: &AgentIdentity,
        api_key: &str,
    ) -> Result<Message> {
        let response = self
            .client
            .post(self.room_url(room_id, "message"))
            .header(API_KEY_HEADER, api_key)
            .json(&SendMessageBody { content, sender })
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;
        let envelope: MessageEnvelope = Self::decode(response, "send message").await?;
        Ok(envelope.message)
    }

    async fn join_room(&self, room_id: &str, identity: &AgentIdentity) -> Result<Room> {
        let response = self
            .client
            .post(self.room_url(room_id, "join"))
            .json(&JoinRoomBody {
                model_info: identity,
            })
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;
        let envelope: RoomEnvelope = Self::decode(response, "join room").await?;
        Ok(envelope.room)
    }
}
