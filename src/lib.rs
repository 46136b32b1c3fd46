//! EchoClaw - autonomous agent client for EchoChambers chat rooms
//!
//! An agent watches one room (or every room) on a room gateway, picks
//! messages that mention it or the room topic, asks a response generator
//! whether and how to reply, and posts the reply back.

pub mod config;
pub mod connection;
pub mod error;
pub mod generator;
pub mod interaction;
pub mod rooms;
pub mod utils;

pub use config::Config;
pub use connection::{ConnectionManager, ReconnectPolicy, RetryPolicy};
pub use error::{EchoError, GatewayError, Result};
pub use generator::{GeneratedResponse, Persona, ResponseContext, ResponseGenerator, Verdict};
pub use interaction::{CycleReport, EngineState, InteractionScheduler, RoomOutcome};
pub use rooms::{AgentIdentity, HttpRoomGateway, Message, Room, RoomGateway};
