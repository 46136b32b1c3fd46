//! Configuration type definitions for EchoClaw
//!
//! This module defines all configuration structs used by the engine.
//! All types implement serde traits for JSON serialization and have sensible defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration struct for EchoClaw
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Room gateway endpoint and credentials
    pub gateway: GatewayConfig,
    /// Agent identity and room selection
    pub agent: AgentConfig,
    /// Poll loop, thread and rate-limit settings
    pub interaction: InteractionConfig,
    /// Per-call retry and cycle-level reconnection settings
    pub retry: RetryConfig,
    /// Chat-completions endpoint used to decide and write replies
    pub generator: GeneratorConfig,
    /// Log output settings
    pub logging: LoggingConfig,
}

// ============================================================================
// Gateway Configuration
// ============================================================================

/// Room gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the EchoChambers deployment (without `/api/rooms`).
    pub api_url: String,
    /// API key sent as `x-api-key` when posting messages.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: None,
            request_timeout_secs: 30,
        }
    }
}

// ============================================================================
// Agent Configuration
// ============================================================================

/// Agent identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Persona name used in prompts and to derive the default username.
    pub name: String,
    /// Short persona description injected into prompts.
    pub bio: String,
    /// Username override (default: `agent-{name}`).
    pub username: Option<String>,
    /// Model label override (default: the generator model).
    pub model: Option<String>,
    /// Room to watch exclusively; all rooms are polled when unset.
    pub default_room: Option<String>,
    /// Join the watched room as a participant after validating it.
    pub join_watched_room: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "echoclaw".to_string(),
            bio: "A thoughtful participant in topic-focused group conversations.".to_string(),
            username: None,
            model: None,
            default_room: None,
            join_watched_room: false,
        }
    }
}

// ============================================================================
// Interaction Configuration
// ============================================================================

/// Default seconds between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Default cap on conversation thread length.
pub const DEFAULT_MAX_THREAD_LENGTH: usize = 10;
/// Minimum seconds between two replies from this agent in one room.
pub const MIN_RESPONSE_INTERVAL_SECS: u64 = 30;

/// Poll loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Seconds to sleep between poll cycles (must be positive).
    pub poll_interval_secs: u64,
    /// Maximum number of messages in a conversation thread.
    pub max_thread_length: usize,
    /// Minimum seconds between replies in the same room.
    pub min_response_interval_secs: u64,
    /// Number of processed message ids remembered for deduplication.
    pub processed_memory_capacity: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_thread_length: DEFAULT_MAX_THREAD_LENGTH,
            min_response_interval_secs: MIN_RESPONSE_INTERVAL_SECS,
            processed_memory_capacity: 10_000,
        }
    }
}

impl InteractionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn min_response_interval(&self) -> Duration {
        Duration::from_secs(self.min_response_interval_secs)
    }
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Retry and reconnection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per gateway call, including the first one.
    pub max_attempts: u32,
    /// Base delay in milliseconds; doubles after every failed attempt.
    pub base_delay_ms: u64,
    /// Consecutive failed poll cycles tolerated before the engine stops.
    pub max_reconnect_attempts: u32,
    /// Fixed pause in milliseconds after a failed poll cycle.
    pub reconnect_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 5_000,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 5_000,
        }
    }
}

// ============================================================================
// Generator Configuration
// ============================================================================

/// OpenAI-compatible chat-completions configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// API base URL (e.g. `https://api.openai.com/v1`).
    pub api_base: String,
    /// Bearer token for the completions endpoint.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens for a generated reply.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 512,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable tracing output
    Pretty,
    /// Compact `timestamp LEVEL target message {fields}` lines
    #[default]
    Component,
    /// JSON lines for log aggregators
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "component" => Ok(LogFormat::Component),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Default filter level when `RUST_LOG` is unset.
    pub level: String,
    /// Optional file to append log lines to instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "info".to_string(),
            file: None,
        }
    }
}
