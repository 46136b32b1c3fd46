//! Generator module - verdicts and replies from a language model
//!
//! The scheduler asks a [`ResponseGenerator`] two questions about a selected
//! message: whether to answer at all ([`Verdict`]) and, if so, what to say
//! ([`GeneratedResponse`]). [`ChatCompletionGenerator`] answers both through
//! an OpenAI-compatible chat completions endpoint.

pub mod openai;
pub mod templates;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rooms::{AgentIdentity, Message, Room};

pub use openai::ChatCompletionGenerator;

/// Outcome of the should-respond step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Respond,
    Ignore,
    Stop,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Respond => write!(f, "RESPOND"),
            Verdict::Ignore => write!(f, "IGNORE"),
            Verdict::Stop => write!(f, "STOP"),
        }
    }
}

/// A reply produced by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// Name and bio the agent speaks as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub bio: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bio: bio.into(),
        }
    }
}

/// Everything a generator sees about the message under consideration.
#[derive(Debug, Clone, Copy)]
pub struct ResponseContext<'a> {
    pub agent: &'a AgentIdentity,
    pub persona: &'a Persona,
    pub room: &'a Room,
    pub message: &'a Message,
    /// Chronological, `message` last.
    pub thread: &'a [Message],
}

impl ResponseContext<'_> {
    /// One `username: content` line per thread message.
    pub fn formatted_thread(&self) -> String {
        self.thread
            .iter()
            .map(|m| format!("{}: {}", m.sender.username, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn should_respond_prompt(&self) -> String {
        templates::should_respond_prompt(self)
    }

    pub fn message_prompt(&self) -> String {
        templates::message_prompt(self)
    }
}

/// Produces verdicts and replies for selected messages.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Decide whether the agent should answer the context's message.
    async fn should_respond(&self, ctx: &ResponseContext<'_>) -> Result<Verdict>;

    /// Produce reply text, or `None` when the model had nothing to say.
    async fn generate_response(&self, ctx: &ResponseContext<'_>)
        -> Result<Option<GeneratedResponse>>;
}

/// Extract a verdict from free-form model output.
///
/// The earliest bracketed tag wins; failing that the earliest bare word.
/// Anything unrecognisable is treated as [`Verdict::Ignore`].
pub fn parse_verdict(output: &str) -> Verdict {
    let upper = output.to_uppercase();
    let options = [
        (Verdict::Respond, "RESPOND"),
        (Verdict::Ignore, "IGNORE"),
        (Verdict::Stop, "STOP"),
    ];

    let earliest = |bracketed: bool| {
        options
            .iter()
            .filter_map(|(verdict, word)| {
                let needle = if bracketed {
                    format!("[{}]", word)
                } else {
                    (*word).to_string()
                };
                upper.find(&needle).map(|pos| (pos, *verdict))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, verdict)| verdict)
    };

    earliest(true)
        .or_else(|| earliest(false))
        .unwrap_or(Verdict::Ignore)
}

/// Extract a reply from model output.
///
/// Accepts a JSON object `{ "text", "action"? }`, fenced or bare, and falls
/// back to the trimmed raw text. Returns `None` when there is no text.
pub fn parse_generated_response(output: &str) -> Option<GeneratedResponse> {
    let body = strip_code_fence(output.trim());

    let parsed = serde_json::from_str::<GeneratedResponse>(body).ok().or_else(|| {
        let start = body.find('{')?;
        let end = body.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<GeneratedResponse>(&body[start..=end]).ok()
    });

    let response = match parsed {
        Some(response) => response,
        None => GeneratedResponse {
            text: body.to_string(),
            action: None,
        },
    };

    let text = response.text.trim();
    if text.is_empty() {
        return None;
    }
    Some(GeneratedResponse {
        text: text.to_string(),
        action: response.action.filter(|a| !a.trim().is_empty()),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line, if any.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().trim_end_matches("```").trim()
}
