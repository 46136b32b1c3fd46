//! Configuration validation with unknown field detection.

use serde_json::Value;
use std::collections::HashSet;

/// Known top-level config field names.
const KNOWN_TOP_LEVEL: &[&str] = &[
    "gateway",
    "agent",
    "interaction",
    "retry",
    "generator",
    "logging",
];

const KNOWN_GATEWAY: &[&str] = &["api_url", "api_key", "request_timeout_secs"];

const KNOWN_AGENT: &[&str] = &[
    "name",
    "bio",
    "username",
    "model",
    "default_room",
    "join_watched_room",
];

const KNOWN_INTERACTION: &[&str] = &[
    "poll_interval_secs",
    "max_thread_length",
    "min_response_interval_secs",
    "processed_memory_capacity",
];

const KNOWN_RETRY: &[&str] = &[
    "max_attempts",
    "base_delay_ms",
    "max_reconnect_attempts",
    "reconnect_delay_ms",
];

const KNOWN_GENERATOR: &[&str] = &[
    "api_base",
    "api_key",
    "model",
    "max_tokens",
    "temperature",
    "timeout_secs",
];

const KNOWN_LOGGING: &[&str] = &["format", "level", "file"];

/// A validation diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

#[derive(Debug, PartialEq)]
pub enum DiagnosticLevel {
    Ok,
    Warn,
    Error,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.level {
            DiagnosticLevel::Ok => "[OK]",
            DiagnosticLevel::Warn => "[WARN]",
            DiagnosticLevel::Error => "[ERROR]",
        };
        if self.path.is_empty() {
            write!(f, "{} {}", prefix, self.message)
        } else {
            write!(f, "{} {}: {}", prefix, self.path, self.message)
        }
    }
}

/// Simple Levenshtein distance for "did you mean?" suggestions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, val) in matrix[0].iter_mut().enumerate() {
        *val = j;
    }

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            matrix[i + 1][j + 1] = std::cmp::min(
                std::cmp::min(matrix[i][j + 1] + 1, matrix[i + 1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }
    matrix[a.len()][b.len()]
}

/// Suggest the closest known field name (if distance <= 3).
pub fn suggest_field(unknown: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(k, _)| format!("did you mean '{}'?", k))
}

fn section_fields(section: &str) -> Option<&'static [&'static str]> {
    match section {
        "gateway" => Some(KNOWN_GATEWAY),
        "agent" => Some(KNOWN_AGENT),
        "interaction" => Some(KNOWN_INTERACTION),
        "retry" => Some(KNOWN_RETRY),
        "generator" => Some(KNOWN_GENERATOR),
        "logging" => Some(KNOWN_LOGGING),
        _ => None,
    }
}

fn unknown_field(path: String, key: &str, known: &[&str]) -> Diagnostic {
    let message = match suggest_field(key, known) {
        Some(suggestion) => format!("Unknown field '{}' ({})", key, suggestion),
        None => format!("Unknown field '{}'", key),
    };
    Diagnostic {
        level: DiagnosticLevel::Error,
        path,
        message,
    }
}

/// Validate a raw JSON config value against known field names.
pub fn validate_config(raw: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match raw.as_object() {
        Some(o) => o,
        None => {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Error,
                path: String::new(),
                message: "Config must be a JSON object".to_string(),
            });
            return diagnostics;
        }
    };

    diagnostics.push(Diagnostic {
        level: DiagnosticLevel::Ok,
        path: String::new(),
        message: "Valid JSON".to_string(),
    });

    let known_top: HashSet<&str> = KNOWN_TOP_LEVEL.iter().copied().collect();
    let mut has_unknown = false;
    for (key, value) in obj {
        if !known_top.contains(key.as_str()) {
            has_unknown = true;
            diagnostics.push(unknown_field(key.clone(), key, KNOWN_TOP_LEVEL));
            continue;
        }

        let (Some(fields), Some(section)) = (section_fields(key), value.as_object()) else {
            continue;
        };
        for field in section.keys() {
            if !fields.contains(&field.as_str()) {
                has_unknown = true;
                diagnostics.push(unknown_field(format!("{}.{}", key, field), field, fields));
            }
        }
    }

    if !has_unknown {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Ok,
            path: String::new(),
            message: "All fields recognized".to_string(),
        });
    }

    // Secrets in the file are readable by anyone who can read the file.
    for (section, env_name) in [
        ("gateway", "ECHOCHAMBERS_API_KEY"),
        ("generator", "ECHOCLAW_GENERATOR_API_KEY"),
    ] {
        let has_key = obj
            .get(section)
            .and_then(|v| v.get("api_key"))
            .and_then(|v| v.as_str())
            .is_some_and(|v| !v.is_empty());
        if has_key {
            diagnostics.push(Diagnostic {
                level: DiagnosticLevel::Warn,
                path: format!("{}.api_key", section),
                message: format!("Stored in plain text; consider setting {} instead", env_name),
            });
        }
    }

    // Zero would spin the poll loop.
    let poll = obj
        .get("interaction")
        .and_then(|v| v.get("poll_interval_secs"))
        .and_then(|v| v.as_u64());
    if poll == Some(0) {
        diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            path: "interaction.poll_interval_secs".to_string(),
            message: "Must be a positive number of seconds".to_string(),
        });
    }

    diagnostics
}
