//! Response-shape helpers: slash-path lookups over JSON and normalization of
//! provider status vocabularies.
//!
//! Paths look like `/data/output/works/*/video/url`. A `*` segment selects the
//! first element of an array or the first value of an object. Rules are tried
//! in order and the first non-empty string wins.

use serde_json::Value;

use crate::types::ProviderState;

/// Native status words and the canonical state they map to.
const STATE_WORDS: &[(ProviderState, &[&str])] = &[
    (
        ProviderState::Succeeded,
        &[
            "succeed",
            "succeeded",
            "success",
            "completed",
            "complete",
            "done",
            "finished",
        ],
    ),
    (
        ProviderState::Failed,
        &[
            "failed",
            "failure",
            "fail",
            "error",
            "cancelled",
            "canceled",
            "rejected",
        ],
    ),
    (
        ProviderState::Pending,
        &["pending", "queued", "submitted", "staged", "waiting", "planned"],
    ),
    (
        ProviderState::Processing,
        &[
            "processing",
            "running",
            "in_progress",
            "rendering",
            "transcribing",
            "generating",
            "started",
        ],
    ),
];

pub fn normalize_state(raw: &str) -> ProviderState {
    let lowered = raw.trim().to_lowercase().replace(['-', ' '], "_");
    STATE_WORDS
        .iter()
        .find(|(_, words)| words.contains(&lowered.as_str()))
        .map(|(state, _)| *state)
        .unwrap_or(ProviderState::Unknown)
}

/// Resolves one slash path against `value`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match (segment, current) {
            ("*", Value::Array(items)) => items.first(),
            ("*", Value::Object(map)) => map.values().next(),
            (key, Value::Object(map)) => map.get(key),
            (index, Value::Array(items)) => index.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// First rule that resolves to a non-empty string.
pub fn first_string(value: &Value, rules: &[&str]) -> Option<String> {
    rules.iter().find_map(|rule| {
        lookup(value, rule)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Progress as reported by the provider: a number (0-100, or 0-1 as a
/// fraction) or a string such as `"45%"`.
pub fn first_progress(value: &Value, rules: &[&str]) -> Option<u8> {
    rules.iter().find_map(|rule| {
        let raw = match lookup(value, rule)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
            _ => return None,
        };
        let percent = if raw > 0.0 && raw < 1.0 { raw * 100.0 } else { raw };
        Some(percent.clamp(0.0, 100.0).round() as u8)
    })
}
