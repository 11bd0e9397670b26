//! Display helpers for node cards and tables.

use chrono::{DateTime, Local};
use swarm_types::HttpEndpoint;

use crate::topology::VisualNode;

/// Placeholder for missing values.
pub const NONE_MARK: &str = "—";

/// Relative age of an epoch-ms timestamp: "just now", "12s ago", "3m ago", "2h ago".
///
/// A zero timestamp means "never seen".
pub fn time_ago(ms: i64, now_ms: i64) -> String {
    if ms == 0 {
        return NONE_MARK.to_string();
    }
    let secs = now_ms.saturating_sub(ms).max(0) / 1000;
    if secs < 5 {
        return "just now".to_string();
    }
    if secs < 60 {
        return format!("{}s ago", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    format!("{}h ago", mins / 60)
}

/// Shorten long hex keys to `abcdef…wxyz`. Short keys are returned as-is.
pub fn short_key(key: &str) -> String {
    if key.is_empty() {
        return NONE_MARK.to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 14 {
        return key.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

pub fn http_label(http: Option<&HttpEndpoint>) -> String {
    match http {
        Some(ep) if !ep.host.is_empty() => format!("{}:{}", ep.host, ep.port),
        _ => NONE_MARK.to_string(),
    }
}

/// Absolute local time for an epoch-ms timestamp.
pub fn timestamp(ms: i64) -> String {
    if ms == 0 {
        return NONE_MARK.to_string();
    }
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => utc
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => NONE_MARK.to_string(),
    }
}

/// Label/value rows for a node's detail panel.
pub fn detail_rows(node: &VisualNode, now_ms: i64) -> Vec<(&'static str, String)> {
    let attrs = &node.attributes;

    let last_seen = if attrs.last_seen_at_ms == 0 {
        NONE_MARK.to_string()
    } else {
        format!(
            "{} ({})",
            timestamp(attrs.last_seen_at_ms),
            time_ago(attrs.last_seen_at_ms, now_ms)
        )
    };

    let mut status = if attrs.online { "online" } else { "offline" }.to_string();
    if node.is_center {
        status.push_str(", center");
    }

    vec![
        ("Name", or_none(&attrs.name)),
        ("Node id", node.id.clone()),
        ("Key", short_key(&node.id)),
        ("Region", or_none(&attrs.region)),
        ("HTTP", http_label(attrs.http.as_ref())),
        (
            "Location",
            attrs
                .geo
                .map(|g| format!("{:.4}, {:.4}", g.lat, g.lon))
                .unwrap_or_else(|| NONE_MARK.to_string()),
        ),
        ("Last seen", last_seen),
        ("Status", status),
    ]
}

fn or_none(value: &str) -> String {
    if value.is_empty() {
        NONE_MARK.to_string()
    } else {
        value.to_string()
    }
}
