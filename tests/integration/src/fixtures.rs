//! Canned payloads shared across tests

use serde_json::{json, Value};

/// A minimal message-create payload
#[must_use]
pub fn message_create(content: &str) -> Value {
    json!({
        "id": "175928847299117063",
        "channel_id": "81384788765712384",
        "content": content,
        "author": { "id": "80351110224678912", "username": "tester" }
    })
}

/// A guild-create payload with one channel
#[must_use]
pub fn guild_create() -> Value {
    json!({
        "id": "41771983423143937",
        "name": "test guild",
        "channels": [
            { "id": "81384788765712384", "type": 0, "name": "general" }
        ]
    })
}

/// Rate-limit headers declaring an exhausted bucket
#[must_use]
pub fn exhausted_bucket_headers(reset_after_s: f64) -> Vec<(String, String)> {
    vec![
        ("x-ratelimit-limit".to_string(), "5".to_string()),
        ("x-ratelimit-remaining".to_string(), "0".to_string()),
        (
            "x-ratelimit-reset-after".to_string(),
            reset_after_s.to_string(),
        ),
    ]
}
