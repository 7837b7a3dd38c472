// Chat domain types and wire normalization
//
// The backend is inconsistent about field spellings: history rows may carry
// `session_id` or `sessionId`, messages may carry `content` or `message`,
// timestamps arrive as `timestamp` or `created_at`, ids arrive as numbers or
// strings. All of that is flattened here, once, into canonical shapes; the
// orchestrator and UI only ever see the canonical form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub mod history;
pub mod orchestrator;
pub mod toast;

pub use history::{dedup_history, Debouncer, HistoryPager};
pub use orchestrator::{ChatApi, ChatOrchestrator};
pub use toast::{Toast, ToastKind, ToastQueue};

// ─────────────────────────────────────────────────────────────────────────────
// Core Types
// ─────────────────────────────────────────────────────────────────────────────

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

/// Delivery state of a message in the transcript.
///
/// Optimistic user messages start Pending under a client-generated id;
/// the server response confirms or fails them by id, never by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Confirmed,
    Failed,
}

/// Metadata for a previously uploaded file attached to a message.
/// The client never interprets the bytes, only displays the metadata.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AttachedFile {
    pub original_name: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub mime_type: String,
    pub url: String,
}

/// A message in the active session's transcript
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub is_favorite: bool,
    pub attachments: Vec<AttachedFile>,
    pub delivery: Delivery,
}

impl Message {
    /// Optimistic user message, visible before the network completes
    pub fn pending_user(id: String, content: &str) -> Self {
        Self {
            id,
            content: content.to_string(),
            role: Role::User,
            created_at: Utc::now(),
            is_favorite: false,
            attachments: Vec::new(),
            delivery: Delivery::Pending,
        }
    }

    /// Bot message with known content (error replies and the like)
    pub fn bot(id: String, content: String) -> Self {
        Self {
            id,
            content,
            role: Role::Bot,
            created_at: Utc::now(),
            is_favorite: false,
            attachments: Vec::new(),
            delivery: Delivery::Confirmed,
        }
    }

    /// Build a confirmed message from a wire object, applying the
    /// canonical field fallbacks
    pub fn from_wire(wire: &Value, index: usize) -> Self {
        let id = wire_string(wire, &["id"]).unwrap_or_else(|| format!("msg-{}", index));
        let content = wire_string(wire, &["content", "message"]).unwrap_or_default();
        let role = match wire.get("type").and_then(Value::as_str) {
            Some("user") => Role::User,
            _ => Role::Bot,
        };
        let created_at = wire_timestamp(wire, &["timestamp", "created_at", "createdAt"]);
        let is_favorite = wire
            .get("isFavorite")
            .or_else(|| wire.get("is_favorite"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let attachments = wire_attachments(wire);

        Self {
            id,
            content,
            role,
            created_at,
            is_favorite,
            attachments,
            delivery: Delivery::Confirmed,
        }
    }
}

/// Sidebar summary of one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatHistoryItem {
    pub session_id: String,
    pub first_message: String,
    pub created_at: DateTime<Utc>,
    pub message_count: u64,
}

impl ChatHistoryItem {
    /// Normalize one history row; rows without any session id are dropped
    pub fn from_wire(wire: &Value) -> Option<Self> {
        let session_id = wire_string(wire, &["session_id", "sessionId"])?;
        Some(Self {
            session_id,
            first_message: wire_string(wire, &["first_message", "firstMessage"])
                .unwrap_or_else(|| "New conversation".to_string()),
            created_at: wire_timestamp(wire, &["created_at", "createdAt"]),
            message_count: wire
                .get("message_count")
                .or_else(|| wire.get("messageCount"))
                .and_then(Value::as_u64)
                .unwrap_or(0),
        })
    }
}

/// A favorited message, as the read-mostly projection the backend serves
#[derive(Debug, Clone)]
pub struct FavoriteMessage {
    pub id: String,
    pub content: String,
    pub original_message: String,
    pub created_at: DateTime<Utc>,
}

impl FavoriteMessage {
    pub fn from_wire(wire: &Value) -> Option<Self> {
        let id = wire_string(wire, &["id"])?;
        Some(Self {
            id,
            content: wire_string(wire, &["content"]).unwrap_or_default(),
            original_message: wire_string(wire, &["originalMessage", "original_message"])
                .unwrap_or_default(),
            created_at: wire_timestamp(wire, &["created_at", "createdAt"]),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire helpers
// ─────────────────────────────────────────────────────────────────────────────

/// First present key as a string; numbers are stringified (the backend
/// serves numeric ids from some endpoints and string ids from others)
pub fn wire_string(wire: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match wire.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First present key parsed as a timestamp, falling back to now.
/// Accepts RFC 3339 and the backend's `YYYY-MM-DD HH:MM:SS` form.
pub fn wire_timestamp(wire: &Value, keys: &[&str]) -> DateTime<Utc> {
    for key in keys {
        if let Some(raw) = wire.get(key).and_then(Value::as_str) {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                return dt.with_timezone(&Utc);
            }
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
                return naive.and_utc();
            }
        }
    }
    Utc::now()
}

/// Attachment list under `files`, if present and well-formed
fn wire_attachments(wire: &Value) -> Vec<AttachedFile> {
    wire.get("files")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// The session payload is either a bare array of messages or `{messages: [...]}`
pub fn session_messages(data: &Value) -> Vec<Message> {
    let list = match data {
        Value::Array(items) => items.as_slice(),
        _ => data
            .get("messages")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
    };
    list.iter()
        .enumerate()
        .map(|(i, wire)| Message::from_wire(wire, i))
        .collect()
}

/// Normalize a history payload (array of rows) into sidebar items
pub fn history_from_wire(data: &Value) -> Vec<ChatHistoryItem> {
    data.as_array()
        .map(|rows| rows.iter().filter_map(ChatHistoryItem::from_wire).collect())
        .unwrap_or_default()
}

/// Normalize a favorites payload into the projection
pub fn favorites_from_wire(data: &Value) -> Vec<FavoriteMessage> {
    data.as_array()
        .map(|rows| rows.iter().filter_map(FavoriteMessage::from_wire).collect())
        .unwrap_or_default()
}

/// serde helper: accept a string or a number, yielding a String
pub fn flex_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Generate a client-side id: millis timestamp plus a process-unique counter
/// so two ids minted in the same millisecond never collide
pub fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let count = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", Utc::now().timestamp_millis(), count)
}
