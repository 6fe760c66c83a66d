//! Transient user notifications (toasts)
//!
//! A notification is stamped with its id and timestamp when it is created,
//! so the reducer that appends it stays pure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_NOTIFICATION_ID: AtomicU64 = AtomicU64::new(0);

/// Millisecond timestamp of `at`, bumped past the last id handed out
fn next_id(at: DateTime<Utc>) -> u64 {
    let candidate = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    let mut last = LAST_NOTIFICATION_ID.load(Ordering::Relaxed);
    loop {
        let id = candidate.max(last + 1);
        match LAST_NOTIFICATION_ID.compare_exchange_weak(
            last,
            id,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => return id,
            Err(current) => last = current,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Caller-supplied notification fields, before stamping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationDraft {
    #[serde(default, rename = "type", alias = "level")]
    pub level: NotificationLevel,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NotificationDraft {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Assign an id and timestamp
    pub fn stamp(self, at: DateTime<Utc>) -> Notification {
        Notification {
            id: next_id(at),
            timestamp: at,
            level: self.level,
            message: self.message,
            title: self.title,
            extra: self.extra,
        }
    }
}

/// A notification as held in state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Creation time in milliseconds, strictly increasing within the process
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub level: NotificationLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notification {
    /// Create a notification stamped with the current time
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        NotificationDraft::new(level, message).stamp(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_ids_strictly_increase_for_same_instant() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let a = NotificationDraft::new(NotificationLevel::Info, "a").stamp(at);
        let b = NotificationDraft::new(NotificationLevel::Info, "b").stamp(at);

        assert!(a.id >= 1_700_000_000_000);
        assert!(b.id > a.id);
        assert_eq!(a.timestamp, b.timestamp);
    }

    #[test]
    fn test_draft_accepts_type_and_extra_fields() {
        let draft: NotificationDraft = serde_json::from_value(json!({
            "type": "warning",
            "message": "Connessione persa",
            "duration": 5000
        }))
        .unwrap();

        assert_eq!(draft.level, NotificationLevel::Warning);
        assert_eq!(draft.extra.get("duration"), Some(&json!(5000)));

        let stamped = draft.stamp(Utc::now());
        let wire = serde_json::to_value(&stamped).unwrap();
        assert_eq!(wire["type"], "warning");
        assert_eq!(wire["duration"], 5000);
    }
}
