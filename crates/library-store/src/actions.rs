//! Store actions
//!
//! Every state transition is one variant of [`Action`]. The JSON form is
//! `{"type": "BOOKS_LOADED", "payload": ...}`, which is what
//! [`Action::from_json`] accepts from untyped callers.

use chrono::{DateTime, Utc};
use library_client::{Book, Collection, EntityPatch, Loan, StatsUpdate, User};
use library_config::Theme;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{IntoStaticStr, VariantNames};
use thiserror::Error;

use crate::notification::{Notification, NotificationDraft, NotificationLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr, VariantNames)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    // Loading
    SetLoading(bool),
    SetError(Option<String>),
    ClearError,

    // Bulk loads; each accepts a bare array or a `{items: [...]}` envelope
    BooksLoaded(Collection<Book>),
    UsersLoaded(Collection<User>),
    LoansLoaded(Collection<Loan>),
    /// Merged into the current stats
    StatsLoaded(StatsUpdate),

    // Mutations
    BookAdded(Book),
    BookUpdated(EntityPatch),
    /// Book id
    BookDeleted(String),
    LoanCreated(Loan),
    LoanReturned(EntityPatch),

    // UI
    SetTheme(Theme),
    SetSearchQuery(String),
    SetPage(usize),
    SetPageSize(usize),
    SetSort(String),
    SetFilter(String),

    // App
    SetUnsavedChanges(bool),
    SetOnlineStatus(bool),
    AddNotification(Notification),
    /// Notification id
    RemoveNotification(u64),
}

/// Why an untyped action was rejected
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action must be a JSON object")]
    NotAnObject,

    #[error("action has no type")]
    MissingType,

    #[error("unknown action type: {0}")]
    UnknownType(String),

    #[error("invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Action {
    /// The `SCREAMING_SNAKE` type name
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Whether `kind` names an action
    pub fn is_known_kind(kind: &str) -> bool {
        Self::VARIANTS.contains(&kind)
    }

    /// Parse the JSON form of an action
    ///
    /// `ADD_NOTIFICATION` payloads are caller fields only; the id and
    /// timestamp are stamped here with `now`.
    pub fn from_json(value: Value, now: DateTime<Utc>) -> Result<Action, ActionError> {
        let Value::Object(mut object) = value else {
            return Err(ActionError::NotAnObject);
        };

        let kind = match object.get("type") {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            _ => return Err(ActionError::MissingType),
        };

        if !Self::is_known_kind(&kind) {
            return Err(ActionError::UnknownType(kind));
        }

        let invalid = |source: serde_json::Error| ActionError::InvalidPayload {
            kind: kind.clone(),
            source,
        };

        if kind == "ADD_NOTIFICATION" {
            let payload = object.remove("payload").unwrap_or(Value::Null);
            let draft: NotificationDraft = match payload {
                Value::Null => NotificationDraft::default(),
                other => serde_json::from_value(other).map_err(invalid)?,
            };
            return Ok(Action::AddNotification(draft.stamp(now)));
        }

        serde_json::from_value(Value::Object(object)).map_err(invalid)
    }

    /// Notification action stamped with the current time
    pub fn notify(level: NotificationLevel, message: impl Into<String>) -> Action {
        Action::AddNotification(Notification::new(level, message))
    }

    pub fn notify_draft(draft: NotificationDraft, at: DateTime<Utc>) -> Action {
        Action::AddNotification(draft.stamp(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn parse(value: Value) -> Result<Action, ActionError> {
        Action::from_json(value, Utc::now())
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Action::SetLoading(true).kind(), "SET_LOADING");
        assert_eq!(Action::ClearError.kind(), "CLEAR_ERROR");
        assert_eq!(Action::SetOnlineStatus(false).kind(), "SET_ONLINE_STATUS");
        assert_eq!(Action::RemoveNotification(1).kind(), "REMOVE_NOTIFICATION");
        assert!(Action::is_known_kind("BOOKS_LOADED"));
        assert!(!Action::is_known_kind("BOOKS_LOADING"));
    }

    #[test]
    fn test_parse_json_actions() {
        assert_eq!(
            parse(json!({"type": "SET_PAGE", "payload": 3})).unwrap(),
            Action::SetPage(3)
        );
        assert_eq!(
            parse(json!({"type": "SET_THEME", "payload": "dark"})).unwrap(),
            Action::SetTheme(Theme::Dark)
        );
        assert_eq!(
            parse(json!({"type": "SET_ERROR", "payload": null})).unwrap(),
            Action::SetError(None)
        );
        assert_eq!(
            parse(json!({"type": "CLEAR_ERROR"})).unwrap(),
            Action::ClearError
        );
        assert_eq!(
            parse(json!({"type": "BOOK_DELETED", "payload": "b1"})).unwrap(),
            Action::BookDeleted("b1".to_string())
        );
    }

    #[test]
    fn test_books_loaded_accepts_both_shapes() {
        let bare = parse(json!({
            "type": "BOOKS_LOADED",
            "payload": [{"id": "b1", "title": "T"}]
        }))
        .unwrap();
        let envelope = parse(json!({
            "type": "BOOKS_LOADED",
            "payload": {"items": [{"id": "b1", "title": "T"}], "total": 1}
        }))
        .unwrap();

        let (Action::BooksLoaded(bare), Action::BooksLoaded(envelope)) = (bare, envelope) else {
            panic!("expected BOOKS_LOADED");
        };
        assert_eq!(bare.items(), envelope.items());
        assert_eq!(bare.items()[0].title, "T");
    }

    #[test]
    fn test_rejects_malformed_actions() {
        assert!(matches!(parse(json!("SET_PAGE")), Err(ActionError::NotAnObject)));
        assert!(matches!(
            parse(json!({"payload": 1})),
            Err(ActionError::MissingType)
        ));
        assert!(matches!(
            parse(json!({"type": "", "payload": 1})),
            Err(ActionError::MissingType)
        ));
        assert!(matches!(
            parse(json!({"type": "DO_SOMETHING"})),
            Err(ActionError::UnknownType(kind)) if kind == "DO_SOMETHING"
        ));
        assert!(matches!(
            parse(json!({"type": "SET_PAGE", "payload": "three"})),
            Err(ActionError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_notification_payload_is_stamped() {
        let now = Utc::now();
        let action = Action::from_json(
            json!({
                "type": "ADD_NOTIFICATION",
                "payload": {"type": "success", "message": "Libro aggiunto"}
            }),
            now,
        )
        .unwrap();

        let Action::AddNotification(notification) = action else {
            panic!("expected ADD_NOTIFICATION");
        };
        assert_eq!(notification.level, NotificationLevel::Success);
        assert_eq!(notification.message, "Libro aggiunto");
        assert_eq!(notification.timestamp, now);
    }

    #[test]
    fn test_serializes_to_tagged_form() {
        let value = serde_json::to_value(Action::SetSearchQuery("tolkien".to_string())).unwrap();
        assert_eq!(value, json!({"type": "SET_SEARCH_QUERY", "payload": "tolkien"}));
    }
}
