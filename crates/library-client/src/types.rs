//! Library API data transfer objects
//!
//! These types represent the JSON exchanged with the library backend.
//! Fields the backend sends that are not modelled here are kept in `extra`
//! so that merging a partial update never drops data.

use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything stored in a collection keyed by its string id
pub trait Entity: Clone + Serialize + DeserializeOwned {
    fn id(&self) -> &str;
}

/// A book in the catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub author: String,

    /// Genre identifier as sent by the backend (e.g. "FANTASY")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,

    /// Whether a copy is on the shelf
    #[serde(default)]
    pub available: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Book {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A registered library user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A loan of one book to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: String,

    #[serde(default)]
    pub book_id: String,

    #[serde(default)]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaned_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<String>,

    /// Empty string or absent while the loan is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Loan {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Loan {
    /// A loan is active until it has a non-empty return timestamp
    pub fn is_active(&self) -> bool {
        self.returned_at.as_deref().map_or(true, str::is_empty)
    }

    /// Due date, if present and parseable
    pub fn due_date(&self) -> Option<NaiveDateTime> {
        self.due_at.as_deref().and_then(parse_timestamp)
    }

    /// Active and past its due date
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.is_active() && self.due_date().is_some_and(|due| due < now)
    }
}

/// Parse the backend's timestamp formats
///
/// The backend emits ISO local date-times with or without seconds;
/// RFC 3339 strings are accepted and converted to their UTC wall time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_books: u64,
    pub available_books: u64,
    pub total_users: u64,
    pub active_loans: u64,
    pub overdue_loans: u64,
}

impl Stats {
    /// Overlay the fields present in `update`, keeping the rest
    pub fn merged(&self, update: &StatsUpdate) -> Stats {
        Stats {
            total_books: update.total_books.unwrap_or(self.total_books),
            available_books: update.available_books.unwrap_or(self.available_books),
            total_users: update.total_users.unwrap_or(self.total_users),
            active_loans: update.active_loans.unwrap_or(self.active_loans),
            overdue_loans: update.overdue_loans.unwrap_or(self.overdue_loans),
        }
    }
}

/// Partial dashboard counters; absent fields are left untouched on merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_books: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_books: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_users: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_loans: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue_loans: Option<u64>,
}

impl From<Stats> for StatsUpdate {
    fn from(stats: Stats) -> Self {
        Self {
            total_books: Some(stats.total_books),
            available_books: Some(stats.available_books),
            total_users: Some(stats.total_users),
            active_loans: Some(stats.active_loans),
            overdue_loans: Some(stats.overdue_loans),
        }
    }
}

/// Paginated envelope returned by list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
}

/// A list response: either a bare array or a paginated envelope
///
/// `null` is accepted and means "no items".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Collection<T> {
    Items(Vec<T>),
    Page(Page<T>),
    Empty,
}

impl<T> Collection<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Collection::Items(items) => items,
            Collection::Page(page) => page.items,
            Collection::Empty => Vec::new(),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Collection::Items(items) => items,
            Collection::Page(page) => &page.items,
            Collection::Empty => &[],
        }
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection::Empty
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Collection::Items(items)
    }
}

/// Partial update of an entity, identified by `id`
///
/// Serialized flat: `{"id": "b1", "title": "New"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl EntityPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// A patch carrying every field of `entity`
    pub fn from_entity<T: Entity>(entity: &T) -> Self {
        let fields = match serde_json::to_value(entity) {
            Ok(Value::Object(mut map)) => {
                map.remove("id");
                map
            }
            _ => Map::new(),
        };
        Self {
            id: entity.id().to_string(),
            fields,
        }
    }

    /// Shallow-merge the patch over `entity`
    pub fn apply<T: Entity>(&self, entity: &T) -> Result<T, serde_json::Error> {
        let mut value = serde_json::to_value(entity)?;
        if let Value::Object(map) = &mut value {
            for (field, v) in &self.fields {
                map.insert(field.clone(), v.clone());
            }
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        serde_json::from_value(value)
    }
}

/// Body of `POST /books`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

/// Body of `POST /users`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Body of `POST /loans`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoan {
    pub book_id: String,
    pub user_id: String,
}

/// Number of hits `GET /search` is asked for
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// One hit of `GET /search`
///
/// Hits of different kinds share one list; `kind` tells them apart and the
/// remaining fields are kept as sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub id: String,

    /// `book`, `user` or `loan`; absent when a single kind was searched
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl SearchHit {
    /// Display text: the title of a book, the name of a user
    pub fn label(&self) -> Option<&str> {
        ["title", "name"]
            .iter()
            .find_map(|field| self.fields.get(*field).and_then(Value::as_str))
    }

    /// Decode the hit as a typed entity
    pub fn to_entity<T: Entity>(&self) -> Result<T, serde_json::Error> {
        let mut map = self.fields.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(map))
    }

    fn is_kind(&self, singular: &str) -> bool {
        match self.kind.as_deref() {
            None => true,
            Some(kind) => kind == singular || kind.strip_suffix('s') == Some(singular),
        }
    }
}

/// Result of `GET /search`: an `{items: [...]}` envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<SearchHit>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchResults {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Hits that decode as books; untyped hits are tried too
    pub fn books(&self) -> Vec<Book> {
        self.entities("book")
    }

    pub fn users(&self) -> Vec<User> {
        self.entities("user")
    }

    pub fn loans(&self) -> Vec<Loan> {
        self.entities("loan")
    }

    fn entities<T: Entity>(&self, kind: &str) -> Vec<T> {
        self.items
            .iter()
            .filter(|hit| hit.is_kind(kind))
            .filter_map(|hit| hit.to_entity().ok())
            .collect()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Filters sent with `GET /search`
///
/// `"all"` means unfiltered, which is also what the backend assumes when a
/// parameter is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilters {
    /// `all`, `books`, `users` or `loans`
    pub kind: String,
    /// `all`, `available`, `borrowed` or `overdue`
    pub status: String,
    pub category: String,
    pub limit: usize,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self {
            kind: "all".to_string(),
            status: "all".to_string(),
            category: "all".to_string(),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchFilters {
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// URL-encoded query string for `q`, without the leading `?`
    pub fn to_query_string(&self, q: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("q", q)
            .append_pair("type", &self.kind)
            .append_pair("status", &self.status)
            .append_pair("category", &self.category)
            .append_pair("limit", &self.limit.to_string())
            .finish()
    }
}

/// Query parameters for `GET /books`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub q: Option<String>,
    /// Extra backend filters, appended in order
    pub filters: Vec<(String, String)>,
}

impl BookQuery {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn search(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    /// URL-encoded query string without the leading `?`; empty if no parameters
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        if let Some(limit) = self.limit {
            serializer.append_pair("limit", &limit.to_string());
        }
        if let Some(offset) = self.offset {
            serializer.append_pair("offset", &offset.to_string());
        }
        if let Some(q) = &self.q {
            serializer.append_pair("q", q);
        }
        for (key, value) in &self.filters {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn book(id: &str, title: &str) -> Book {
        serde_json::from_value(json!({ "id": id, "title": title })).unwrap()
    }

    #[test]
    fn test_collection_accepts_array_and_envelope() {
        let bare: Collection<Book> =
            serde_json::from_value(json!([{ "id": "b1", "title": "T" }])).unwrap();
        let envelope: Collection<Book> = serde_json::from_value(
            json!({ "items": [{ "id": "b1", "title": "T" }], "total": 1, "limit": 20, "offset": 0 }),
        )
        .unwrap();

        assert_eq!(bare.into_items(), envelope.into_items());
    }

    #[test]
    fn test_collection_null_and_missing_items_are_empty() {
        let null: Collection<Book> = serde_json::from_value(Value::Null).unwrap();
        assert!(null.into_items().is_empty());

        let no_items: Collection<Book> = serde_json::from_value(json!({ "total": 0 })).unwrap();
        assert!(no_items.into_items().is_empty());
    }

    #[test]
    fn test_book_keeps_unknown_fields() {
        let b: Book = serde_json::from_value(json!({
            "id": "b1",
            "title": "Dune",
            "author": "Herbert",
            "available": true,
            "rating": 5
        }))
        .unwrap();

        assert_eq!(b.extra.get("rating"), Some(&json!(5)));
        let back = serde_json::to_value(&b).unwrap();
        assert_eq!(back["rating"], json!(5));
        assert_eq!(back["available"], json!(true));
    }

    #[test]
    fn test_patch_merges_fields() {
        let original = book("b1", "Old");
        let patch = EntityPatch::new("b1")
            .set("title", "New")
            .set("available", true);

        let merged = patch.apply(&original).unwrap();
        assert_eq!(merged.id, "b1");
        assert_eq!(merged.title, "New");
        assert!(merged.available);
    }

    #[test]
    fn test_patch_flat_wire_format() {
        let patch: EntityPatch =
            serde_json::from_value(json!({ "id": "l1", "returnedAt": "2024-05-01T10:00:00" }))
                .unwrap();
        assert_eq!(patch.id, "l1");
        assert_eq!(
            patch.fields.get("returnedAt"),
            Some(&json!("2024-05-01T10:00:00"))
        );
    }

    #[test]
    fn test_loan_activity_and_overdue() {
        let now = parse_timestamp("2024-06-01T12:00:00").unwrap();
        let mut loan: Loan = serde_json::from_value(json!({
            "id": "l1",
            "bookId": "b1",
            "userId": "u1",
            "dueAt": "2024-05-15T12:00",
            "returnedAt": ""
        }))
        .unwrap();

        assert!(loan.is_active());
        assert!(loan.is_overdue(now));

        loan.returned_at = Some("2024-05-20T09:00:00".to_string());
        assert!(!loan.is_active());
        assert!(!loan.is_overdue(now));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-02T03:04:05.123").is_some());
        assert!(parse_timestamp("2024-01-02T03:04").is_some());
        assert!(parse_timestamp("2024-01-02T03:04:05Z").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_stats_merge_keeps_absent_fields() {
        let stats = Stats {
            total_books: 5,
            ..Stats::default()
        };
        let merged = stats.merged(&StatsUpdate {
            active_loans: Some(2),
            ..StatsUpdate::default()
        });
        assert_eq!(merged.total_books, 5);
        assert_eq!(merged.active_loans, 2);
    }

    #[test]
    fn test_book_query_string() {
        assert_eq!(BookQuery::default().to_query_string(), "");
        assert_eq!(BookQuery::page(20, 0).to_query_string(), "limit=20&offset=0");

        let mut query = BookQuery::search("il nome della rosa");
        query.filters.push(("genre".to_string(), "GIALLO".to_string()));
        assert_eq!(
            query.to_query_string(),
            "q=il+nome+della+rosa&genre=GIALLO"
        );
    }

    #[test]
    fn test_search_results_read_items_envelope() {
        let results: SearchResults = serde_json::from_value(json!({
            "items": [
                { "id": "b1", "type": "book", "title": "Dune", "author": "Herbert" },
                { "id": "u1", "type": "user", "name": "Anna" },
                { "id": "b2", "title": "Emma" }
            ],
            "total": 3
        }))
        .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results.total, Some(3));
        assert!(results.extra.is_empty());
        assert_eq!(results.items[1].label(), Some("Anna"));

        let titles: Vec<String> = results.books().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);
        assert_eq!(results.users()[0].name, "Anna");
    }

    #[test]
    fn test_search_results_without_items_are_empty() {
        let missing: SearchResults = serde_json::from_value(json!({ "total": 0 })).unwrap();
        let null: SearchResults = serde_json::from_value(json!({ "items": null })).unwrap();
        assert!(missing.is_empty());
        assert!(null.is_empty());
    }

    #[test]
    fn test_search_filters_query_string() {
        assert_eq!(
            SearchFilters::default().to_query_string("eco"),
            "q=eco&type=all&status=all&category=all&limit=10"
        );

        let filters = SearchFilters {
            status: "overdue".to_string(),
            ..SearchFilters::of_kind("loans")
        };
        assert_eq!(
            filters.to_query_string("primo levi"),
            "q=primo+levi&type=loans&status=overdue&category=all&limit=10"
        );
    }
}
