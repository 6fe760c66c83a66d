//! Application state
//!
//! `AppState` is a fixed record of top-level keys. Collections and the stats
//! record live behind `Arc`, so a reducer that leaves a field alone keeps its
//! pointer and a reducer that rebuilds it produces a new one. Change
//! detection compares those pointers; scalar fields compare by value.

use library_client::{Book, Loan, Stats, User};
use library_config::Theme;
use std::fmt;
use std::sync::Arc;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr, VariantNames};

use crate::notification::Notification;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_SORT_BY: &str = "title";
pub const DEFAULT_FILTER_BY: &str = "all";

/// Top-level state keys, named as subscribers know them
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    IntoStaticStr,
    AsRefStr,
    VariantNames,
)]
#[strum(serialize_all = "camelCase")]
pub enum StateKey {
    Books,
    Users,
    Loans,
    Stats,
    Loading,
    Error,
    Theme,
    SearchQuery,
    CurrentPage,
    PageSize,
    SortBy,
    FilterBy,
    HasUnsavedChanges,
    IsOnline,
    Notifications,
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    // Data
    pub books: Arc<Vec<Book>>,
    pub users: Arc<Vec<User>>,
    pub loans: Arc<Vec<Loan>>,
    pub stats: Arc<Stats>,

    // UI
    pub loading: bool,
    pub error: Option<String>,
    pub theme: Theme,
    pub search_query: String,
    pub current_page: usize,
    pub page_size: usize,
    pub sort_by: String,
    pub filter_by: String,

    // App
    pub has_unsaved_changes: bool,
    pub is_online: bool,
    pub notifications: Arc<Vec<Notification>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AppState {
    /// Default state with the given connectivity
    pub fn new(is_online: bool) -> Self {
        Self {
            books: Arc::default(),
            users: Arc::default(),
            loans: Arc::default(),
            stats: Arc::default(),
            loading: false,
            error: None,
            theme: Theme::default(),
            search_query: String::new(),
            current_page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_BY.to_string(),
            filter_by: DEFAULT_FILTER_BY.to_string(),
            has_unsaved_changes: false,
            is_online,
            notifications: Arc::default(),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Borrowed view of one field
    pub fn value(&self, key: StateKey) -> StateValue<'_> {
        match key {
            StateKey::Books => StateValue::Books(&self.books),
            StateKey::Users => StateValue::Users(&self.users),
            StateKey::Loans => StateValue::Loans(&self.loans),
            StateKey::Stats => StateValue::Stats(&self.stats),
            StateKey::Loading => StateValue::Loading(self.loading),
            StateKey::Error => StateValue::Error(self.error.as_deref()),
            StateKey::Theme => StateValue::Theme(self.theme),
            StateKey::SearchQuery => StateValue::SearchQuery(&self.search_query),
            StateKey::CurrentPage => StateValue::CurrentPage(self.current_page),
            StateKey::PageSize => StateValue::PageSize(self.page_size),
            StateKey::SortBy => StateValue::SortBy(&self.sort_by),
            StateKey::FilterBy => StateValue::FilterBy(&self.filter_by),
            StateKey::HasUnsavedChanges => StateValue::HasUnsavedChanges(self.has_unsaved_changes),
            StateKey::IsOnline => StateValue::IsOnline(self.is_online),
            StateKey::Notifications => StateValue::Notifications(&self.notifications),
        }
    }

    /// Whether `key` differs between `self` and `next`
    ///
    /// Shared fields compare by pointer: a rebuilt collection counts as
    /// changed even when its contents are equal.
    pub fn key_changed(&self, next: &AppState, key: StateKey) -> bool {
        match key {
            StateKey::Books => !Arc::ptr_eq(&self.books, &next.books),
            StateKey::Users => !Arc::ptr_eq(&self.users, &next.users),
            StateKey::Loans => !Arc::ptr_eq(&self.loans, &next.loans),
            StateKey::Stats => !Arc::ptr_eq(&self.stats, &next.stats),
            StateKey::Notifications => !Arc::ptr_eq(&self.notifications, &next.notifications),
            StateKey::Loading => self.loading != next.loading,
            StateKey::Error => self.error != next.error,
            StateKey::Theme => self.theme != next.theme,
            StateKey::SearchQuery => self.search_query != next.search_query,
            StateKey::CurrentPage => self.current_page != next.current_page,
            StateKey::PageSize => self.page_size != next.page_size,
            StateKey::SortBy => self.sort_by != next.sort_by,
            StateKey::FilterBy => self.filter_by != next.filter_by,
            StateKey::HasUnsavedChanges => self.has_unsaved_changes != next.has_unsaved_changes,
            StateKey::IsOnline => self.is_online != next.is_online,
        }
    }

    /// Keys that differ between `self` and `next`, in declaration order
    pub fn changed_keys(&self, next: &AppState) -> Vec<StateKey> {
        StateKey::iter()
            .filter(|key| self.key_changed(next, *key))
            .collect()
    }

    /// Replace one field, leaving every other field's pointer intact
    pub fn apply(mut self, update: StateUpdate) -> AppState {
        match update {
            StateUpdate::Books(books) => self.books = books,
            StateUpdate::Users(users) => self.users = users,
            StateUpdate::Loans(loans) => self.loans = loans,
            StateUpdate::Stats(stats) => self.stats = stats,
            StateUpdate::Loading(loading) => self.loading = loading,
            StateUpdate::Error(error) => self.error = error,
            StateUpdate::Theme(theme) => self.theme = theme,
            StateUpdate::SearchQuery(query) => self.search_query = query,
            StateUpdate::CurrentPage(page) => self.current_page = page,
            StateUpdate::PageSize(size) => self.page_size = size,
            StateUpdate::SortBy(sort_by) => self.sort_by = sort_by,
            StateUpdate::FilterBy(filter_by) => self.filter_by = filter_by,
            StateUpdate::HasUnsavedChanges(dirty) => self.has_unsaved_changes = dirty,
            StateUpdate::IsOnline(online) => self.is_online = online,
            StateUpdate::Notifications(notifications) => self.notifications = notifications,
        }
        self
    }
}

/// The value of one state key, as handed to listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateValue<'a> {
    Books(&'a Arc<Vec<Book>>),
    Users(&'a Arc<Vec<User>>),
    Loans(&'a Arc<Vec<Loan>>),
    Stats(&'a Arc<Stats>),
    Loading(bool),
    Error(Option<&'a str>),
    Theme(Theme),
    SearchQuery(&'a str),
    CurrentPage(usize),
    PageSize(usize),
    SortBy(&'a str),
    FilterBy(&'a str),
    HasUnsavedChanges(bool),
    IsOnline(bool),
    Notifications(&'a Arc<Vec<Notification>>),
}

impl StateValue<'_> {
    pub fn key(&self) -> StateKey {
        match self {
            StateValue::Books(_) => StateKey::Books,
            StateValue::Users(_) => StateKey::Users,
            StateValue::Loans(_) => StateKey::Loans,
            StateValue::Stats(_) => StateKey::Stats,
            StateValue::Loading(_) => StateKey::Loading,
            StateValue::Error(_) => StateKey::Error,
            StateValue::Theme(_) => StateKey::Theme,
            StateValue::SearchQuery(_) => StateKey::SearchQuery,
            StateValue::CurrentPage(_) => StateKey::CurrentPage,
            StateValue::PageSize(_) => StateKey::PageSize,
            StateValue::SortBy(_) => StateKey::SortBy,
            StateValue::FilterBy(_) => StateKey::FilterBy,
            StateValue::HasUnsavedChanges(_) => StateKey::HasUnsavedChanges,
            StateValue::IsOnline(_) => StateKey::IsOnline,
            StateValue::Notifications(_) => StateKey::Notifications,
        }
    }
}

/// A single-key write for `AppStore::set_state`
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    Books(Arc<Vec<Book>>),
    Users(Arc<Vec<User>>),
    Loans(Arc<Vec<Loan>>),
    Stats(Arc<Stats>),
    Loading(bool),
    Error(Option<String>),
    Theme(Theme),
    SearchQuery(String),
    CurrentPage(usize),
    PageSize(usize),
    SortBy(String),
    FilterBy(String),
    HasUnsavedChanges(bool),
    IsOnline(bool),
    Notifications(Arc<Vec<Notification>>),
}

impl StateUpdate {
    pub fn key(&self) -> StateKey {
        match self {
            StateUpdate::Books(_) => StateKey::Books,
            StateUpdate::Users(_) => StateKey::Users,
            StateUpdate::Loans(_) => StateKey::Loans,
            StateUpdate::Stats(_) => StateKey::Stats,
            StateUpdate::Loading(_) => StateKey::Loading,
            StateUpdate::Error(_) => StateKey::Error,
            StateUpdate::Theme(_) => StateKey::Theme,
            StateUpdate::SearchQuery(_) => StateKey::SearchQuery,
            StateUpdate::CurrentPage(_) => StateKey::CurrentPage,
            StateUpdate::PageSize(_) => StateKey::PageSize,
            StateUpdate::SortBy(_) => StateKey::SortBy,
            StateUpdate::FilterBy(_) => StateKey::FilterBy,
            StateUpdate::HasUnsavedChanges(_) => StateKey::HasUnsavedChanges,
            StateUpdate::IsOnline(_) => StateKey::IsOnline,
            StateUpdate::Notifications(_) => StateKey::Notifications,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_key_names_match_state_fields() {
        assert_eq!(StateKey::SearchQuery.to_string(), "searchQuery");
        assert_eq!(StateKey::HasUnsavedChanges.as_ref(), "hasUnsavedChanges");
        assert_eq!(StateKey::from_str("isOnline").unwrap(), StateKey::IsOnline);
        assert_eq!(StateKey::VARIANTS.len(), 15);
    }

    #[test]
    fn test_defaults() {
        let state = AppState::default();
        assert!(state.books.is_empty());
        assert_eq!(*state.stats, Stats::default());
        assert_eq!(state.theme, Theme::Light);
        assert_eq!(state.page_size, 20);
        assert_eq!(state.sort_by, "title");
        assert_eq!(state.filter_by, "all");
        assert!(state.is_online);
        assert!(!AppState::new(false).is_online);
    }

    #[test]
    fn test_clone_keeps_pointers() {
        let state = AppState::default();
        let copy = state.clone();
        assert!(state.changed_keys(&copy).is_empty());
    }

    #[test]
    fn test_rebuilt_collection_counts_as_changed() {
        let state = AppState::default();
        let next = state
            .clone()
            .apply(StateUpdate::Books(Arc::new(Vec::new())));

        assert_eq!(state.books, next.books);
        assert_eq!(state.changed_keys(&next), vec![StateKey::Books]);
    }

    #[test]
    fn test_equal_scalar_is_unchanged() {
        let state = AppState::default();
        let same = state.clone().apply(StateUpdate::SortBy("title".to_string()));
        let other = state.clone().apply(StateUpdate::SortBy("author".to_string()));

        assert!(state.changed_keys(&same).is_empty());
        assert_eq!(state.changed_keys(&other), vec![StateKey::SortBy]);
    }

    #[test]
    fn test_value_and_update_agree_on_key() {
        let state = AppState::default();
        for key in StateKey::iter() {
            assert_eq!(state.value(key).key(), key);
        }
        assert_eq!(StateUpdate::IsOnline(false).key(), StateKey::IsOnline);
        assert_eq!(state.value(StateKey::Error), StateValue::Error(None));
    }
}
