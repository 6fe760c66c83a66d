//! Application controller
//!
//! `LibraryApp` owns the store and holds the client and local preferences.
//! Views call its operations and subscribe to the store it exposes; nothing
//! reaches the store through a global.

use anyhow::Context;
use chrono::{NaiveDateTime, Utc};
use std::cell::{Ref, RefCell};
use std::sync::Arc;

use library_client::{
    ApiClient, ApiError, Book, BookQuery, EntityPatch, LibraryClient, Loan, NewBook, NewLoan,
    SearchFilters, SearchResults,
};
use library_config::{AppConfig, ComponentSettings, Locale, Preferences, Theme};
use library_store::{
    Action, AppState, AppStore, LoggingMiddleware, NotificationLevel, StateUpdate,
};

use crate::search::{self, Suggestion, MIN_SEARCH_LEN};
use crate::stats::calculate_stats;

/// Page size of the first books request
pub const INITIAL_PAGE_SIZE: usize = 20;

pub struct LibraryApp {
    store: AppStore,
    client: Arc<dyn LibraryClient>,
    preferences: RefCell<Preferences>,
    config: AppConfig,
}

impl LibraryApp {
    /// Build the app around an injected client and preferences
    ///
    /// The store starts with the saved theme, or the configured system theme
    /// when none was saved.
    pub fn new(client: Arc<dyn LibraryClient>, preferences: Preferences, config: AppConfig) -> Self {
        let theme = preferences.theme.unwrap_or(config.system_theme);
        let store = AppStore::new(AppState::new(config.start_online).with_theme(theme));
        store.add_middleware(LoggingMiddleware::new());

        log::info!(
            "Library app ready (backend: {}, theme: {}, online: {})",
            config.base_url,
            theme,
            config.start_online
        );

        Self {
            store,
            client,
            preferences: RefCell::new(preferences),
            config,
        }
    }

    /// Build the app from configuration, with the HTTP client and the
    /// preferences file in the config directory
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let client = ApiClient::from_config(&config).context("Failed to create API client")?;
        Ok(Self::new(Arc::new(client), Preferences::load(), config))
    }

    pub fn store(&self) -> &AppStore {
        &self.store
    }

    pub fn client(&self) -> &dyn LibraryClient {
        self.client.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn preferences(&self) -> Ref<'_, Preferences> {
        self.preferences.borrow()
    }

    fn locale(&self) -> Locale {
        self.config.locale
    }

    // Data loading

    /// Load books, users and loans, then derive the dashboard stats
    ///
    /// On failure the error is stored and returned. Loading is switched off
    /// in every case.
    pub async fn load_initial_data(&self, now: NaiveDateTime) -> Result<(), ApiError> {
        self.store.dispatch(Action::SetLoading(true));

        let query = BookQuery::page(INITIAL_PAGE_SIZE, 0);
        let result = tokio::try_join!(
            self.client.get_books(&query),
            self.client.get_users(),
            self.client.get_loans(),
        );

        let outcome = match result {
            Ok((books, users, loans)) => {
                let stats = calculate_stats(books.items(), users.items(), loans.items(), now);
                log::info!(
                    "Initial data loaded: {} books, {} users, {} loans",
                    stats.total_books,
                    stats.total_users,
                    loans.items().len()
                );

                self.store.dispatch(Action::BooksLoaded(books));
                self.store.dispatch(Action::UsersLoaded(users));
                self.store.dispatch(Action::LoansLoaded(loans));
                self.store.dispatch(Action::StatsLoaded(stats.into()));
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                log::debug!("Initial data load cancelled");
                Err(e)
            }
            Err(e) => {
                log::error!("Failed to load initial data: {}", e);
                self.store
                    .dispatch(Action::SetError(Some(e.user_message(self.locale()))));
                Err(e)
            }
        };

        self.store.dispatch(Action::SetLoading(false));
        outcome
    }

    /// Fetch a page of books and write it straight into the store
    pub async fn refresh_books(&self, query: &BookQuery) -> Result<(), ApiError> {
        match self.client.get_books(query).await {
            Ok(books) => {
                self.store
                    .set_state(StateUpdate::Books(Arc::new(books.into_items())));
                Ok(())
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Search the catalogue through `GET /search`
    ///
    /// The trimmed query always becomes the store's search query. Queries
    /// shorter than [`MIN_SEARCH_LEN`] characters are not sent; successful
    /// searches are remembered in the recent-search history together with
    /// the kind filter they ran with.
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
    ) -> Result<SearchResults, ApiError> {
        let query = query.trim();
        self.store.dispatch(Action::SetSearchQuery(query.to_string()));

        if query.chars().count() < MIN_SEARCH_LEN {
            return Ok(SearchResults::default());
        }

        let results = match self.client.search(query, filters).await {
            Ok(results) => results,
            Err(e) => {
                if !e.is_cancelled() {
                    log::error!("Search for '{}' failed: {}", query, e);
                }
                return Err(e);
            }
        };
        log::debug!("Search for '{}' returned {} hits", query, results.len());

        {
            let mut preferences = self.preferences.borrow_mut();
            preferences.record_search(query, Some(&filters.kind), Utc::now());
            save_preferences(&preferences);
        }

        Ok(results)
    }

    /// Autocomplete candidates from the books and users already loaded
    pub fn suggestions(&self, query: &str) -> Vec<Suggestion> {
        let state = self.store.get_state();
        search::suggestions(&state.books, &state.users, query)
    }

    pub fn clear_recent_searches(&self) {
        let mut preferences = self.preferences.borrow_mut();
        preferences.clear_recent_searches();
        save_preferences(&preferences);
    }

    // Book and loan commands

    pub async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
        let created = self.client.create_book(book).await.inspect_err(|e| self.report(e))?;
        self.store.dispatch(Action::BookAdded(created.clone()));
        Ok(created)
    }

    pub async fn update_book(&self, id: &str, updates: &EntityPatch) -> Result<Book, ApiError> {
        let updated = self
            .client
            .update_book(id, updates)
            .await
            .inspect_err(|e| self.report(e))?;
        self.store
            .dispatch(Action::BookUpdated(EntityPatch::from_entity(&updated)));
        Ok(updated)
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete_book(id).await.inspect_err(|e| self.report(e))?;
        self.store.dispatch(Action::BookDeleted(id.to_string()));
        Ok(())
    }

    /// Lend a book to a user
    pub async fn borrow_book(&self, book_id: &str, user_id: &str) -> Result<Loan, ApiError> {
        let request = NewLoan {
            book_id: book_id.to_string(),
            user_id: user_id.to_string(),
        };
        let loan = self
            .client
            .create_loan(&request)
            .await
            .inspect_err(|e| self.report(e))?;
        self.store.dispatch(Action::LoanCreated(loan.clone()));
        Ok(loan)
    }

    pub async fn return_loan(&self, loan_id: &str) -> Result<Loan, ApiError> {
        let loan = self
            .client
            .return_loan(loan_id)
            .await
            .inspect_err(|e| self.report(e))?;
        self.store
            .dispatch(Action::LoanReturned(EntityPatch::from_entity(&loan)));
        Ok(loan)
    }

    /// Surface a failed request as an error notification
    fn report(&self, error: &ApiError) {
        if error.is_cancelled() {
            log::debug!("Request cancelled");
            return;
        }
        log::error!("Request failed: {}", error);
        self.notify(NotificationLevel::Error, error.user_message(self.locale()));
    }

    // Theme

    pub fn theme(&self) -> Theme {
        self.store.get_state().theme
    }

    /// Apply and persist a theme given by name (`light` or `dark`)
    pub fn set_theme(&self, name: &str) -> anyhow::Result<()> {
        let theme: Theme = name.parse()?;
        self.apply_theme(theme);
        Ok(())
    }

    pub fn toggle_theme(&self) -> Theme {
        let theme = self.theme().toggled();
        self.apply_theme(theme);
        theme
    }

    /// Forget the saved theme and follow the configured system theme
    pub fn reset_theme_to_system(&self) {
        {
            let mut preferences = self.preferences.borrow_mut();
            preferences.theme = None;
            save_preferences(&preferences);
        }
        self.store.dispatch(Action::SetTheme(self.config.system_theme));
    }

    fn apply_theme(&self, theme: Theme) {
        {
            let mut preferences = self.preferences.borrow_mut();
            preferences.theme = Some(theme);
            save_preferences(&preferences);
        }
        self.store.dispatch(Action::SetTheme(theme));
    }

    // Component settings

    pub fn component_settings(&self, component: &str) -> ComponentSettings {
        self.preferences.borrow().component_settings(component)
    }

    /// Change and persist the settings of one component
    pub fn update_component_settings(
        &self,
        component: &str,
        update: impl FnOnce(&mut ComponentSettings),
    ) -> ComponentSettings {
        let mut preferences = self.preferences.borrow_mut();
        let mut settings = preferences.component_settings(component);
        update(&mut settings);
        preferences.set_component_settings(component, settings.clone());
        save_preferences(&preferences);
        settings
    }

    // Connectivity and notifications

    /// Record connectivity; a change is announced with a notification
    pub fn set_online(&self, online: bool) {
        let was_online = self.store.get_state().is_online;
        self.store.dispatch(Action::SetOnlineStatus(online));

        if was_online == online {
            return;
        }

        let (level, message) = match (online, self.locale()) {
            (true, Locale::It) => (NotificationLevel::Success, "Connessione ristabilita"),
            (true, Locale::En) => (NotificationLevel::Success, "Connection restored"),
            (false, Locale::It) => (
                NotificationLevel::Warning,
                "Connessione persa - modalità offline",
            ),
            (false, Locale::En) => (NotificationLevel::Warning, "Connection lost - offline mode"),
        };
        self.notify(level, message);
    }

    /// Push a notification and return its id
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) -> u64 {
        let action = Action::notify(level, message);
        let id = match &action {
            Action::AddNotification(notification) => notification.id,
            _ => 0,
        };
        self.store.dispatch(action);
        id
    }

    pub fn dismiss_notification(&self, id: u64) {
        self.store.dispatch(Action::RemoveNotification(id));
    }
}

fn save_preferences(preferences: &Preferences) {
    if let Err(e) = preferences.save() {
        log::warn!("Failed to save preferences: {:#}", e);
    }
}
