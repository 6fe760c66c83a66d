use library_client::{Entity, EntityPatch};
use std::sync::Arc;

use crate::actions::Action;
use crate::state::AppState;

/// Reducer - pure function that produces new state from current state + action
///
/// Fields an action touches are rebuilt; everything else keeps its pointer.
pub fn reduce(mut state: AppState, action: &Action) -> AppState {
    match action {
        // Loading
        Action::SetLoading(loading) => {
            state.loading = *loading;
        }
        Action::SetError(error) => {
            state.error = error.clone();
            state.loading = false;
        }
        Action::ClearError => {
            state.error = None;
        }

        // Bulk loads
        Action::BooksLoaded(books) => {
            log::debug!("Loaded {} books", books.items().len());
            state.books = Arc::new(books.items().to_vec());
            state.loading = false;
            state.error = None;
        }
        Action::UsersLoaded(users) => {
            log::debug!("Loaded {} users", users.items().len());
            state.users = Arc::new(users.items().to_vec());
            state.loading = false;
            state.error = None;
        }
        Action::LoansLoaded(loans) => {
            log::debug!("Loaded {} loans", loans.items().len());
            state.loans = Arc::new(loans.items().to_vec());
            state.loading = false;
            state.error = None;
        }
        Action::StatsLoaded(update) => {
            state.stats = Arc::new(state.stats.merged(update));
        }

        // Mutations
        Action::BookAdded(book) => {
            state.books = Arc::new(appended(&state.books, book));
            state.has_unsaved_changes = false;
        }
        Action::BookUpdated(patch) => {
            state.books = Arc::new(merged_by_id(&state.books, patch));
            state.has_unsaved_changes = false;
        }
        Action::BookDeleted(id) => {
            state.books = Arc::new(without_id(&state.books, id));
            state.has_unsaved_changes = false;
        }
        Action::LoanCreated(loan) => {
            state.loans = Arc::new(appended(&state.loans, loan));
            state.has_unsaved_changes = false;
        }
        Action::LoanReturned(patch) => {
            state.loans = Arc::new(merged_by_id(&state.loans, patch));
            state.has_unsaved_changes = false;
        }

        // UI
        Action::SetTheme(theme) => {
            state.theme = *theme;
        }
        Action::SetSearchQuery(query) => {
            state.search_query = query.clone();
            state.current_page = 0;
        }
        Action::SetPage(page) => {
            state.current_page = *page;
        }
        Action::SetPageSize(size) => {
            state.page_size = *size;
            state.current_page = 0;
        }
        Action::SetSort(sort_by) => {
            state.sort_by = sort_by.clone();
            state.current_page = 0;
        }
        Action::SetFilter(filter_by) => {
            state.filter_by = filter_by.clone();
            state.current_page = 0;
        }

        // App
        Action::SetUnsavedChanges(dirty) => {
            state.has_unsaved_changes = *dirty;
        }
        Action::SetOnlineStatus(online) => {
            state.is_online = *online;
        }
        Action::AddNotification(notification) => {
            state.notifications = Arc::new(appended(&state.notifications, notification));
        }
        Action::RemoveNotification(id) => {
            state.notifications = Arc::new(
                state
                    .notifications
                    .iter()
                    .filter(|n| n.id != *id)
                    .cloned()
                    .collect(),
            );
        }
    }

    state
}

fn appended<T: Clone>(items: &[T], item: &T) -> Vec<T> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend_from_slice(items);
    next.push(item.clone());
    next
}

fn without_id<T: Entity>(items: &[T], id: &str) -> Vec<T> {
    items.iter().filter(|item| item.id() != id).cloned().collect()
}

/// Shallow-merge `patch` into every item with its id
fn merged_by_id<T: Entity>(items: &[T], patch: &EntityPatch) -> Vec<T> {
    items
        .iter()
        .map(|item| {
            if item.id() != patch.id {
                return item.clone();
            }
            patch.apply(item).unwrap_or_else(|e| {
                log::warn!("Ignoring patch for '{}': {}", patch.id, e);
                item.clone()
            })
        })
        .collect()
}
