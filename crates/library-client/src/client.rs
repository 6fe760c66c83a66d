//! Library client trait
//!
//! This module defines the `LibraryClient` trait covering every backend
//! endpoint the application uses. Consumers depend on the trait so the
//! HTTP-backed [`crate::ApiClient`] can be swapped for a test double.

use crate::error::ApiError;
use crate::types::{
    Book, BookQuery, Collection, EntityPatch, Loan, NewBook, NewLoan, NewUser, SearchFilters,
    SearchResults, StatsUpdate, User,
};
use async_trait::async_trait;

/// Library backend client
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow sharing across
/// async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use library_client::{BookQuery, LibraryClient};
///
/// async fn first_page(client: &dyn LibraryClient) -> Result<usize, library_client::ApiError> {
///     let books = client.get_books(&BookQuery::page(20, 0)).await?;
///     Ok(books.items().len())
/// }
/// ```
#[async_trait]
pub trait LibraryClient: Send + Sync {
    // Books

    /// `GET /books` with pagination and filters
    async fn get_books(&self, query: &BookQuery) -> Result<Collection<Book>, ApiError>;

    /// `GET /books?q=...` plus additional filters
    async fn search_books(
        &self,
        q: &str,
        filters: &[(String, String)],
    ) -> Result<Collection<Book>, ApiError> {
        let query = BookQuery {
            q: Some(q.to_string()),
            filters: filters.to_vec(),
            ..BookQuery::default()
        };
        self.get_books(&query).await
    }

    async fn get_book(&self, id: &str) -> Result<Book, ApiError>;

    async fn create_book(&self, book: &NewBook) -> Result<Book, ApiError>;

    /// `PUT /books/:id`; only the fields in `updates` are sent
    async fn update_book(&self, id: &str, updates: &EntityPatch) -> Result<Book, ApiError>;

    async fn delete_book(&self, id: &str) -> Result<(), ApiError>;

    // Users

    async fn get_users(&self) -> Result<Collection<User>, ApiError>;

    async fn get_user(&self, id: &str) -> Result<User, ApiError>;

    async fn create_user(&self, user: &NewUser) -> Result<User, ApiError>;

    async fn update_user(&self, id: &str, updates: &EntityPatch) -> Result<User, ApiError>;

    async fn delete_user(&self, id: &str) -> Result<(), ApiError>;

    // Loans

    async fn get_loans(&self) -> Result<Collection<Loan>, ApiError>;

    async fn get_loan(&self, id: &str) -> Result<Loan, ApiError>;

    async fn create_loan(&self, loan: &NewLoan) -> Result<Loan, ApiError>;

    /// `POST /loans/:id/return`
    async fn return_loan(&self, id: &str) -> Result<Loan, ApiError>;

    // Search and statistics

    /// `GET /search?q=...&type=...&status=...&category=...&limit=...`
    async fn search(&self, q: &str, filters: &SearchFilters) -> Result<SearchResults, ApiError>;

    /// `GET /statistics`
    async fn get_statistics(&self) -> Result<StatsUpdate, ApiError>;
}
